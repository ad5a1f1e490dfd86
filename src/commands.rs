use teloxide::utils::command::BotCommands;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "register and open the web app.")]
    Start,
    #[command(description = "open the admin panel.")]
    Admin,
}
