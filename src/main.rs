use std::sync::Arc;

use anyhow::Error;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;

use crate::commands::Command;
use crate::handlers::{
    BTN_BROADCAST, BTN_USER_COUNT, BroadcastState, command_handler, enter_broadcast,
    receive_broadcast_text, user_count_handler,
};
use crate::storage::UserStore;

mod commands;
mod config;
mod handlers;
mod storage;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // --- Logging Setup ---
    use log::LevelFilter;
    use std::env;
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::sync::Mutex;

    // 1. Get console log level from env
    let console_level_str = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string());
    let console_level = match console_level_str.to_uppercase().as_str() {
        "ERROR" => LevelFilter::Error,
        "WARN" => LevelFilter::Warn,
        "DEBUG" => LevelFilter::Debug,
        _ => LevelFilter::Info, // Default to Info
    };

    // 2. Get file log level from env
    let file_level_str = env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "OFF".to_string());
    let file_level_config = match file_level_str.to_uppercase().as_str() {
        "ERROR" => Some(LevelFilter::Error),
        "ALL" | "INFO" => Some(LevelFilter::Info),
        _ => None, // OFF
    };

    // 3. Determine the most verbose level the logger has to process
    let max_level = std::cmp::max(console_level, file_level_config.unwrap_or(LevelFilter::Off));

    // 4. Setup file handle if needed
    let log_file = if file_level_config.is_some() {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open("bot_errors.log")?;
        Some(Arc::new(Mutex::new(file)))
    } else {
        None
    };

    // 5. Build the logger
    let mut builder = pretty_env_logger::formatted_builder();
    builder
        .filter(None, max_level)
        .format(move |buf, record| {
            let formatted_record = format!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );

            // Write to console if level is sufficient
            if record.level() <= console_level {
                writeln!(buf, "{}", formatted_record)?;
            }

            // Write to file if level is sufficient
            if let Some(file_level) = file_level_config {
                if record.level() <= file_level {
                    if let Some(file_handle) = &log_file {
                        if let Ok(mut guard) = file_handle.lock() {
                            let _ = writeln!(guard, "{}", formatted_record);
                        }
                    }
                }
            }
            Ok(())
        })
        .init();

    log::info!("Starting broadcast bot...");
    let start_time = std::time::Instant::now();

    if let Err(e) = config::load_environment() {
        log::error!("Failed to load environment: {}", e);
        return Err(e);
    }

    let users_file = config::users_file();
    let store = Arc::new(UserStore::new(&users_file));
    log::info!(
        "Loaded {} registered users from {}",
        store.count().await,
        users_file
    );

    let bot = Bot::from_env();

    let handler = Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<BroadcastState>, BroadcastState>()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text() == Some(BTN_BROADCAST))
                .endpoint(enter_broadcast),
        )
        .branch(
            dptree::filter(|msg: Message| msg.text() == Some(BTN_USER_COUNT))
                .endpoint(user_count_handler),
        )
        .branch(dptree::case![BroadcastState::AwaitingText].endpoint(receive_broadcast_text));

    log::info!("Bot initialization completed in {:.2?}", start_time.elapsed());

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![store, InMemStorage::<BroadcastState>::new()])
        .default_handler(|upd| async move {
            log::debug!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    match config::webhook_url() {
        Some(base_url) => {
            let port = config::port()?;
            let addr = ([0, 0, 0, 0], port).into();
            let url = format!("{}/webhook/{}", base_url, bot.token()).parse()?;
            log::info!("Dispatching webhook updates on port {}...", port);

            let listener = webhooks::axum(bot, webhooks::Options::new(addr, url)).await?;
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
        None => {
            log::info!("WEBHOOK_URL is not set, starting long polling...");
            dispatcher.dispatch().await;
        }
    }

    log::info!("Bot shutdown complete");
    Ok(())
}
