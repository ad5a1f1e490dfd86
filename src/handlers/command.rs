use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use url::Url;

use crate::commands::Command;
use crate::config;
use crate::handlers::HandlerResult;
use crate::handlers::admin_panel::admin_panel_handler;
use crate::handlers::broadcast::{BroadcastState, MyDialogue};
use crate::storage::UserStore;

pub fn webapp_keyboard(url: Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::web_app(
        "Открыть WebApp",
        WebAppInfo { url },
    )]])
}

pub async fn command_handler(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    cmd: Command,
    store: Arc<UserStore>,
) -> HandlerResult {
    // A recognized command always ends a pending broadcast prompt.
    if dialogue.get().await? == Some(BroadcastState::AwaitingText) {
        dialogue.exit().await?;
    }

    match cmd {
        Command::Start => start_handler(bot, msg, store).await,
        Command::Admin => admin_panel_handler(bot, msg).await,
    }
}

async fn start_handler(bot: Bot, msg: Message, store: Arc<UserStore>) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.to_string();
    let username = user
        .username
        .clone()
        .unwrap_or_else(|| "Unknown".to_string());

    // The welcome still goes out when the write fails.
    if let Err(e) = store.register(&user_id, &username).await {
        log::error!("Failed to register user {}: {}", user_id, e);
    }

    let url: Url = config::webapp_url().parse()?;
    bot.send_message(msg.chat.id, "Добро пожаловать!")
        .reply_markup(webapp_keyboard(url))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::env;
    use teloxide::dispatching::dialogue::InMemStorage;
    use teloxide::types::{ChatId, InlineKeyboardButtonKind};
    use tempfile::TempDir;

    fn private_message(user_id: i64, username: &str, text: &str) -> Message {
        serde_json::from_value(json!({
            "message_id": 1,
            "date": 1_735_689_600,
            "chat": {"id": user_id, "type": "private", "first_name": username},
            "from": {"id": user_id, "is_bot": false, "first_name": username, "username": username},
            "text": text,
        }))
        .unwrap()
    }

    #[test]
    fn test_webapp_keyboard_opens_the_configured_url() {
        let keyboard = webapp_keyboard("https://app.example.com/promo".parse().unwrap());

        assert_eq!(keyboard.inline_keyboard.len(), 1);
        assert_eq!(keyboard.inline_keyboard[0].len(), 1);

        let button = &keyboard.inline_keyboard[0][0];
        assert_eq!(button.text, "Открыть WebApp");
        match &button.kind {
            InlineKeyboardButtonKind::WebApp(info) => {
                assert_eq!(info.url.as_str(), "https://app.example.com/promo");
            }
            other => panic!("expected a web app button, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recognized_command_clears_armed_session() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(UserStore::new(dir.path().join("users.json")));
        let storage = InMemStorage::<BroadcastState>::new();
        let dialogue = MyDialogue::new(Arc::clone(&storage), ChatId(111));
        dialogue.update(BroadcastState::AwaitingText).await.unwrap();

        // No live transport behind the reply: the session and the registry
        // change before the send, so its result is ignored.
        let _ = command_handler(
            Bot::new("123456:FAKE-TOKEN"),
            MyDialogue::new(Arc::clone(&storage), ChatId(111)),
            private_message(111, "testuser", "/start"),
            Command::Start,
            Arc::clone(&store),
        )
        .await;

        assert_eq!(dialogue.get().await.unwrap(), None);
        assert_eq!(store.load().await["111"].username, "testuser");
    }

    #[tokio::test]
    #[serial]
    async fn test_admin_denial_leaves_state_untouched() {
        unsafe { env::set_var("ADMIN_ID", "999999") };

        let dir = TempDir::new().unwrap();
        let store = Arc::new(UserStore::new(dir.path().join("users.json")));
        let storage = InMemStorage::<BroadcastState>::new();
        let dialogue = MyDialogue::new(Arc::clone(&storage), ChatId(111));

        let _ = command_handler(
            Bot::new("123456:FAKE-TOKEN"),
            MyDialogue::new(Arc::clone(&storage), ChatId(111)),
            private_message(111, "intruder", "/admin"),
            Command::Admin,
            Arc::clone(&store),
        )
        .await;

        assert_eq!(store.count().await, 0);
        assert_eq!(dialogue.get().await.unwrap(), None);

        unsafe { env::remove_var("ADMIN_ID") };
    }
}
