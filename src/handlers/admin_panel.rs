use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup};

use crate::handlers::HandlerResult;
use crate::handlers::admin::is_admin;
use crate::storage::UserStore;

// Кнопки админ-панели
pub const BTN_BROADCAST: &str = "📢 Сделать рассылку";
pub const BTN_USER_COUNT: &str = "👥 Количество пользователей";

pub fn admin_panel_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(BTN_BROADCAST)],
        vec![KeyboardButton::new(BTN_USER_COUNT)],
    ])
    .resize_keyboard()
}

// Replies to /admin: the panel keyboard for the admin, a denial for
// everyone else.
pub async fn admin_panel_handler(bot: Bot, msg: Message) -> HandlerResult {
    if !is_admin(&msg) {
        bot.send_message(msg.chat.id, "У вас нет доступа к этой команде.")
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "Админ-панель")
        .reply_markup(admin_panel_keyboard())
        .await?;

    Ok(())
}

// Replies with the registry size. The panel buttons are silent for
// non-admins; only /admin explains the denial.
pub async fn user_count_handler(bot: Bot, msg: Message, store: Arc<UserStore>) -> HandlerResult {
    if !is_admin(&msg) {
        return Ok(());
    }

    let count = store.count().await;
    bot.send_message(msg.chat.id, format!("Количество пользователей: {}", count))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_panel_keyboard_layout() {
        let keyboard = admin_panel_keyboard();

        let rows: Vec<Vec<&str>> = keyboard
            .keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.text.as_str()).collect())
            .collect();
        assert_eq!(rows, vec![vec![BTN_BROADCAST], vec![BTN_USER_COUNT]]);
        assert!(keyboard.resize_keyboard);
    }
}
