use teloxide::prelude::*;

use crate::config;

// The bot has exactly one admin, identified by the ADMIN_ID variable.
// Comparison is on the stringified Telegram user id.
pub fn is_admin(msg: &Message) -> bool {
    // Check user ID instead of chat ID
    match msg.from.as_ref() {
        Some(user) => is_admin_id(&config::admin_id(), &user.id.to_string()),
        None => false,
    }
}

fn is_admin_id(admin_id: &str, user_id: &str) -> bool {
    !admin_id.is_empty() && admin_id == user_id
}
