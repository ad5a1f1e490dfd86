pub mod admin;
pub mod admin_panel;
pub mod broadcast;
pub mod command;

pub use admin_panel::{BTN_BROADCAST, BTN_USER_COUNT, user_count_handler};
pub use broadcast::{BroadcastState, enter_broadcast, receive_broadcast_text};
pub use command::command_handler;

// Shared result type for dispatcher endpoints.
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
