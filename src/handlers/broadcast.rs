use std::future::Future;
use std::sync::Arc;

use teloxide::RequestError;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};
use teloxide::prelude::*;
use teloxide::types::ChatId;

use crate::handlers::HandlerResult;
use crate::handlers::admin::is_admin;
use crate::storage::{Registry, UserStore};

pub type MyDialogue = Dialogue<BroadcastState, InMemStorage<BroadcastState>>;

// Per-chat broadcast session. The dialogue storage holds a record only for
// chats that are mid-broadcast; everyone else is implicitly Idle.
#[derive(Clone, Default, Debug, PartialEq)]
pub enum BroadcastState {
    #[default]
    Idle,
    AwaitingText,
}

// How many failed recipients the completion message lists before it
// switches to a summary. Every failure is still logged.
const MAX_REPORTED_FAILURES: usize = 10;

#[derive(Debug, Default, PartialEq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: Vec<BroadcastFailure>,
}

#[derive(Debug, PartialEq)]
pub struct BroadcastFailure {
    pub user_id: String,
    pub reason: String,
}

impl BroadcastReport {
    pub fn attempted(&self) -> usize {
        self.sent + self.failed.len()
    }
}

// Arms the session: the next text message from this chat becomes the payload.
pub async fn enter_broadcast(bot: Bot, dialogue: MyDialogue, msg: Message) -> HandlerResult {
    if !is_admin(&msg) {
        return Ok(());
    }

    bot.send_message(msg.chat.id, "Введите текст для рассылки:")
        .await?;
    dialogue.update(BroadcastState::AwaitingText).await?;

    Ok(())
}

// Handles the armed session: sends the incoming text to every registered
// user and reports the outcome. The session is cleared before the sends
// start. Non-text messages leave the session armed.
pub async fn receive_broadcast_text(
    bot: Bot,
    dialogue: MyDialogue,
    msg: Message,
    store: Arc<UserStore>,
) -> HandlerResult {
    if !is_admin(&msg) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    dialogue.exit().await?;

    let registry = store.load().await;
    let report = broadcast_with(&registry, text, |chat_id, body| {
        let bot = bot.clone();
        async move { bot.send_message(chat_id, body).await.map(|_| ()) }
    })
    .await;

    log::info!(
        "Broadcast finished: sent {}/{}",
        report.sent,
        report.attempted()
    );
    bot.send_message(msg.chat.id, format_report(&report)).await?;

    Ok(())
}

// Sends text to every registry entry in order. One failed recipient never
// stops the rest; failures are logged and collected into the report.
// Sending is injected so the loop can be driven without a live bot.
pub async fn broadcast_with<F, Fut>(registry: &Registry, text: &str, mut send: F) -> BroadcastReport
where
    F: FnMut(ChatId, String) -> Fut,
    Fut: Future<Output = Result<(), RequestError>>,
{
    let mut report = BroadcastReport::default();

    for user_id in registry.keys() {
        // Keys come from JSON, so a hand-edited file may hold garbage.
        let Ok(id) = user_id.parse::<i64>() else {
            log::warn!("Failed to send to {}: not a numeric id", user_id);
            report.failed.push(BroadcastFailure {
                user_id: user_id.clone(),
                reason: "not a numeric id".to_string(),
            });
            continue;
        };

        match send(ChatId(id), text.to_string()).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                log::warn!("Failed to send to {}: {}", user_id, e);
                report.failed.push(BroadcastFailure {
                    user_id: user_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report
}

pub fn format_report(report: &BroadcastReport) -> String {
    let mut out = format!(
        "Рассылка выполнена!\n📊 Отправлено: {}/{}\n❌ Не доставлено: {}",
        report.sent,
        report.attempted(),
        report.failed.len()
    );

    for failure in report.failed.iter().take(MAX_REPORTED_FAILURES) {
        out.push_str(&format!("\n• {}: {}", failure.user_id, failure.reason));
    }
    if report.failed.len() > MAX_REPORTED_FAILURES {
        let hidden = report.failed.len() - MAX_REPORTED_FAILURES;
        out.push_str(&format!("\n…и ещё {}", hidden));
    }

    out
}
