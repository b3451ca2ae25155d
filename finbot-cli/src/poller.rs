//! Long-polling loop: fetch updates, handle them one at a time in arrival
//! order, send the replies.

use anyhow::{Context, Result};
use chrono::Utc;
use finbot_core::MessageIntent;
use finbot_ledger::Ledger;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::BotSection;
use crate::handlers::{Bot, Input, UserInfo};
use crate::llm::Assistant;
use crate::telegram::{TelegramClient, Update};

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// One update reduced to what the bot needs
#[derive(Debug, Clone, PartialEq)]
struct Incoming {
    chat_id: i64,
    user_id: i64,
    first_name: String,
    input: Input,
    callback_id: Option<String>,
}

fn incoming(update: Update) -> Option<Incoming> {
    if let Some(cb) = update.callback_query {
        let chat_id = cb.message.as_ref().map(|m| m.chat.id).unwrap_or(cb.from.id);
        return Some(Incoming {
            chat_id,
            user_id: cb.from.id,
            first_name: cb.from.first_name,
            input: Input::Callback(cb.data.unwrap_or_default()),
            callback_id: Some(cb.id),
        });
    }
    let msg = update.message?;
    let from = msg.from?;
    let text = msg.text.filter(|t| !t.trim().is_empty())?;
    Some(Incoming {
        chat_id: msg.chat.id,
        user_id: from.id,
        first_name: from.first_name,
        input: Input::Text(text),
        callback_id: None,
    })
}

pub async fn run<L: Ledger, A: Assistant>(
    client: &TelegramClient,
    bot: &Bot<L, A>,
    cfg: &BotSection,
) -> Result<()> {
    let me = client
        .get_me()
        .await
        .context("getMe failed (is TELEGRAM_BOT_TOKEN valid?)")?;
    info!(
        bot = me.username.as_deref().unwrap_or(&me.first_name),
        "connected to Telegram"
    );
    client
        .delete_webhook(cfg.drop_pending_updates)
        .await
        .context("deleteWebhook")?;
    if let Err(e) = client.set_my_commands().await {
        warn!("setMyCommands failed: {e}");
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut offset = 0i64;
    let mut backoff = Duration::from_secs(1);
    info!("bot is running, press Ctrl+C to stop");

    loop {
        let batch = tokio::select! {
            _ = &mut shutdown => break,
            res = client.get_updates(offset, cfg.poll_timeout_secs) => res,
        };
        let updates = match batch {
            Ok(updates) => {
                backoff = Duration::from_secs(1);
                updates
            }
            Err(e) => {
                warn!("getUpdates failed: {e}; retrying in {}s", backoff.as_secs());
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(msg) = incoming(update) else {
                continue;
            };
            process(client, bot, msg).await;
        }
    }

    info!("stopped");
    Ok(())
}

async fn process<L: Ledger, A: Assistant>(client: &TelegramClient, bot: &Bot<L, A>, msg: Incoming) {
    if let Some(id) = &msg.callback_id
        && let Err(e) = client.answer_callback_query(id).await
    {
        warn!("answerCallbackQuery failed: {e}");
    }

    let user = UserInfo {
        id: msg.user_id,
        first_name: msg.first_name,
    };
    let now = Utc::now();
    let intent = bot.route(&msg.input, now);
    debug!(user = user.id, ?intent, "routed");

    if matches!(intent, MessageIntent::Chat(_))
        && let Err(e) = client.send_typing(msg.chat_id).await
    {
        warn!("sendChatAction failed: {e}");
    }

    let reply = bot.respond(&user, intent, now).await;
    if let Err(e) = client
        .send_message(msg.chat_id, &reply.text, reply.keyboard.as_ref())
        .await
    {
        error!(chat = msg.chat_id, "sendMessage failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(raw: &str) -> Update {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_text_message_becomes_text_input() {
        let u = update(
            r#"{"update_id":5,"message":{"message_id":1,"from":{"id":42,"first_name":"Sari"},
                "chat":{"id":-100,"type":"group"},"text":"makan 25000"}}"#,
        );
        let msg = incoming(u).unwrap();
        assert_eq!(msg.chat_id, -100);
        assert_eq!(msg.user_id, 42);
        assert_eq!(msg.input, Input::Text("makan 25000".to_string()));
        assert_eq!(msg.callback_id, None);
    }

    #[test]
    fn test_callback_replies_in_originating_chat() {
        let u = update(
            r#"{"update_id":6,"callback_query":{"id":"cb9","from":{"id":42,"first_name":"Sari"},
                "message":{"message_id":3,"chat":{"id":77,"type":"private"}},"data":"monthly_report"}}"#,
        );
        let msg = incoming(u).unwrap();
        assert_eq!(msg.chat_id, 77);
        assert_eq!(msg.input, Input::Callback("monthly_report".to_string()));
        assert_eq!(msg.callback_id.as_deref(), Some("cb9"));
    }

    #[test]
    fn test_ignores_updates_without_text() {
        let sticker = update(
            r#"{"update_id":7,"message":{"message_id":4,"from":{"id":42,"first_name":"Sari"},
                "chat":{"id":42,"type":"private"}}}"#,
        );
        assert!(incoming(sticker).is_none());
        assert!(incoming(update(r#"{"update_id":8}"#)).is_none());
    }
}
