//! Minimal Telegram Bot API client: long polling and the handful of
//! methods the bot needs.

use finbot_core::Command;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("telegram {method} failed ({code}): {description}")]
    Api {
        method: &'static str,
        code: i64,
        description: String,
    },
}

pub type Result<T> = std::result::Result<T, TelegramError>;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: &str, callback_data: &str) -> Self {
        Self {
            text: text.to_string(),
            callback_data: callback_data.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

pub struct TelegramClient {
    http: reqwest::Client,
    base: String,
}

impl TelegramClient {
    pub fn new(api_base: &str, token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("{}/bot{}", api_base.trim_end_matches('/'), token),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &Value,
        timeout: Duration,
    ) -> Result<T> {
        debug!(method, "telegram call");
        let resp = self
            .http
            .post(format!("{}/{}", self.base, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?;
        let parsed: ApiResponse<T> = resp.json().await?;
        unwrap_response(method, parsed)
    }

    /// Long poll; blocks server-side for up to `timeout_secs`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let body = json!({
            "offset": offset,
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        // leave the server room to answer before the client gives up
        let timeout = Duration::from_secs(timeout_secs + 10);
        self.call("getUpdates", &body, timeout).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(kb) = keyboard {
            body["reply_markup"] = serde_json::to_value(kb).unwrap_or(Value::Null);
        }
        match self.call::<Value>("sendMessage", &body, short()).await {
            Ok(_) => Ok(()),
            // user text with stray `*` or `_` breaks Markdown; resend as plain text
            Err(e) if is_markup_error(&e) => {
                debug!("markdown rejected, resending as plain text");
                if let Some(obj) = body.as_object_mut() {
                    obj.remove("parse_mode");
                }
                let _: Value = self.call("sendMessage", &body, short()).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn send_typing(&self, chat_id: i64) -> Result<()> {
        let body = json!({ "chat_id": chat_id, "action": "typing" });
        let _: bool = self.call("sendChatAction", &body, short()).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, id: &str) -> Result<()> {
        let body = json!({ "callback_query_id": id });
        let _: bool = self.call("answerCallbackQuery", &body, short()).await?;
        Ok(())
    }

    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        let body = json!({ "drop_pending_updates": drop_pending_updates });
        let _: bool = self.call("deleteWebhook", &body, short()).await?;
        Ok(())
    }

    /// Publish the command menu shown next to the input box.
    pub async fn set_my_commands(&self) -> Result<()> {
        let _: bool = self.call("setMyCommands", &commands_body(), short()).await?;
        Ok(())
    }

    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({}), short()).await
    }
}

fn short() -> Duration {
    Duration::from_secs(30)
}

fn commands_body() -> Value {
    let commands: Vec<Value> = Command::menu()
        .iter()
        .map(|(c, desc)| json!({ "command": c.name(), "description": desc }))
        .collect();
    json!({ "commands": commands })
}

fn is_markup_error(e: &TelegramError) -> bool {
    matches!(e, TelegramError::Api { code: 400, description, .. } if description.contains("parse entities"))
}

fn unwrap_response<T>(method: &'static str, resp: ApiResponse<T>) -> Result<T> {
    match (resp.ok, resp.result) {
        (true, Some(result)) => Ok(result),
        (ok, _) => Err(TelegramError::Api {
            method,
            code: resp.error_code.unwrap_or(0),
            description: resp.description.unwrap_or_else(|| {
                if ok { "missing result".to_string() } else { "unknown error".to_string() }
            }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_message_and_callback_updates() {
        let raw = r#"{"ok":true,"result":[
            {"update_id":10,"message":{"message_id":1,"from":{"id":42,"is_bot":false,"first_name":"Sari"},
             "chat":{"id":42,"type":"private"},"date":1760400000,"text":"makan 25000"}},
            {"update_id":11,"callback_query":{"id":"cb1","from":{"id":42,"first_name":"Sari"},
             "message":{"message_id":2,"chat":{"id":42,"type":"private"}},"data":"check_balance"}}
        ]}"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let updates = unwrap_response("getUpdates", resp).unwrap();
        assert_eq!(updates.len(), 2);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.text.as_deref(), Some("makan 25000"));
        assert_eq!(msg.from.as_ref().unwrap().first_name, "Sari");
        let cb = updates[1].callback_query.as_ref().unwrap();
        assert_eq!(cb.data.as_deref(), Some("check_balance"));
        assert_eq!(cb.message.as_ref().unwrap().chat.id, 42);
    }

    #[test]
    fn test_api_error_keeps_description() {
        let raw = r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#;
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        match unwrap_response("getUpdates", resp) {
            Err(TelegramError::Api { code, description, .. }) => {
                assert_eq!(code, 401);
                assert_eq!(description, "Unauthorized");
            }
            other => panic!("unexpected {other:?}"),
        }

        let markup = TelegramError::Api {
            method: "sendMessage",
            code: 400,
            description: "Bad Request: can't parse entities: Can't find end of the entity".to_string(),
        };
        assert!(is_markup_error(&markup));
    }

    #[test]
    fn test_command_menu_body() {
        let body = commands_body();
        let commands = body["commands"].as_array().unwrap();
        assert_eq!(commands.len(), Command::menu().len());
        assert_eq!(commands[0]["command"], "start");
    }
}
