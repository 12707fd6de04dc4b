use crate::gateway::{ActionLink, InboundEvent, MessagingGateway};
use async_trait::async_trait;
use costar_core::{ConversationId, CostarError, CostarResult, MessageId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API gateway.
///
/// Uses the Bot HTTP API for every outbound call and long-polling
/// (`getUpdates`) for inbound traffic. Incoming updates are mapped to
/// [`InboundEvent`]s and forwarded through a `tokio::sync::mpsc` channel.
pub struct TelegramGateway {
    bot_token: String,
    api_base: String,
    poll_timeout_secs: u64,
    retry_delay: Duration,
    client: reqwest::Client,
    event_tx: mpsc::Sender<InboundEvent>,
    event_rx: Option<mpsc::Receiver<InboundEvent>>,
}

// ── Telegram API types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    #[serde(default)]
    message: Option<TelegramMessagePayload>,
    #[serde(default)]
    callback_query: Option<TelegramCallbackQuery>,
    #[serde(default)]
    my_chat_member: Option<TelegramChatMemberUpdated>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessagePayload {
    message_id: i64,
    chat: TelegramChat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramCallbackQuery {
    id: String,
    #[serde(default)]
    message: Option<TelegramMessagePayload>,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChatMemberUpdated {
    chat: TelegramChat,
    new_chat_member: TelegramChatMember,
}

#[derive(Debug, Deserialize)]
struct TelegramChatMember {
    status: String,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct SendPhotoRequest<'a> {
    chat_id: i64,
    photo: &'a str,
    caption: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<InlineKeyboardMarkup>,
}

#[derive(Debug, Serialize)]
struct DeleteMessageRequest {
    chat_id: i64,
    message_id: i64,
}

#[derive(Debug, Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct EditReplyMarkupRequest {
    chat_id: i64,
    message_id: i64,
    reply_markup: InlineKeyboardMarkup,
}

/// All actions go on a single row.
fn keyboard(actions: &[ActionLink]) -> InlineKeyboardMarkup {
    let row = actions
        .iter()
        .map(|action| match action {
            ActionLink::Url { label, url } => InlineKeyboardButton {
                text: label.clone(),
                url: Some(url.clone()),
                callback_data: None,
            },
            ActionLink::Callback { label, data } => InlineKeyboardButton {
                text: label.clone(),
                url: None,
                callback_data: Some(data.clone()),
            },
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup {
        inline_keyboard: if row.is_empty() { Vec::new() } else { vec![row] },
    }
}

/// Split `/name@bot rest` into `("name", "rest")`.
fn parse_command(text: &str) -> Option<(String, String)> {
    let body = text.strip_prefix('/')?;
    let (head, rest) = match body.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (body, ""),
    };
    let name = head.split('@').next().unwrap_or(head);
    if name.is_empty() {
        return None;
    }
    Some((name.to_lowercase(), rest.to_string()))
}

fn update_to_event(update: TelegramUpdate) -> Option<InboundEvent> {
    if let Some(query) = update.callback_query {
        // Callbacks on inline messages carry no chat; nothing to route them to.
        let message = query.message?;
        return Some(InboundEvent::Callback {
            conversation: message.chat.id,
            callback_id: query.id,
            message_id: message.message_id,
            data: query.data.unwrap_or_default(),
        });
    }

    if let Some(member) = update.my_chat_member {
        return match member.new_chat_member.status.as_str() {
            "kicked" | "left" => Some(InboundEvent::Disconnected {
                conversation: member.chat.id,
            }),
            _ => None,
        };
    }

    let message = update.message?;
    let text = message.text?;
    let conversation = message.chat.id;
    match parse_command(&text) {
        Some((command, args)) => Some(InboundEvent::Command {
            conversation,
            command,
            args,
        }),
        None => Some(InboundEvent::Text {
            conversation,
            text: text.trim().to_string(),
        }),
    }
}

// ── Implementation ──────────────────────────────────────────────────────────

impl TelegramGateway {
    /// Create a new `TelegramGateway`.
    ///
    /// * `bot_token` – The bot token obtained from @BotFather.
    /// * `event_buffer` – Capacity of the internal mpsc event buffer.
    pub fn new(bot_token: impl Into<String>, event_buffer: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        Self {
            bot_token: bot_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            poll_timeout_secs: 30,
            retry_delay: Duration::from_secs(3),
            client: reqwest::Client::new(),
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Point the gateway at a different Bot API server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Long-poll timeout passed to `getUpdates`, in seconds.
    pub fn with_poll_timeout(mut self, secs: u64) -> Self {
        self.poll_timeout_secs = secs;
        self
    }

    /// Pause after a failed poll before trying again.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Take the receiving half of the event channel.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_event_receiver(&mut self) -> Option<mpsc::Receiver<InboundEvent>> {
        self.event_rx.take()
    }

    /// Start long-polling the Telegram `getUpdates` endpoint.
    ///
    /// Runs until the event receiver is dropped. Poll failures are logged and
    /// retried after the configured delay. It should be spawned onto a Tokio
    /// task.
    pub async fn poll_updates(&self) -> CostarResult<()> {
        let mut offset: Option<i64> = None;

        loop {
            let updates = match self.fetch_updates(offset).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!(error = %e, "Telegram poll failed");
                    tokio::time::sleep(self.retry_delay).await;
                    continue;
                }
            };

            for update in updates {
                // Advance the offset so we do not receive this update again.
                offset = Some(update.update_id + 1);

                let Some(event) = update_to_event(update) else {
                    continue;
                };
                if self.event_tx.send(event).await.is_err() {
                    tracing::info!("Event receiver dropped, polling stopped");
                    return Ok(());
                }
            }
        }
    }

    async fn fetch_updates(&self, offset: Option<i64>) -> CostarResult<Vec<TelegramUpdate>> {
        let mut params: Vec<(&str, String)> = vec![
            ("timeout", self.poll_timeout_secs.to_string()),
            (
                "allowed_updates",
                r#"["message","callback_query","my_chat_member"]"#.to_string(),
            ),
        ];
        if let Some(off) = offset {
            params.push(("offset", off.to_string()));
        }

        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&params)
            .send()
            .await
            .map_err(|e| CostarError::Gateway(format!("Telegram poll error: {e}")))?;
        let body: TelegramResponse<Vec<TelegramUpdate>> = response
            .json()
            .await
            .map_err(|e| CostarError::Gateway(format!("Telegram parse error: {e}")))?;
        Self::unwrap_result("getUpdates", body)
    }

    async fn call<P: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &P,
    ) -> CostarResult<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(payload)
            .send()
            .await
            .map_err(|e| CostarError::Gateway(format!("Telegram {method} error: {e}")))?;
        let body: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| CostarError::Gateway(format!("Telegram parse error: {e}")))?;
        Self::unwrap_result(method, body)
    }

    fn unwrap_result<T>(method: &str, body: TelegramResponse<T>) -> CostarResult<T> {
        if !body.ok {
            return Err(CostarError::Gateway(format!(
                "Telegram {method} failed: {}",
                body.description.unwrap_or_default()
            )));
        }
        body.result
            .ok_or_else(|| CostarError::Gateway(format!("Telegram {method} returned no result")))
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(&self, conversation: ConversationId, text: &str) -> CostarResult<MessageId> {
        let payload = SendMessageRequest {
            chat_id: conversation,
            text,
        };
        let sent: SentMessage = self.call("sendMessage", &payload).await?;
        Ok(sent.message_id)
    }

    async fn send_photo(
        &self,
        conversation: ConversationId,
        url: &str,
        caption: &str,
        actions: &[ActionLink],
    ) -> CostarResult<MessageId> {
        let payload = SendPhotoRequest {
            chat_id: conversation,
            photo: url,
            caption,
            reply_markup: (!actions.is_empty()).then(|| keyboard(actions)),
        };
        let sent: SentMessage = self.call("sendPhoto", &payload).await?;
        Ok(sent.message_id)
    }

    async fn delete_message(
        &self,
        conversation: ConversationId,
        message_id: MessageId,
    ) -> CostarResult<()> {
        let payload = DeleteMessageRequest {
            chat_id: conversation,
            message_id,
        };
        let _: bool = self.call("deleteMessage", &payload).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> CostarResult<()> {
        let payload = AnswerCallbackRequest {
            callback_query_id: callback_id,
            text: (!text.is_empty()).then_some(text),
        };
        let _: bool = self.call("answerCallbackQuery", &payload).await?;
        Ok(())
    }

    async fn edit_message_actions(
        &self,
        conversation: ConversationId,
        message_id: MessageId,
        actions: &[ActionLink],
    ) -> CostarResult<()> {
        let payload = EditReplyMarkupRequest {
            chat_id: conversation,
            message_id,
            reply_markup: keyboard(actions),
        };
        // Telegram answers with the edited message, or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageReplyMarkup", &payload).await?;
        Ok(())
    }
}
