use costar_channels::{truncate_caption, truncate_text, ActionLink, MessagingGateway};
use costar_core::{ConversationId, CostarError, CostarResult, MessageId, MessageKind, Metrics};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Front for the messaging gateway.
///
/// Every call is bounded by the send deadline, counted in the metrics, and
/// logged on failure. An expired call is abandoned and never retried. Errors
/// are still returned so callers can branch on them, but they have already
/// been reported.
#[derive(Clone)]
pub struct Courier {
    gateway: Arc<dyn MessagingGateway>,
    metrics: Arc<dyn Metrics>,
    send_timeout: Duration,
}

impl Courier {
    /// Wrap `gateway`, bounding each call by `send_timeout`.
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        metrics: Arc<dyn Metrics>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            metrics,
            send_timeout,
        }
    }

    async fn deliver<T>(
        &self,
        kind: MessageKind,
        call: impl Future<Output = CostarResult<T>>,
    ) -> CostarResult<T> {
        let result = match tokio::time::timeout(self.send_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CostarError::Timeout(format!(
                "{} call to {} exceeded {:?}",
                kind_label(kind),
                self.gateway.name(),
                self.send_timeout
            ))),
        };
        self.metrics.message_sent(kind, result.is_ok());
        if let Err(e) = &result {
            tracing::error!(kind = kind_label(kind), error = %e, "Gateway call failed");
        }
        result
    }

    /// Send text, truncated to the gateway limit.
    pub async fn text(&self, conversation: ConversationId, text: &str) -> CostarResult<MessageId> {
        let text = truncate_text(text);
        self.deliver(MessageKind::Text, self.gateway.send_text(conversation, &text))
            .await
    }

    /// Send a photo with caption and buttons. The caption is cut to the photo limit.
    pub async fn photo(
        &self,
        conversation: ConversationId,
        url: &str,
        caption: &str,
        actions: &[ActionLink],
    ) -> CostarResult<MessageId> {
        let caption = truncate_caption(caption);
        self.deliver(
            MessageKind::Photo,
            self.gateway.send_photo(conversation, url, &caption, actions),
        )
        .await
    }

    /// Delete a message.
    pub async fn delete(&self, conversation: ConversationId, message_id: MessageId) -> CostarResult<()> {
        self.deliver(
            MessageKind::Delete,
            self.gateway.delete_message(conversation, message_id),
        )
        .await
    }

    /// Acknowledge a button press.
    pub async fn answer(&self, callback_id: &str, text: &str) -> CostarResult<()> {
        self.deliver(
            MessageKind::CallbackAnswer,
            self.gateway.answer_callback(callback_id, text),
        )
        .await
    }

    /// Replace the buttons of a message.
    pub async fn edit(
        &self,
        conversation: ConversationId,
        message_id: MessageId,
        actions: &[ActionLink],
    ) -> CostarResult<()> {
        self.deliver(
            MessageKind::Edit,
            self.gateway
                .edit_message_actions(conversation, message_id, actions),
        )
        .await
    }
}

fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Text => "text",
        MessageKind::Photo => "photo",
        MessageKind::Delete => "delete",
        MessageKind::CallbackAnswer => "callback_answer",
        MessageKind::Edit => "edit",
    }
}
