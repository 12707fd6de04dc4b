use async_trait::async_trait;
use costar_core::{ConversationId, CostarResult, MessageId};
use serde::{Deserialize, Serialize};

/// A button rendered under a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionLink {
    /// Opens an external page.
    Url {
        /// Button text.
        label: String,
        /// Target page.
        url: String,
    },
    /// Sends `data` back as an [`InboundEvent::Callback`].
    Callback {
        /// Button text.
        label: String,
        /// Opaque payload echoed back on press.
        data: String,
    },
}

impl ActionLink {
    /// Link button.
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            label: label.into(),
            url: url.into(),
        }
    }

    /// Callback button.
    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Callback {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Something a user did in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/command args`, with any bot-name suffix already stripped.
    Command {
        /// Originating conversation.
        conversation: ConversationId,
        /// Command name without the leading slash.
        command: String,
        /// Everything after the command, trimmed.
        args: String,
    },
    /// Free text, trimmed.
    Text {
        /// Originating conversation.
        conversation: ConversationId,
        /// Message text.
        text: String,
    },
    /// A callback button was pressed on `message_id`.
    Callback {
        /// Originating conversation.
        conversation: ConversationId,
        /// Platform handle used to acknowledge the press.
        callback_id: String,
        /// Message the button belongs to.
        message_id: MessageId,
        /// Payload of the pressed button.
        data: String,
    },
    /// The user blocked or removed the bot.
    Disconnected {
        /// Conversation that went away.
        conversation: ConversationId,
    },
}

impl InboundEvent {
    /// The conversation the event belongs to.
    pub fn conversation(&self) -> ConversationId {
        match self {
            Self::Command { conversation, .. }
            | Self::Text { conversation, .. }
            | Self::Callback { conversation, .. }
            | Self::Disconnected { conversation } => *conversation,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Command { .. } => "command",
            Self::Text { .. } => "text",
            Self::Callback { .. } => "callback",
            Self::Disconnected { .. } => "disconnected",
        }
    }
}

/// Outbound side of a chat platform.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Platform name, used in logs.
    fn name(&self) -> &str;

    /// Send a plain text message.
    async fn send_text(&self, conversation: ConversationId, text: &str) -> CostarResult<MessageId>;

    /// Send a photo by URL with a caption and buttons.
    async fn send_photo(
        &self,
        conversation: ConversationId,
        url: &str,
        caption: &str,
        actions: &[ActionLink],
    ) -> CostarResult<MessageId>;

    /// Delete a previously sent message.
    async fn delete_message(
        &self,
        conversation: ConversationId,
        message_id: MessageId,
    ) -> CostarResult<()>;

    /// Acknowledge a button press, optionally with a short notice.
    async fn answer_callback(&self, callback_id: &str, text: &str) -> CostarResult<()>;

    /// Replace the buttons of a sent message.
    async fn edit_message_actions(
        &self,
        conversation: ConversationId,
        message_id: MessageId,
        actions: &[ActionLink],
    ) -> CostarResult<()>;
}
