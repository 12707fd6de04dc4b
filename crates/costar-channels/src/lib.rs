//! Messaging gateway abstraction for the costar bot.
//!
//! The conversation engine talks to chat users only through
//! [`MessagingGateway`] and consumes their input as [`InboundEvent`]s.
//!
//! # Main types
//!
//! - [`MessagingGateway`]: Outbound rendering calls (text, photo, delete, ...).
//! - [`InboundEvent`]: A command, free text, button press or disconnect.
//! - [`ActionLink`]: A button attached to a photo.
//! - [`TelegramGateway`]: Telegram Bot API implementation with long polling.

/// Gateway trait and event types.
pub mod gateway;
/// Telegram Bot API integration.
pub mod telegram;
/// Outbound text limits.
pub mod text;

pub use gateway::{ActionLink, InboundEvent, MessagingGateway};
pub use telegram::TelegramGateway;
pub use text::{truncate_caption, truncate_text, MAX_CAPTION_CHARS, MAX_TEXT_CHARS};
