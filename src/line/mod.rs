//! LINE Messaging API: webhook signatures, event model and the reply client.

mod client;
mod events;
pub mod signature;

pub use client::{text_message, LineClient, ReplyRequest, TextMessage};
pub use events::{Event, IncomingText, Message, MessageEvent, Source, WebhookBody};

/// Header carrying the webhook body signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";
