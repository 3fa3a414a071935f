use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::LineConfig;
use crate::error::{BotError, Result};

const SERVICE: &str = "line";

/// Platform limits for a text message with quick replies
pub const MAX_TEXT_CHARS: usize = 5000;
pub const MAX_QUICK_REPLY_ITEMS: usize = 13;
pub const MAX_LABEL_CHARS: usize = 20;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub reply_token: String,
    pub messages: Vec<TextMessage>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_reply: Option<QuickReply>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QuickReply {
    pub items: Vec<QuickReplyItem>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QuickReplyItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub action: MessageAction,
}

/// Tapping the button sends `text` as if the user typed it.
#[derive(Debug, Serialize, PartialEq)]
pub struct MessageAction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub label: String,
    pub text: String,
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Builds a text message, clipping everything to the platform limits.
pub fn text_message(text: &str, quick_replies: &[String]) -> TextMessage {
    let quick_reply = if quick_replies.is_empty() {
        None
    } else {
        Some(QuickReply {
            items: quick_replies
                .iter()
                .take(MAX_QUICK_REPLY_ITEMS)
                .map(|label| QuickReplyItem {
                    kind: "action",
                    action: MessageAction {
                        kind: "message",
                        label: truncate_chars(label, MAX_LABEL_CHARS),
                        text: label.clone(),
                    },
                })
                .collect(),
        })
    };

    TextMessage {
        kind: "text",
        text: truncate_chars(text, MAX_TEXT_CHARS),
        quick_reply,
    }
}

/// Minimal LINE Messaging API client: replies to webhook events.
pub struct LineClient {
    client: Client,
    endpoint: String,
    access_token: String,
}

impl LineClient {
    pub fn new(config: &LineConfig, access_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/v2/bot/message/reply", config.api_base.trim_end_matches('/')),
            access_token: access_token.into(),
        })
    }

    /// Answers an event using its one-shot reply token.
    pub async fn reply(&self, reply_token: &str, text: &str, quick_replies: &[String]) -> Result<()> {
        let request = ReplyRequest {
            reply_token: reply_token.to_string(),
            messages: vec![text_message(text, quick_replies)],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BotError::Upstream {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        debug!("Reply delivered for token {}", reply_token);
        Ok(())
    }
}
