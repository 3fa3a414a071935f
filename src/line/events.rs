use serde::Deserialize;

/// Body of a webhook call from the LINE platform.
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Webhook events the bot distinguishes. Anything else parses as `Other`
/// so new event kinds never break the webhook.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Message(MessageEvent),
    Follow(ReplyableEvent),
    Unfollow(SourceEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEvent {
    /// Absent on events that cannot be answered, e.g. in standby mode
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
    #[serde(default)]
    pub timestamp: i64,
    pub message: Message,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyableEvent {
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<Source>,
}

#[derive(Debug, Deserialize)]
pub struct SourceEvent {
    #[serde(default)]
    pub source: Option<Source>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Text {
        #[serde(default)]
        id: String,
        text: String,
    },
    #[serde(other)]
    Other,
}

/// A text message that can be answered with a reply token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingText<'a> {
    pub reply_token: &'a str,
    pub text: &'a str,
    pub user_id: Option<&'a str>,
}

impl Event {
    pub fn as_text(&self) -> Option<IncomingText<'_>> {
        match self {
            Event::Message(MessageEvent {
                reply_token: Some(reply_token),
                source,
                message: Message::Text { text, .. },
                ..
            }) => Some(IncomingText {
                reply_token,
                text,
                user_id: source.as_ref().and_then(|s| s.user_id.as_deref()),
            }),
            _ => None,
        }
    }
}

impl WebhookBody {
    pub fn text_messages(&self) -> impl Iterator<Item = IncomingText<'_>> {
        self.events.iter().filter_map(Event::as_text)
    }
}
