use crate::error::{BotError, Result};

pub const PINECONE_API_KEY: &str = "PINECONE_API_KEY";
pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
pub const LINE_CHANNEL_ACCESS_TOKEN: &str = "LINE_CHANNEL_ACCESS_TOKEN";
pub const LINE_CHANNEL_SECRET: &str = "LINE_CHANNEL_SECRET";

/// API credentials read from the process environment.
///
/// Kept out of the layered settings so they never land in config files.
#[derive(Clone, Default)]
pub struct Secrets {
    pub pinecone_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub line_channel_access_token: Option<String>,
    pub line_channel_secret: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| if v.is_some() { "<set>" } else { "<missing>" };
        f.debug_struct("Secrets")
            .field("pinecone_api_key", &mask(&self.pinecone_api_key))
            .field("openrouter_api_key", &mask(&self.openrouter_api_key))
            .field("line_channel_access_token", &mask(&self.line_channel_access_token))
            .field("line_channel_secret", &mask(&self.line_channel_secret))
            .finish()
    }
}

impl Secrets {
    /// Reads all credentials from the environment. Empty values count as missing.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            pinecone_api_key: read(PINECONE_API_KEY),
            openrouter_api_key: read(OPENROUTER_API_KEY),
            line_channel_access_token: read(LINE_CHANNEL_ACCESS_TOKEN),
            line_channel_secret: read(LINE_CHANNEL_SECRET),
        }
    }

    /// Fails with every missing variable listed, in a fixed order.
    pub fn validate(&self, need_pinecone: bool, need_line: bool) -> Result<()> {
        let mut missing = Vec::new();
        if need_pinecone && self.pinecone_api_key.is_none() {
            missing.push(PINECONE_API_KEY);
        }
        if self.openrouter_api_key.is_none() {
            missing.push(OPENROUTER_API_KEY);
        }
        if need_line && self.line_channel_access_token.is_none() {
            missing.push(LINE_CHANNEL_ACCESS_TOKEN);
        }
        if need_line && self.line_channel_secret.is_none() {
            missing.push(LINE_CHANNEL_SECRET);
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(BotError::MissingSecrets(missing))
        }
    }

    pub fn pinecone_api_key(&self) -> Result<&str> {
        required(&self.pinecone_api_key, PINECONE_API_KEY)
    }

    pub fn openrouter_api_key(&self) -> Result<&str> {
        required(&self.openrouter_api_key, OPENROUTER_API_KEY)
    }

    pub fn line_channel_access_token(&self) -> Result<&str> {
        required(&self.line_channel_access_token, LINE_CHANNEL_ACCESS_TOKEN)
    }

    pub fn line_channel_secret(&self) -> Result<&str> {
        required(&self.line_channel_secret, LINE_CHANNEL_SECRET)
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| BotError::MissingSecrets(vec![name]))
}
