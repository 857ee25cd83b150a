//! Chat transports deliver user messages to the bots and send replies back.
mod telegram;

pub use telegram::{TelegramTransport, DEFAULT_API, LONG_POLL};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub type ChatId = i64;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to the chat service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("The chat service refused the request ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("The chat service answered with status {0}")]
    Status(u16),

    #[error("The chat service did not give a path for the file")]
    MissingFilePath,
}

/// A file attached to a message, downloaded on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub id: String,
    pub name: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/start`, `/help`... without the slash and the `@bot` suffix.
    Command(String),
    Text(String),
    Document(FileRef),
}

impl Inbound {
    /// Text messages starting with `/` are commands.
    pub fn from_text(text: &str) -> Self {
        match text.strip_prefix('/') {
            Some(cmd) if !cmd.is_empty() => {
                let cmd = cmd.split_whitespace().next().unwrap_or_default();
                let cmd = cmd.split('@').next().unwrap_or_default();
                Self::Command(cmd.to_ascii_lowercase())
            }
            _ => Self::Text(text.to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub chat: ChatId,
    /// The user who sent the message, absent for channel posts.
    pub sender: Option<i64>,
    pub inbound: Inbound,
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Wait for the next batch of updates. An empty batch is not an error.
    async fn updates(&self) -> Result<Vec<Update>, TransportError>;

    async fn download(&self, file: &FileRef) -> Result<Bytes, TransportError>;

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TransportError>;

    async fn send_document(
        &self,
        chat: ChatId,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<(), TransportError>;
}
