//! Reply to a magnet link with its .torrent file.
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::Handler;
use crate::{
    fetch::{FetchOutcome, FetchPool},
    magnet::MagnetUri,
    transport::{ChatTransport, Inbound, TransportError, Update},
};

pub const GREETING: &str = "Send magnet link here";

pub const INVALID_MAGNET: &str = "Invalid magnet link 😫";

pub const FAILED: &str = "Failed convert magnet link to torrent file. Sorry 😫";

/// Sent before a fetch starts, `timeout` rounded up to whole minutes.
pub fn fetching_message(timeout: Duration) -> String {
    let minutes = timeout.as_secs().div_ceil(60).max(1);
    format!("Fetching meta data. Wait please... 🙏 It may take up to {minutes} minutes.")
}

#[derive(Clone)]
pub struct MagnetToTorrent {
    pool: FetchPool,
}

impl MagnetToTorrent {
    pub fn new(pool: FetchPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Handler for MagnetToTorrent {
    fn greeting(&self) -> &'static str {
        GREETING
    }

    async fn handle(
        &self,
        transport: &dyn ChatTransport,
        update: Update,
    ) -> Result<(), TransportError> {
        let chat = update.chat;
        let text = match update.inbound {
            Inbound::Text(text) => text,
            Inbound::Command(cmd) => format!("/{cmd}"),
            Inbound::Document(_) => return Ok(()),
        };

        info!(chat, sender = ?update.sender, "magnet2torrent: session start");

        let magnet = match MagnetUri::parse(&text) {
            Ok(magnet) => magnet,
            Err(e) => {
                warn!(chat, magnet = %text, "invalid magnet link: {e}");
                return transport.send_text(chat, INVALID_MAGNET).await;
            }
        };

        let wait = fetching_message(self.pool.limits().timeout);
        transport.send_text(chat, &wait).await?;

        match self.pool.fetch(magnet).await {
            FetchOutcome::Succeeded(file) => {
                info!(chat, magnet = %text, file = %file.file_name, "sending torrent file");
                transport.send_document(chat, &file.file_name, file.bytes).await
            }
            outcome => {
                warn!(
                    chat,
                    magnet = %text,
                    state = ?outcome.state(),
                    "magnet2torrent: no torrent file"
                );
                transport.send_text(chat, FAILED).await
            }
        }
    }
}
