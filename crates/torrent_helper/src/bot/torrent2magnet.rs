//! Reply to a .torrent file with its magnet link.
use async_trait::async_trait;
use tracing::{error, info, warn};

use super::Handler;
use crate::{
    error::Error,
    magnet,
    metainfo::MetaInfo,
    transport::{ChatTransport, Inbound, TransportError, Update},
};

pub const GREETING: &str = "Send torrent file here";

pub const WRONG_METADATA: &str =
    "Failed convert torrent file to magnet link (wrong metadata). Sorry 😫";

pub const FAILED: &str = "Failed convert torrent file to magnet. Sorry 😫";

/// Largest document a bot may download from Telegram, 20 MiB.
pub const MAX_TORRENT_SIZE: u64 = 20 * 1024 * 1024;

/// Decode a .torrent file and build its magnet link.
///
/// # Errors
///
/// If the buffer is not bencode, or has no `info` dictionary.
pub fn torrent_to_magnet(buf: &[u8]) -> Result<String, Error> {
    let meta_info = MetaInfo::decode(buf)?;
    let info_hash = meta_info.info_hash()?;
    Ok(magnet::build(&info_hash, &meta_info))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TorrentToMagnet;

#[async_trait]
impl Handler for TorrentToMagnet {
    fn greeting(&self) -> &'static str {
        GREETING
    }

    async fn handle(
        &self,
        transport: &dyn ChatTransport,
        update: Update,
    ) -> Result<(), TransportError> {
        let Inbound::Document(file) = update.inbound else {
            return Ok(());
        };
        let chat = update.chat;
        let file_name = file.name.clone().unwrap_or_default();

        info!(chat, sender = ?update.sender, "torrent2magnet: session start");

        if file.size.is_some_and(|size| size > MAX_TORRENT_SIZE) {
            warn!(chat, file = %file_name, size = ?file.size, "torrent2magnet: file too large");
            return transport.send_text(chat, WRONG_METADATA).await;
        }

        let buf = match transport.download(&file).await {
            Ok(buf) => buf,
            Err(e) => {
                error!(chat, file = %file_name, "torrent2magnet: download failed: {e}");
                return transport.send_text(chat, FAILED).await;
            }
        };

        let magnet = match torrent_to_magnet(&buf) {
            Ok(magnet) => magnet,
            Err(e) => {
                error!(chat, file = %file_name, "torrent2magnet: wrong meta data: {e}");
                return transport.send_text(chat, WRONG_METADATA).await;
            }
        };

        info!(chat, file = %file_name, %magnet, "torrent2magnet: done");

        if let Err(e) = transport.send_text(chat, &magnet).await {
            error!(chat, file = %file_name, "torrent2magnet: could not send magnet: {e}");
            return transport.send_text(chat, FAILED).await;
        }

        Ok(())
    }
}
