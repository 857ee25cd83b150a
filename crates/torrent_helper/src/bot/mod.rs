//! The two chat bots and the loop that feeds them.
//!
//! A [`Bot`] long-polls its transport and hands every update to its
//! [`Handler`] on a task of its own, so a slow conversion never holds up
//! other chats.
pub mod magnet2torrent;
pub mod torrent2magnet;

pub use magnet2torrent::MagnetToTorrent;
pub use torrent2magnet::{torrent_to_magnet, TorrentToMagnet};

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{select, spawn, task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};

use crate::transport::{ChatTransport, Inbound, TransportError, Update};

/// Pause after a failed poll before asking the transport again.
pub const POLL_BACKOFF: Duration = Duration::from_secs(1);

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// The answer to `/start` and `/help`.
    fn greeting(&self) -> &'static str;

    /// Handle everything that is not a greeting command. Conversion failures
    /// are answered to the user here, the returned error is only for a
    /// reply that could not be sent.
    async fn handle(
        &self,
        transport: &dyn ChatTransport,
        update: Update,
    ) -> Result<(), TransportError>;
}

pub struct Bot<H> {
    name: String,
    transport: Arc<dyn ChatTransport>,
    handler: Arc<H>,
}

impl<H: Handler> Bot<H> {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn ChatTransport>,
        handler: H,
    ) -> Self {
        Self { name: name.into(), transport, handler: Arc::new(handler) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Poll for updates until `cancel` fires. Updates already being handled
    /// are left to finish on their own.
    #[tracing::instrument(name = "bot", skip_all, fields(bot = %self.name))]
    pub async fn run(&self, cancel: CancellationToken) {
        info!("polling for updates");

        loop {
            let polled = select! {
                _ = cancel.cancelled() => break,
                polled = self.transport.updates() => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        self.dispatch(update);
                    }
                }
                Err(e) => {
                    warn!("failed to poll updates: {e}");
                    select! {
                        _ = cancel.cancelled() => break,
                        _ = sleep(POLL_BACKOFF) => {}
                    }
                }
            }
        }

        info!("stopped polling");
    }

    /// Handle a single update on its own task.
    pub fn dispatch(&self, update: Update) -> JoinHandle<()> {
        let transport = self.transport.clone();
        let handler = self.handler.clone();

        let task = async move {
            let chat = update.chat;

            let greeting = matches!(
                &update.inbound,
                Inbound::Command(cmd) if cmd == "start" || cmd == "help"
            );

            let result = if greeting {
                transport.send_text(chat, handler.greeting()).await
            } else {
                handler.handle(transport.as_ref(), update).await
            };

            if let Err(e) = result {
                error!(chat, "failed to reply: {e}");
            }
        };

        spawn(task.in_current_span())
    }
}
