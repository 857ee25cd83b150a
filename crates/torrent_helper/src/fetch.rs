//! Resolve a magnet link into a .torrent file within a deadline.
//!
//! A [`MetadataFetch`] opens one engine session, polls it until the metadata
//! is there or the deadline passes, and then asks the engine to write a
//! minimal .torrent. Fetches run on a [`FetchPool`] that caps how many of
//! them are in flight at once.
use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::{
    select, spawn,
    sync::Semaphore,
    time::{interval, sleep_until, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{
    engine::{EngineError, EngineSession, TorrentEngine, TorrentInfo},
    magnet::MagnetUri,
};

/// Fetches allowed to run at the same time.
pub const FETCH_WORKERS: usize = 15;

pub const METADATA_TIMEOUT: Duration = Duration::from_secs(180);

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest wait when the timeout does not fit an `Instant`.
const MAX_WAIT: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    /// Wall-clock budget of a single fetch.
    pub timeout: Duration,
    /// How often the session is asked if it has the metadata.
    pub poll_interval: Duration,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self { timeout: METADATA_TIMEOUT, poll_interval: POLL_INTERVAL }
    }
}

/// A synthesized .torrent, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Fetching,
    Succeeded,
    TimedOut,
    Failed,
}

/// How a fetch ended. Only `Succeeded` carries a file, the two other
/// outcomes are reported to users the same way.
#[derive(Debug)]
pub enum FetchOutcome {
    Succeeded(TorrentFile),
    TimedOut,
    Failed(EngineError),
}

impl FetchOutcome {
    pub fn state(&self) -> FetchState {
        match self {
            Self::Succeeded(_) => FetchState::Succeeded,
            Self::TimedOut => FetchState::TimedOut,
            Self::Failed(_) => FetchState::Failed,
        }
    }

    pub fn into_file(self) -> Option<TorrentFile> {
        match self {
            Self::Succeeded(file) => Some(file),
            _ => None,
        }
    }
}

/// `<name>.torrent`, with path separators and control characters replaced.
/// Torrents without a name are named after their info-hash.
pub fn file_name(info: &TorrentInfo) -> String {
    let name: String = info
        .name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if name.trim().is_empty() {
        format!("{}.torrent", info.info_hash.to_hex())
    } else {
        format!("{name}.torrent")
    }
}

/// A single magnet to .torrent conversion.
#[derive(Debug, Clone)]
pub struct MetadataFetch {
    magnet: MagnetUri,
    limits: FetchLimits,
}

impl MetadataFetch {
    pub fn new(magnet: MagnetUri, limits: FetchLimits) -> Self {
        Self { magnet, limits }
    }

    /// Run the fetch to completion. Never returns early, the only ways out
    /// are the metadata, an engine failure, or the deadline.
    #[tracing::instrument(name = "fetch", skip_all, fields(magnet = %self.magnet))]
    pub async fn run(self, engine: &dyn TorrentEngine) -> FetchOutcome {
        info!("magnet2torrent: start");

        match self.fetch(engine).await {
            Ok(Some(file)) => {
                info!(file = %file.file_name, "magnet2torrent: done");
                FetchOutcome::Succeeded(file)
            }
            Ok(None) => {
                warn!("the waiting time of metadata has expired");
                FetchOutcome::TimedOut
            }
            Err(e) => {
                error!("magnet2torrent failed: {e}");
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn fetch(
        &self,
        engine: &dyn TorrentEngine,
    ) -> Result<Option<TorrentFile>, EngineError> {
        let mut session = engine.session().await?;
        session.add_magnet(&self.magnet).await?;

        let ready = self.wait_for_metadata(&*session).await;
        session.pause().await;

        if !ready? {
            return Ok(None);
        }

        let info =
            session.torrent_info().await?.ok_or(EngineError::NoTorrentInfo)?;
        debug!(info_hash = %info.info_hash, "got metadata");

        let bytes = session.create_torrent(&info).await?;
        if bytes.is_empty() {
            return Err(EngineError::EmptyTorrent);
        }

        Ok(Some(TorrentFile { file_name: file_name(&info), bytes }))
    }

    /// `Ok(false)` when the deadline passed first.
    async fn wait_for_metadata(
        &self,
        session: &dyn EngineSession,
    ) -> Result<bool, EngineError> {
        let now = Instant::now();
        let deadline = now.checked_add(self.limits.timeout).unwrap_or_else(|| {
            warn!(timeout = ?self.limits.timeout, "timeout out of range, using {MAX_WAIT:?}");
            now + MAX_WAIT
        });

        let deadline = sleep_until(deadline);
        tokio::pin!(deadline);

        let mut poll = interval(self.limits.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                biased;
                _ = &mut deadline => return Ok(false),
                _ = poll.tick() => {
                    if session.has_metadata() {
                        return Ok(true);
                    }
                    if !session.is_valid() {
                        return Err(EngineError::InvalidHandle(
                            self.magnet.to_string(),
                        ));
                    }
                }
            }
        }
    }
}

/// Runs fetches on spawned tasks, at most `workers` at a time. Requests over
/// the limit wait for a free slot.
#[derive(Clone)]
pub struct FetchPool {
    engine: Arc<dyn TorrentEngine>,
    permits: Arc<Semaphore>,
    limits: FetchLimits,
}

impl FetchPool {
    pub fn new(
        engine: Arc<dyn TorrentEngine>,
        workers: usize,
        limits: FetchLimits,
    ) -> Self {
        Self { engine, permits: Arc::new(Semaphore::new(workers)), limits }
    }

    pub fn limits(&self) -> FetchLimits {
        self.limits
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn fetch(&self, magnet: MagnetUri) -> FetchOutcome {
        let engine = self.engine.clone();
        let permits = self.permits.clone();
        let limits = self.limits;

        let handle = spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return FetchOutcome::Failed(EngineError::Worker(
                    "the fetch pool is closed".to_owned(),
                ));
            };
            MetadataFetch::new(magnet, limits).run(engine.as_ref()).await
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("fetch worker stopped: {e}");
                FetchOutcome::Failed(EngineError::Worker(e.to_string()))
            }
        }
    }
}
