//! The torrent engine resolves a magnet link into its metadata.
//!
//! This crate never talks to peers. An engine is an opaque collaborator that
//! knows how to get the `info` dictionary of an info-hash from somewhere,
//! the [`crate::fetch`] orchestrator only drives it through these traits and
//! enforces the deadline.
//!
//! Every fetch opens its own [`EngineSession`], nothing is shared between
//! two fetches.
mod cache;

pub use cache::{CacheEngine, CacheSession, DEFAULT_MIRRORS};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::{
    bencode::{DecodeError, Value},
    error::ValidationError,
    info_hash::InfoHash,
    magnet::MagnetUri,
    metainfo::MetaInfo,
};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("The engine has no valid handle for `{0}`")]
    InvalidHandle(String),

    #[error("The magnet link cannot be used: {0}")]
    Magnet(#[from] ValidationError),

    #[error("Request to the metadata source failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metadata source `{url}` answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("Could not decode the fetched metadata: {0}")]
    Decode(#[from] DecodeError),

    #[error("Fetched metadata has info_hash {got}, expected {expected}")]
    InfoHashMismatch { expected: InfoHash, got: InfoHash },

    #[error("Failed getting torrent info")]
    NoTorrentInfo,

    #[error("Empty torrent content body")]
    EmptyTorrent,

    #[error("The worker running the fetch stopped: {0}")]
    Worker(String),
}

/// Metadata of a torrent as retrieved by an engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentInfo {
    pub info_hash: InfoHash,
    /// `info.name`, may be empty if the torrent has none.
    pub name: String,
    /// The raw `info` dictionary.
    pub info: Value,
    pub trackers: Vec<String>,
}

impl TorrentInfo {
    /// # Errors
    ///
    /// If `info` is missing or is not a dictionary.
    pub fn from_meta_info(meta_info: &MetaInfo) -> Result<Self, ValidationError> {
        Ok(Self {
            info_hash: meta_info.info_hash()?,
            name: meta_info.name().unwrap_or_default().into_owned(),
            info: meta_info.info()?.clone(),
            trackers: meta_info.trackers(),
        })
    }
}

/// Creates one isolated session per fetch.
#[async_trait]
pub trait TorrentEngine: Send + Sync {
    async fn session(&self) -> Result<Box<dyn EngineSession>, EngineError>;
}

/// A single metadata download, created by [`TorrentEngine::session`].
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Start resolving the magnet, metadata only, no piece data.
    async fn add_magnet(&mut self, magnet: &MagnetUri) -> Result<(), EngineError>;

    /// False once the session knows it will never get the metadata.
    fn is_valid(&self) -> bool;

    /// Cheap to call, polled until it is true.
    fn has_metadata(&self) -> bool;

    /// Stop all network activity of the session.
    async fn pause(&mut self);

    async fn torrent_info(&mut self) -> Result<Option<TorrentInfo>, EngineError>;

    /// Synthesize a minimal .torrent file from the retrieved metadata.
    async fn create_torrent(&mut self, info: &TorrentInfo) -> Result<Bytes, EngineError> {
        let meta_info = MetaInfo::minimal(info.info.clone(), &info.trackers);
        Ok(meta_info.encode().into())
    }
}
