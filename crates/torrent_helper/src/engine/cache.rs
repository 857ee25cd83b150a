//! An engine backed by public .torrent caches.
//!
//! Cache services serve .torrent files by info-hash over plain HTTP. Each
//! mirror is a URL template containing `{info_hash}` (lowercase hex) or
//! `{INFO_HASH}` (uppercase hex). Mirrors are tried in order, once each, and
//! a file is only accepted when the hash of its `info` matches the magnet.
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, OnceLock,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{select, spawn, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{EngineError, EngineSession, TorrentEngine, TorrentInfo};
use crate::{info_hash::InfoHash, magnet::MagnetUri, metainfo::MetaInfo};

pub const DEFAULT_MIRRORS: &[&str] = &["https://itorrents.org/torrent/{INFO_HASH}.torrent"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CacheEngine {
    client: reqwest::Client,
    mirrors: Arc<[String]>,
}

impl CacheEngine {
    pub fn new(mirrors: Vec<String>) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("torrent-helper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, mirrors))
    }

    pub fn with_client(client: reqwest::Client, mirrors: Vec<String>) -> Self {
        Self { client, mirrors: mirrors.into() }
    }

    /// Replace the placeholders of a mirror template.
    pub fn mirror_url(template: &str, info_hash: &InfoHash) -> String {
        let hex = info_hash.to_hex();
        template
            .replace("{info_hash}", &hex)
            .replace("{INFO_HASH}", &hex.to_uppercase())
    }
}

#[async_trait]
impl TorrentEngine for CacheEngine {
    async fn session(&self) -> Result<Box<dyn EngineSession>, EngineError> {
        Ok(Box::new(CacheSession {
            client: self.client.clone(),
            mirrors: self.mirrors.clone(),
            cancel: CancellationToken::new(),
            found: Arc::new(OnceLock::new()),
            valid: Arc::new(AtomicBool::new(false)),
            task: None,
        }))
    }
}

pub struct CacheSession {
    client: reqwest::Client,
    mirrors: Arc<[String]>,
    cancel: CancellationToken,
    found: Arc<OnceLock<TorrentInfo>>,
    /// Set on `add_magnet`, cleared when every mirror failed.
    valid: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl CacheSession {
    async fn lookup(
        client: &reqwest::Client,
        mirrors: &[String],
        magnet: &MagnetUri,
        info_hash: InfoHash,
    ) -> Option<TorrentInfo> {
        for template in mirrors {
            let url = CacheEngine::mirror_url(template, &info_hash);

            match Self::download(client, &url, info_hash).await {
                Ok(meta_info) => {
                    let mut info = TorrentInfo::from_meta_info(&meta_info).ok()?;
                    if info.name.is_empty() {
                        info.name = magnet.display_name.clone().unwrap_or_default();
                    }
                    for tr in &magnet.trackers {
                        if !info.trackers.contains(tr) {
                            info.trackers.push(tr.clone());
                        }
                    }
                    info!(%url, "found metadata of {info_hash}");
                    return Some(info);
                }
                Err(e) => debug!(%url, "mirror has no usable metadata: {e}"),
            }
        }

        None
    }

    async fn download(
        client: &reqwest::Client,
        url: &str,
        expected: InfoHash,
    ) -> Result<MetaInfo, EngineError> {
        let res = client.get(url).send().await?;

        if !res.status().is_success() {
            return Err(EngineError::Status {
                url: url.to_owned(),
                status: res.status().as_u16(),
            });
        }

        let body = res.bytes().await?;
        let meta_info = MetaInfo::decode(&body)?;
        let got = meta_info.info_hash()?;

        if got != expected {
            return Err(EngineError::InfoHashMismatch { expected, got });
        }

        Ok(meta_info)
    }
}

#[async_trait]
impl EngineSession for CacheSession {
    async fn add_magnet(&mut self, magnet: &MagnetUri) -> Result<(), EngineError> {
        let info_hash = magnet.info_hash()?;

        let client = self.client.clone();
        let mirrors = self.mirrors.clone();
        let cancel = self.cancel.clone();
        let found = self.found.clone();
        let valid = self.valid.clone();
        let magnet = magnet.clone();

        self.valid.store(true, Ordering::Release);

        self.task = Some(spawn(async move {
            select! {
                _ = cancel.cancelled() => {
                    debug!("lookup of {info_hash} cancelled");
                }
                info = Self::lookup(&client, &mirrors, &magnet, info_hash) => {
                    match info {
                        Some(info) => {
                            let _ = found.set(info);
                        }
                        None => valid.store(false, Ordering::Release),
                    }
                }
            }
        }));

        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    fn has_metadata(&self) -> bool {
        self.found.get().is_some()
    }

    async fn pause(&mut self) {
        self.cancel.cancel();
    }

    async fn torrent_info(&mut self) -> Result<Option<TorrentInfo>, EngineError> {
        Ok(self.found.get().cloned())
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_placeholders() {
        let hash = InfoHash([0xab; 20]);

        assert_eq!(
            CacheEngine::mirror_url(DEFAULT_MIRRORS[0], &hash),
            format!("https://itorrents.org/torrent/{}.torrent", "AB".repeat(20))
        );
        assert_eq!(
            CacheEngine::mirror_url("http://x/{info_hash}?h={INFO_HASH}", &hash),
            format!("http://x/{}?h={}", "ab".repeat(20), "AB".repeat(20))
        );
    }

    #[tokio::test]
    async fn invalid_topic_is_rejected() {
        let engine = CacheEngine::new(vec![]).unwrap();
        let mut session = engine.session().await.unwrap();
        let magnet = MagnetUri::parse("magnet:?xt=urn:btih:abc").unwrap();

        assert!(matches!(
            session.add_magnet(&magnet).await,
            Err(EngineError::Magnet(_))
        ));
        assert!(!session.is_valid());
        assert!(!session.has_metadata());
    }

    #[tokio::test]
    async fn no_mirrors_invalidates_the_session() {
        let engine = CacheEngine::new(vec![]).unwrap();
        let mut session = engine.session().await.unwrap();
        let magnet = MagnetUri::new(&InfoHash([1; 20]));

        session.add_magnet(&magnet).await.unwrap();

        for _ in 0..100 {
            if !session.is_valid() {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(!session.is_valid());
        assert!(!session.has_metadata());
        assert_eq!(session.torrent_info().await.unwrap(), None);
    }
}
