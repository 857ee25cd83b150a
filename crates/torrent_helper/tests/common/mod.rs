#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    future::pending,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{sync::Notify, time::Instant};
use torrent_helper::{
    engine::{EngineError, EngineSession, TorrentEngine, TorrentInfo},
    magnet::MagnetUri,
    metainfo::MetaInfo,
    transport::{ChatId, ChatTransport, FileRef, Inbound, TransportError, Update},
};

pub const TORRENT: &[u8] = b"d8:announce26:http://tracker.example/ann\
                             4:infod6:lengthi1024e4:name8:test.txtee";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(ChatId, String),
    Document(ChatId, String, Bytes),
}

/// A transport that replays queued batches of updates and records replies.
#[derive(Default)]
pub struct FakeTransport {
    batches: Mutex<VecDeque<Result<Vec<Update>, TransportError>>>,
    files: HashMap<String, Bytes>,
    sent: Mutex<Vec<Sent>>,
    notify: Notify,
}

impl FakeTransport {
    pub fn with_file(mut self, id: &str, bytes: &[u8]) -> Self {
        self.files.insert(id.to_owned(), Bytes::copy_from_slice(bytes));
        self
    }

    pub fn push(&self, batch: Result<Vec<Update>, TransportError>) {
        self.batches.lock().unwrap().push_back(batch);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Wait until at least `n` replies were sent.
    pub async fn wait_for(&self, n: usize) -> Vec<Sent> {
        loop {
            let sent = self.sent();
            if sent.len() >= n {
                return sent;
            }
            self.notify.notified().await;
        }
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
        self.notify.notify_one();
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn updates(&self) -> Result<Vec<Update>, TransportError> {
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => pending().await,
        }
    }

    async fn download(&self, file: &FileRef) -> Result<Bytes, TransportError> {
        self.files.get(&file.id).cloned().ok_or(TransportError::MissingFilePath)
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TransportError> {
        self.record(Sent::Text(chat, text.to_owned()));
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<(), TransportError> {
        self.record(Sent::Document(chat, file_name.to_owned(), bytes));
        Ok(())
    }
}

pub fn text(chat: ChatId, text: &str) -> Update {
    Update { chat, sender: Some(chat), inbound: Inbound::from_text(text) }
}

pub fn document(chat: ChatId, id: &str) -> Update {
    sized_document(chat, id, None)
}

pub fn sized_document(chat: ChatId, id: &str, size: Option<u64>) -> Update {
    Update {
        chat,
        sender: Some(chat),
        inbound: Inbound::Document(FileRef {
            id: id.to_owned(),
            name: Some("test.torrent".to_owned()),
            size,
        }),
    }
}

/// An engine that has the metadata of [`TORRENT`] after `ready_after`, or
/// never when it is `None`.
#[derive(Clone, Default)]
pub struct FakeEngine {
    pub ready_after: Option<Duration>,
    pub sessions: Arc<Mutex<usize>>,
}

struct FakeSession {
    ready_at: Option<Instant>,
    ready_after: Option<Duration>,
}

#[async_trait]
impl TorrentEngine for FakeEngine {
    async fn session(&self) -> Result<Box<dyn EngineSession>, EngineError> {
        *self.sessions.lock().unwrap() += 1;
        Ok(Box::new(FakeSession { ready_at: None, ready_after: self.ready_after }))
    }
}

#[async_trait]
impl EngineSession for FakeSession {
    async fn add_magnet(&mut self, magnet: &MagnetUri) -> Result<(), EngineError> {
        magnet.info_hash()?;
        self.ready_at = self.ready_after.map(|d| Instant::now() + d);
        Ok(())
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn has_metadata(&self) -> bool {
        self.ready_at.is_some_and(|at| Instant::now() >= at)
    }

    async fn pause(&mut self) {}

    async fn torrent_info(&mut self) -> Result<Option<TorrentInfo>, EngineError> {
        let meta = MetaInfo::decode(TORRENT)?;
        Ok(Some(TorrentInfo::from_meta_info(&meta)?))
    }
}
