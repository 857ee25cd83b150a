//! Telegram Bot API over HTTPS.
//!
//! Updates are long-polled with `getUpdates`, the offset is advanced past
//! every update that was returned so nothing is delivered twice.
use std::{
    fmt,
    sync::atomic::{AtomicI64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{ChatId, ChatTransport, FileRef, Inbound, TransportError, Update};

pub const DEFAULT_API: &str = "https://api.telegram.org";

/// How long the server may hold a `getUpdates` request.
pub const LONG_POLL: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time given to a request on top of its long poll.
const REQUEST_SLACK: Duration = Duration::from_secs(30);

pub struct TelegramTransport {
    client: Client,
    api: String,
    token: String,
    long_poll: Duration,
    offset: AtomicI64,
}

impl fmt::Debug for TelegramTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramTransport")
            .field("api", &self.api)
            .field("long_poll", &self.long_poll)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Response<T> {
    ok: bool,
    result: Option<T>,
    error_code: Option<i64>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawUpdate {
    update_id: i64,
    message: Option<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    chat: RawId,
    from: Option<RawId>,
    text: Option<String>,
    document: Option<RawDocument>,
}

#[derive(Deserialize)]
struct RawId {
    id: i64,
}

#[derive(Deserialize)]
struct RawDocument {
    file_id: String,
    file_name: Option<String>,
    file_size: Option<u64>,
}

#[derive(Deserialize)]
struct RawFile {
    file_path: Option<String>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: ChatId,
    text: &'a str,
}

impl RawUpdate {
    /// Messages that are neither text nor a document are dropped.
    fn into_update(self) -> Option<Update> {
        let message = self.message?;

        let inbound = match (message.document, message.text) {
            (Some(doc), _) => Inbound::Document(FileRef {
                id: doc.file_id,
                name: doc.file_name,
                size: doc.file_size,
            }),
            (None, Some(text)) => Inbound::from_text(&text),
            (None, None) => return None,
        };

        Some(Update {
            chat: message.chat.id,
            sender: message.from.map(|u| u.id),
            inbound,
        })
    }
}

impl TelegramTransport {
    pub fn new(
        api: impl Into<String>,
        token: impl Into<String>,
        long_poll: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        Ok(Self::with_client(client, api, token, long_poll))
    }

    pub fn with_client(
        client: Client,
        api: impl Into<String>,
        token: impl Into<String>,
        long_poll: Duration,
    ) -> Self {
        let api: String = api.into();
        Self {
            client,
            api: api.trim_end_matches('/').to_owned(),
            token: token.into(),
            long_poll,
            offset: AtomicI64::new(0),
        }
    }

    fn long_poll_secs(&self) -> i64 {
        i64::try_from(self.long_poll.as_secs()).unwrap_or(i64::MAX)
    }

    /// The long poll plus time for the response to arrive.
    fn request_timeout(&self) -> Duration {
        self.long_poll.saturating_add(REQUEST_SLACK)
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api, self.token)
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}/file/bot{}/{path}", self.api, self.token)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<T, TransportError> {
        let res = req.send().await?;
        let status = res.status();

        let body: Response<T> = match res.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(TransportError::Status(status.as_u16()))
            }
            Err(e) => return Err(e.into()),
        };

        match body {
            Response { ok: true, result: Some(result), .. } => Ok(result),
            Response { error_code, description, .. } => Err(TransportError::Api {
                code: error_code.unwrap_or_else(|| i64::from(status.as_u16())),
                description: description.unwrap_or_default(),
            }),
        }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn updates(&self) -> Result<Vec<Update>, TransportError> {
        let offset = self.offset.load(Ordering::Acquire);

        let req = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", self.long_poll_secs())])
            .timeout(self.request_timeout());

        let raw: Vec<RawUpdate> = self.call(req).await?;

        if let Some(last) = raw.iter().map(|u| u.update_id).max() {
            self.offset.fetch_max(last + 1, Ordering::AcqRel);
        }

        let updates: Vec<Update> =
            raw.into_iter().filter_map(RawUpdate::into_update).collect();
        if !updates.is_empty() {
            debug!("received {} updates", updates.len());
        }

        Ok(updates)
    }

    async fn download(&self, file: &FileRef) -> Result<Bytes, TransportError> {
        let req = self
            .client
            .get(self.method_url("getFile"))
            .query(&[("file_id", &file.id)]);

        let raw: RawFile = self.call(req).await?;
        let path = raw.file_path.ok_or(TransportError::MissingFilePath)?;

        let res = self.client.get(self.file_url(&path)).send().await?;
        if !res.status().is_success() {
            return Err(TransportError::Status(res.status().as_u16()));
        }

        Ok(res.bytes().await?)
    }

    async fn send_text(&self, chat: ChatId, text: &str) -> Result<(), TransportError> {
        let req = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage { chat_id: chat, text });

        let _: serde_json::Value = self.call(req).await?;
        Ok(())
    }

    async fn send_document(
        &self,
        chat: ChatId,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<(), TransportError> {
        let part = Part::bytes(bytes.to_vec())
            .file_name(file_name.to_owned())
            .mime_str("application/x-bittorrent")?;

        let form = Form::new()
            .text("chat_id", chat.to_string())
            .text("caption", file_name.to_owned())
            .part("document", part);

        let req = self.client.post(self.method_url("sendDocument")).multipart(form);

        let _: serde_json::Value = self.call(req).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<Option<Update>> {
        let res: Response<Vec<RawUpdate>> = serde_json::from_str(json).unwrap();
        assert!(res.ok);
        res.result.unwrap().into_iter().map(RawUpdate::into_update).collect()
    }

    #[test]
    fn updates_are_converted() {
        let updates = parse(
            r#"{"ok":true,"result":[
                {"update_id":1,"message":{"message_id":5,"chat":{"id":42,"type":"private"},
                 "from":{"id":7,"is_bot":false},"text":"/start"}},
                {"update_id":2,"message":{"chat":{"id":42},"text":"magnet:?xt=urn:btih:abc"}},
                {"update_id":3,"message":{"chat":{"id":-9},"from":{"id":7},
                 "document":{"file_id":"F1","file_name":"a.torrent","file_size":120},
                 "caption":"ignored"}},
                {"update_id":4,"message":{"chat":{"id":42},"sticker":{}}},
                {"update_id":5,"edited_message":{"chat":{"id":42},"text":"x"}}
            ]}"#,
        );

        assert_eq!(
            updates,
            [
                Some(Update {
                    chat: 42,
                    sender: Some(7),
                    inbound: Inbound::Command("start".into()),
                }),
                Some(Update {
                    chat: 42,
                    sender: None,
                    inbound: Inbound::Text("magnet:?xt=urn:btih:abc".into()),
                }),
                Some(Update {
                    chat: -9,
                    sender: Some(7),
                    inbound: Inbound::Document(FileRef {
                        id: "F1".into(),
                        name: Some("a.torrent".into()),
                        size: Some(120),
                    }),
                }),
                None,
                None,
            ]
        );
    }

    #[test]
    fn api_errors_are_parsed() {
        let res: Response<serde_json::Value> = serde_json::from_str(
            r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
        )
        .unwrap();

        assert!(!res.ok);
        assert_eq!(res.error_code, Some(401));
        assert_eq!(res.description.as_deref(), Some("Unauthorized"));
    }

    #[test]
    fn debug_hides_the_token() {
        let transport = TelegramTransport::new(
            "https://api.example/",
            "123:secret",
            LONG_POLL,
        )
        .unwrap();

        assert_eq!(transport.method_url("getMe"), "https://api.example/bot123:secret/getMe");
        assert!(!format!("{transport:?}").contains("secret"));
    }

    #[test]
    fn long_poll_timeouts_saturate() {
        let transport =
            TelegramTransport::new("https://api.example", "1:a", LONG_POLL).unwrap();
        assert_eq!(transport.request_timeout(), LONG_POLL + REQUEST_SLACK);
        assert_eq!(transport.long_poll_secs(), 30);

        let transport =
            TelegramTransport::new("https://api.example", "1:a", Duration::MAX).unwrap();
        assert_eq!(transport.request_timeout(), Duration::MAX);
        assert_eq!(transport.long_poll_secs(), i64::MAX);
    }
}
