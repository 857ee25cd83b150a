//! Convert between .torrent files and magnet links.
//!
//! This is the library behind two chat bots: one answers a .torrent file
//! with its magnet link, the other answers a magnet link with a .torrent
//! file. The building blocks can be used on their own:
//!
//! * [bencode], a canonical codec for torrent metainfo
//! * [info_hash], the SHA-1 that identifies a torrent
//! * [magnet], to build and parse magnet links
//! * [fetch], to resolve the metadata of a magnet link within a deadline
//!
//! # Example
//!
//! ```
//! use torrent_helper::bot::torrent_to_magnet;
//!
//! let magnet = torrent_to_magnet(b"d4:infod6:lengthi100e4:name4:testee").unwrap();
//! assert!(magnet.starts_with("magnet:?xt=urn:btih:"));
//! assert!(magnet.ends_with("&dn=test&xl=100"));
//! ```
//!
//! Resolving metadata needs an engine, the bundled one reads public .torrent
//! caches:
//!
//! ```no_run
//! use std::sync::Arc;
//! use torrent_helper::{
//!     engine::{CacheEngine, DEFAULT_MIRRORS},
//!     fetch::{FetchLimits, FetchPool, FETCH_WORKERS},
//!     magnet::MagnetUri,
//! };
//!
//! # async fn run() -> Result<(), torrent_helper::error::Error> {
//! let mirrors = DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect();
//! let engine = Arc::new(CacheEngine::new(mirrors)?);
//! let pool = FetchPool::new(engine, FETCH_WORKERS, FetchLimits::default());
//!
//! let magnet = MagnetUri::parse("magnet:?xt=urn:btih:...")?;
//! if let Some(file) = pool.fetch(magnet).await.into_file() {
//!     println!("{} is {} bytes", file.file_name, file.bytes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bencode;
pub mod bot;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod info_hash;
pub mod magnet;
pub mod metainfo;
pub mod transport;
