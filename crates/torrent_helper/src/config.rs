//! Configuration file, environment and CLI flags.
//!
//! Values are layered, each one overriding the previous:
//!
//! Defaults --> File --> Environment (`TORRENT_HELPER_*`) --> CLI Flags
//!
//! The CLI layer lives in the binary, it writes over a loaded [`Config`].
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config as Layers, Environment, File, FileFormat, Map};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::{
    engine::DEFAULT_MIRRORS,
    error::Error,
    fetch::{FetchLimits, FETCH_WORKERS, METADATA_TIMEOUT, POLL_INTERVAL},
    transport::{DEFAULT_API, LONG_POLL},
};

pub const ENV_PREFIX: &str = "TORRENT_HELPER";

pub const LOG_FILE: &str = "torrent-helper.log";

/// Upper bound of `metadata_timeout_secs` and `long_poll_secs`, one day.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct Config {
    /// Token of the bot that turns .torrent files into magnet links.
    pub torrent_bot_token: Option<String>,
    /// Token of the bot that turns magnet links into .torrent files.
    pub magnet_bot_token: Option<String>,
    pub telegram_api: String,
    pub long_poll_secs: u64,
    pub fetch_workers: usize,
    pub metadata_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// URL templates with an `{info_hash}` or `{INFO_HASH}` placeholder.
    pub cache_mirrors: Vec<String>,
    pub log_file: PathBuf,
    /// An `EnvFilter` directive, `RUST_LOG` wins over it.
    pub log_level: String,
}

/// Tokens are secrets, they are never printed.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |t: &Option<String>| t.as_ref().map(|_| "<redacted>");

        f.debug_struct("Config")
            .field("torrent_bot_token", &redact(&self.torrent_bot_token))
            .field("magnet_bot_token", &redact(&self.magnet_bot_token))
            .field("telegram_api", &self.telegram_api)
            .field("long_poll_secs", &self.long_poll_secs)
            .field("fetch_workers", &self.fetch_workers)
            .field("metadata_timeout_secs", &self.metadata_timeout_secs)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("cache_mirrors", &self.cache_mirrors)
            .field("log_file", &self.log_file)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load defaults, the file and the environment.
    ///
    /// An explicit `path` must exist. Without one, the file in the user's
    /// config dir is read when it is there.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading variables from `env` instead of the
    /// process environment when it is given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self, Error> {
        let mirrors: Vec<String> =
            DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect();

        let mut builder = Layers::builder()
            .set_default("telegram_api", DEFAULT_API)?
            .set_default("long_poll_secs", LONG_POLL.as_secs() as i64)?
            .set_default("fetch_workers", FETCH_WORKERS as i64)?
            .set_default("metadata_timeout_secs", METADATA_TIMEOUT.as_secs() as i64)?
            .set_default("poll_interval_ms", POLL_INTERVAL.as_millis() as i64)?
            .set_default("cache_mirrors", mirrors)?
            .set_default("log_file", LOG_FILE)?
            .set_default("log_level", "info")?;

        let file = match path {
            Some(path) => Some((path.to_path_buf(), true)),
            None => Self::default_path().map(|p| (p, false)),
        };

        if let Some((path, required)) = file {
            builder = builder
                .add_source(File::from(path).format(FileFormat::Toml).required(required));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cache_mirrors")
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// `~/.config/torrent-helper/config.toml` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("", "", "torrent-helper")?;
        Some(dirs.config_dir().join("config.toml"))
    }

    /// # Errors
    ///
    /// When a value is out of range, when no bot token is set, or when a
    /// mirror has no placeholder. Timeouts are capped at [`MAX_TIMEOUT_SECS`].
    pub fn validate(&self) -> Result<(), Error> {
        if self.fetch_workers == 0 {
            return Err(Error::ConfigError(
                "fetch_workers must be greater than 0".into(),
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(Error::ConfigError(
                "poll_interval_ms must be greater than 0".into(),
            ));
        }

        for (name, secs) in [
            ("metadata_timeout_secs", self.metadata_timeout_secs),
            ("long_poll_secs", self.long_poll_secs),
        ] {
            if secs > MAX_TIMEOUT_SECS {
                return Err(Error::ConfigError(format!(
                    "{name} must be at most {MAX_TIMEOUT_SECS}"
                )));
            }
        }

        if self.torrent_bot_token().is_none() && self.magnet_bot_token().is_none() {
            return Err(Error::ConfigError(
                "set torrent_bot_token, magnet_bot_token or both".into(),
            ));
        }

        if let Some(mirror) = self
            .cache_mirrors
            .iter()
            .find(|m| !m.contains("{info_hash}") && !m.contains("{INFO_HASH}"))
        {
            return Err(Error::ConfigError(format!(
                "cache mirror `{mirror}` has no {{info_hash}} placeholder"
            )));
        }

        Ok(())
    }

    pub fn torrent_bot_token(&self) -> Option<&str> {
        self.torrent_bot_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn magnet_bot_token(&self) -> Option<&str> {
        self.magnet_bot_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn long_poll(&self) -> Duration {
        Duration::from_secs(self.long_poll_secs)
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: Duration::from_secs(self.metadata_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
