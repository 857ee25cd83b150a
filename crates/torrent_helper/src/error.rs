use std::io;

use thiserror::Error;

use crate::{bencode::DecodeError, engine::EngineError, transport::TransportError};

/// A required field is missing or a value is not what it should be.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No `info` field in meta data")]
    MissingInfo,

    #[error("The `info` field is not a dictionary")]
    InfoNotDictionary,

    #[error("Not a magnet link, the scheme is `{0}`")]
    WrongScheme(String),

    #[error(
        "Your magnet does not have an info_hash, are you sure you copied the \
         entire magnet link?"
    )]
    MissingExactTopic,

    #[error("Only `urn:btih:` magnet links are supported, got `{0}`")]
    UnsupportedExactTopic(String),

    #[error("`{0}` is not a 40 char hex or 32 char base32 info_hash")]
    InfoHashInvalid(String),

    #[error("The `xl` field `{0}` is not a length")]
    LengthInvalid(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to decode the bencode buffer: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Torrent engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Chat transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Error while trying to load configuration: `{0}`")]
    FromConfigError(#[from] ::config::ConfigError),

    #[error("Could not set up logging: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    IO(#[from] io::Error),
}
