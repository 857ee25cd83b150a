//! The 20 byte SHA-1 identifying a torrent.
use std::{
    fmt::{self, Display},
    str::FromStr,
};

use data_encoding::BASE32_NOPAD;

use crate::{bencode, error::ValidationError, metainfo::MetaInfo};

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash(pub [u8; 20]);

impl InfoHash {
    /// SHA-1 of the canonical encoding of the `info` dictionary. Only the
    /// `info` value is re-encoded, the rest of the metainfo does not matter.
    ///
    /// # Errors
    ///
    /// If `info` is missing or is not a dictionary.
    pub fn compute(meta_info: &MetaInfo) -> Result<Self, ValidationError> {
        let info = meta_info.info()?;
        Ok(Self::digest(&bencode::encode(info)))
    }

    /// SHA-1 of an already encoded buffer.
    pub fn digest(buf: &[u8]) -> Self {
        let mut hasher = sha1_smol::Sha1::new();
        hasher.update(buf);
        Self(hasher.digest().bytes())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.to_hex();
        f.write_str(&s[..10])
    }
}

/// Both forms a `urn:btih:` topic may take: 40 hex chars or 32 base32 chars.
impl FromStr for InfoHash {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InfoHashInvalid(s.to_owned());

        match s.len() {
            40 => {
                let mut buf = [0u8; 20];
                hex::decode_to_slice(s, &mut buf).map_err(|_| invalid())?;
                Ok(Self(buf))
            }
            32 => {
                let buf = BASE32_NOPAD
                    .decode(s.to_ascii_uppercase().as_bytes())
                    .map_err(|_| invalid())?;
                buf.try_into().map(Self).map_err(|_| invalid())
            }
            _ => Err(invalid()),
        }
    }
}
