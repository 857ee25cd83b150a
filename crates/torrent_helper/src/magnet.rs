//! Build and parse magnet links.
use std::{
    borrow::Cow,
    fmt::{self, Display},
    str::FromStr,
};

use magnet_url::Magnet;

use crate::{error::ValidationError, info_hash::InfoHash, metainfo::MetaInfo};

const BTIH: &str = "urn:btih:";

/// A parsed magnet link. Only the parameters this crate uses are kept.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MagnetUri {
    /// The `xt` topic without the `urn:btih:` prefix, as written in the
    /// link. See [`MagnetUri::info_hash`] to get the bytes.
    pub exact_topic: String,
    /// `dn`, already URL decoded.
    pub display_name: Option<String>,
    /// `xl`, total size in bytes.
    pub length: Option<u64>,
    /// Every `tr`, in order, URL decoded.
    pub trackers: Vec<String>,
}

/// The magnet link of a torrent: `xt`, then `dn`, `xl` and `tr` when the
/// metainfo has `info.name`, `info.length` and `announce`.
pub fn build(info_hash: &InfoHash, meta_info: &MetaInfo) -> String {
    MagnetUri::with_meta_info(info_hash, meta_info).to_string()
}

impl MagnetUri {
    pub fn new(info_hash: &InfoHash) -> Self {
        Self { exact_topic: info_hash.to_hex(), ..Default::default() }
    }

    pub fn with_meta_info(info_hash: &InfoHash, meta_info: &MetaInfo) -> Self {
        Self {
            exact_topic: info_hash.to_hex(),
            display_name: meta_info.name().map(Cow::into_owned),
            // a negative length is not a length
            length: meta_info.length().and_then(|l| u64::try_from(l).ok()),
            trackers: meta_info
                .announce()
                .map(|a| vec![a.into_owned()])
                .unwrap_or_default(),
        }
    }

    /// Compute the info-hash and build the magnet of a torrent.
    pub fn from_meta_info(meta_info: &MetaInfo) -> Result<Self, ValidationError> {
        let info_hash = InfoHash::compute(meta_info)?;
        Ok(Self::with_meta_info(&info_hash, meta_info))
    }

    /// Parse a magnet link with [`magnet_url`]. The scheme is matched
    /// without case and `dn` and `tr` come out URL decoded.
    ///
    /// # Errors
    ///
    /// If the scheme is not `magnet`, there is no `urn:btih:` topic, or `xl`
    /// is not a number. The topic itself is not validated here, see
    /// [`MagnetUri::info_hash`].
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let text = text.trim();

        let scheme = text.split_once(':').map(|(s, _)| s).unwrap_or_default();
        if !scheme.eq_ignore_ascii_case("magnet") {
            return Err(ValidationError::WrongScheme(scheme.to_owned()));
        }

        let query = &text[scheme.len() + 1..];
        let text = format!("magnet:?{}", query.strip_prefix('?').unwrap_or(query));
        check_length(&text)?;

        let magnet = Magnet::new(&text)
            .map_err(|_| ValidationError::WrongScheme(scheme.to_owned()))?;

        // hybrid links carry a `urn:btmh:` topic too, only v1 is used
        let exact_topic = match (magnet.hash_type.as_deref(), magnet.xt.as_deref()) {
            (Some("btih"), Some(xt)) => whole_topic(&text, xt),
            (Some(kind), Some(xt)) => {
                return Err(ValidationError::UnsupportedExactTopic(format!(
                    "urn:{kind}:{xt}"
                )));
            }
            _ => return Err(ValidationError::MissingExactTopic),
        };

        Ok(Self {
            exact_topic,
            display_name: magnet.dn.as_deref().map(url_decode),
            length: magnet.xl,
            trackers: magnet
                .tr
                .iter()
                .filter(|tr| !tr.is_empty())
                .map(|tr| url_decode(tr))
                .collect(),
        })
    }

    /// Convert the `xt` topic to bytes, it may be hex or base32.
    pub fn info_hash(&self) -> Result<InfoHash, ValidationError> {
        self.exact_topic.parse()
    }

    /// `dn`, or the topic when the link has no name.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.exact_topic)
    }
}

impl Display for MagnetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "magnet:?xt={BTIH}{}", encode(&self.exact_topic))?;

        if let Some(dn) = &self.display_name {
            write!(f, "&dn={}", encode(dn))?;
        }
        if let Some(xl) = self.length {
            write!(f, "&xl={xl}")?;
        }
        for tr in &self.trackers {
            write!(f, "&tr={}", encode(tr))?;
        }

        Ok(())
    }
}

impl FromStr for MagnetUri {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// `magnet_url` stops a base32 topic at its first char that is not hex, the
/// rest of it is read from the link.
fn whole_topic(text: &str, xt: &str) -> String {
    let Some(at) = text.find(&format!("xt={BTIH}{xt}")) else {
        return xt.to_owned();
    };

    let rest = &text[at + "xt=".len() + BTIH.len()..];
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    rest[..end].to_owned()
}

/// `magnet_url` panics on an `xl` value that does not fit a `u64`, those
/// links are refused before they reach it.
fn check_length(text: &str) -> Result<(), ValidationError> {
    for (at, _) in text.match_indices("xl=") {
        let rest = &text[at + "xl=".len()..];
        let end = rest.find(|c: char| !c.is_numeric()).unwrap_or(rest.len());
        let (digits, tail) = rest.split_at(end);

        let closed = tail.chars().next().map_or(true, |c| c == '&' || c.is_whitespace());
        if closed && digits.parse::<u64>().is_err() {
            return Err(ValidationError::LengthInvalid(digits.to_owned()));
        }
    }

    Ok(())
}

/// `magnet_url` does not read a literal `~`.
fn encode(value: &str) -> String {
    urlencoding::encode(value).replace('~', "%7E")
}

/// Percent-decode a query value, `+` is a space. Invalid UTF-8 is replaced
/// instead of rejected.
fn url_decode(value: &str) -> String {
    let value = value.replace('+', " ");
    match urlencoding::decode(&value) {
        Ok(v) => v.into_owned(),
        Err(_) => {
            String::from_utf8_lossy(&urlencoding::decode_binary(value.as_bytes()))
                .into_owned()
        }
    }
}
