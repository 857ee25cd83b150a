//! Metainfo is a .torrent file with information about the Torrent.
//!
//! Only the fields this crate reads are given accessors, every other key is
//! kept as-is so that re-encoding does not change the info-hash.
use std::borrow::Cow;

use bytes::Bytes;

use crate::{
    bencode::{self, DecodeError, Dict, Value},
    error::ValidationError,
    info_hash::InfoHash,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetaInfo(Dict);

impl MetaInfo {
    pub fn new(dict: Dict) -> Self {
        Self(dict)
    }

    /// Decode a .torrent file. The root must be a dictionary, the presence of
    /// `info` is only checked when it is needed, see [`MetaInfo::info`].
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        match bencode::decode(buf)? {
            Value::Dict(dict) => Ok(Self(dict)),
            _ => Err(DecodeError::RootNotDictionary),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        bencode::encode_dict_into(&self.0, &mut buf);
        buf
    }

    /// Build the smallest valid .torrent around an `info` dictionary.
    ///
    /// The first tracker becomes `announce`, and when there is more than one,
    /// all of them are written to `announce-list`, one tracker per tier.
    pub fn minimal(info: Value, trackers: &[String]) -> Self {
        let mut dict = Dict::new();

        if let Some(first) = trackers.first() {
            dict.insert(Bytes::from_static(b"announce"), first.as_str().into());
        }

        if trackers.len() > 1 {
            let tiers = trackers
                .iter()
                .map(|t| Value::List(vec![t.as_str().into()]))
                .collect::<Vec<_>>();
            dict.insert(Bytes::from_static(b"announce-list"), tiers.into());
        }

        dict.insert(Bytes::from_static(b"info"), info);
        Self(dict)
    }

    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `info` dictionary.
    ///
    /// # Errors
    ///
    /// If it is missing or is not a dictionary.
    pub fn info(&self) -> Result<&Value, ValidationError> {
        match self.get(b"info") {
            Some(info @ Value::Dict(_)) => Ok(info),
            Some(_) => Err(ValidationError::InfoNotDictionary),
            None => Err(ValidationError::MissingInfo),
        }
    }

    pub fn info_hash(&self) -> Result<InfoHash, ValidationError> {
        InfoHash::compute(self)
    }

    /// `info.name`, the file name in single-file torrents, the root
    /// directory otherwise.
    pub fn name(&self) -> Option<Cow<'_, str>> {
        self.info().ok()?.get(b"name")?.as_str_lossy()
    }

    /// `info.length`, only present in single-file torrents.
    pub fn length(&self) -> Option<i64> {
        self.info().ok()?.get(b"length")?.as_integer()
    }

    pub fn announce(&self) -> Option<Cow<'_, str>> {
        self.get(b"announce")?.as_str_lossy()
    }

    /// `announce` followed by every tier of `announce-list`, without
    /// duplicates.
    pub fn trackers(&self) -> Vec<String> {
        let mut trackers: Vec<String> = Vec::new();

        let tiers = self
            .get(b"announce-list")
            .and_then(Value::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_list)
            .flatten();

        let urls = self
            .get(b"announce")
            .into_iter()
            .chain(tiers)
            .filter_map(Value::as_str_lossy);

        for url in urls {
            if !url.is_empty() && !trackers.iter().any(|t| *t == url) {
                trackers.push(url.into_owned());
            }
        }

        trackers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_fields() {
        let meta = MetaInfo::decode(b"d4:infod4:name4:test6:lengthi100eee").unwrap();

        assert_eq!(meta.name().as_deref(), Some("test"));
        assert_eq!(meta.length(), Some(100));
        assert_eq!(meta.announce(), None);
        assert!(meta.info().is_ok());
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            MetaInfo::decode(b"d4:infod4:nam"),
            Err(DecodeError::UnexpectedEof(_))
        ));
        assert_eq!(
            MetaInfo::decode(b"li1ee"),
            Err(DecodeError::RootNotDictionary)
        );
    }

    #[test]
    fn missing_info_is_a_validation_error() {
        let meta = MetaInfo::decode(b"d8:announce3:urle").unwrap();
        assert_eq!(meta.info(), Err(ValidationError::MissingInfo));
        assert_eq!(meta.name(), None);
        assert_eq!(meta.announce().as_deref(), Some("url"));
    }

    #[test]
    fn trackers_are_flattened() {
        let meta = MetaInfo::decode(
            b"d8:announce5:udp:a13:announce-listll5:udp:a5:udp:bel6:http:ceee",
        )
        .unwrap();

        assert_eq!(meta.trackers(), ["udp:a", "udp:b", "http:c"]);
    }

    #[test]
    fn minimal() {
        let info = bencode::decode(b"d4:name4:test6:lengthi100ee").unwrap();

        let meta = MetaInfo::minimal(info.clone(), &[]);
        assert_eq!(meta.encode(), b"d4:infod6:lengthi100e4:name4:testee");

        let meta = MetaInfo::minimal(info.clone(), &["udp:a".to_owned()]);
        assert_eq!(
            meta.encode(),
            b"d8:announce5:udp:a4:infod6:lengthi100e4:name4:testee"
        );

        let trackers = ["udp:a".to_owned(), "udp:b".to_owned()];
        let meta = MetaInfo::minimal(info, &trackers);
        assert_eq!(meta.trackers(), trackers);
        assert_eq!(
            meta.encode(),
            b"d8:announce5:udp:a13:announce-listll5:udp:ael5:udp:bee\
              4:infod6:lengthi100e4:name4:testee"
        );
    }

    #[test]
    fn round_trip_keeps_info_hash() {
        let inputs: [&[u8]; 3] = [
            b"d4:infod6:lengthi100e4:name4:testee",
            b"d4:infod4:name4:test6:lengthi100eee",
            b"d7:comment2:hi4:infod12:piece lengthi16384e4:name4:test\
              6:lengthi100e6:pieces0:e8:announce3:urle",
        ];

        for buf in inputs {
            let meta = MetaInfo::decode(buf).unwrap();
            let again = MetaInfo::decode(&meta.encode()).unwrap();

            assert_eq!(meta, again);
            assert_eq!(meta.info_hash(), again.info_hash());
        }

        let a = MetaInfo::decode(inputs[0]).unwrap();
        let b = MetaInfo::decode(inputs[1]).unwrap();
        assert_eq!(a.info_hash(), b.info_hash());
    }
}
