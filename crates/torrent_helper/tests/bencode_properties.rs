use bytes::Bytes;
use proptest::{collection, prelude::*};
use torrent_helper::{
    bencode::{decode, encode, Dict, Value},
    info_hash::InfoHash,
    metainfo::MetaInfo,
};

fn arb_key() -> impl Strategy<Value = Bytes> {
    collection::vec(any::<u8>(), 0..8).prop_map(Bytes::from)
}

fn arb_dict(inner: impl Strategy<Value = Value>) -> impl Strategy<Value = Dict> {
    collection::btree_map(arb_key(), inner, 0..8)
}

/// Nested lists and dictionaries over integers and raw byte strings.
fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Value::Integer),
        collection::vec(any::<u8>(), 0..16).prop_map(|b| Value::Bytes(b.into())),
    ];

    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            collection::vec(inner.clone(), 0..8).prop_map(Value::List),
            arb_dict(inner).prop_map(Value::Dict),
        ]
    })
}

/// Encode with dictionary keys in an order picked by `seed` instead of the
/// sorted one, like a .torrent written by a sloppy client.
fn encode_shuffled(value: &Value, seed: usize, buf: &mut Vec<u8>) {
    match value {
        Value::Dict(dict) => {
            let mut entries: Vec<_> = dict.iter().collect();
            if !entries.is_empty() {
                let len = entries.len();
                entries.rotate_left(seed % len);
            }
            if seed % 2 == 1 {
                entries.reverse();
            }

            buf.push(b'd');
            for (key, value) in entries {
                buf.extend_from_slice(format!("{}:", key.len()).as_bytes());
                buf.extend_from_slice(key);
                encode_shuffled(value, seed / 2 + 1, buf);
            }
            buf.push(b'e');
        }
        Value::List(list) => {
            buf.push(b'l');
            for item in list {
                encode_shuffled(item, seed, buf);
            }
            buf.push(b'e');
        }
        scalar => buf.extend_from_slice(&encode(scalar)),
    }
}

fn byte_string(buf: &[u8], at: usize) -> Result<(&[u8], usize), String> {
    let colon = buf[at..]
        .iter()
        .position(|b| *b == b':')
        .map(|i| at + i)
        .ok_or_else(|| format!("no length prefix at {at}"))?;

    let len: usize = std::str::from_utf8(&buf[at..colon])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| format!("bad length at {at}"))?;

    let start = colon + 1;
    buf.get(start..start + len)
        .map(|s| (s, start + len))
        .ok_or_else(|| format!("short byte string at {at}"))
}

/// Walk the encoded value at `at` and fail on a dictionary whose keys are
/// not strictly ascending. Returns the offset right after the value.
fn keys_ascend(buf: &[u8], at: usize) -> Result<usize, String> {
    match buf.get(at) {
        Some(b'i') => buf[at..]
            .iter()
            .position(|b| *b == b'e')
            .map(|i| at + i + 1)
            .ok_or_else(|| format!("open integer at {at}")),
        Some(b'0'..=b'9') => byte_string(buf, at).map(|(_, next)| next),
        Some(b'l') => {
            let mut at = at + 1;
            while buf.get(at) != Some(&b'e') {
                at = keys_ascend(buf, at)?;
            }
            Ok(at + 1)
        }
        Some(b'd') => {
            let mut at = at + 1;
            let mut last: Option<&[u8]> = None;
            while buf.get(at) != Some(&b'e') {
                let (key, next) = byte_string(buf, at)?;
                if last.is_some_and(|last| last >= key) {
                    return Err(format!("key at {at} is out of order"));
                }
                last = Some(key);
                at = keys_ascend(buf, next)?;
            }
            Ok(at + 1)
        }
        _ => Err(format!("no value at {at}")),
    }
}

proptest! {
    #[test]
    fn decode_inverts_encode(value in arb_value()) {
        let buf = encode(&value);
        prop_assert_eq!(decode(&buf), Ok(value));
        prop_assert_eq!(keys_ascend(&buf, 0), Ok(buf.len()));
    }

    #[test]
    fn reencoding_sorts_keys(value in arb_value(), seed in any::<usize>()) {
        let mut shuffled = Vec::new();
        encode_shuffled(&value, seed, &mut shuffled);

        let decoded = decode(&shuffled).unwrap();
        prop_assert_eq!(&decoded, &value);

        let canonical = encode(&decoded);
        prop_assert_eq!(keys_ascend(&canonical, 0), Ok(canonical.len()));
        prop_assert_eq!(canonical, encode(&value));
    }

    #[test]
    fn info_hash_ignores_key_order(
        info in arb_dict(arb_value()),
        extra in arb_dict(arb_value()),
        seed in any::<usize>(),
    ) {
        let mut dict = extra;
        dict.insert(Bytes::from_static(b"info"), Value::Dict(info.clone()));
        let meta = MetaInfo::new(dict.clone());

        let expected = InfoHash::digest(&encode(&Value::Dict(info)));
        prop_assert_eq!(meta.info_hash(), Ok(expected));

        let mut shuffled = Vec::new();
        encode_shuffled(&Value::Dict(dict), seed, &mut shuffled);

        let again = MetaInfo::decode(&shuffled).unwrap();
        prop_assert_eq!(again.info_hash(), Ok(expected));
        prop_assert_eq!(MetaInfo::decode(&again.encode()).unwrap(), meta);
    }
}
