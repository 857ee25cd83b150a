//! Bencode, the serialization used by `.torrent` files.
//!
//! Decoding accepts dictionaries in any key order, encoding always writes
//! them sorted by raw key bytes. That makes `decode` followed by `encode` a
//! canonicalization step, which is what the info-hash is computed over.
//!
//! ```
//! use torrent_helper::bencode::{decode, encode};
//!
//! let value = decode(b"d4:spami1e3:bar3:baze").unwrap();
//! assert_eq!(encode(&value), b"d3:bar3:baz4:spami1ee");
//! ```

mod decode;
mod encode;
mod value;

pub use decode::{decode, DecodeError, MAX_DEPTH};
pub use encode::{encode, encode_dict_into, encode_into};
pub use value::{Dict, Value};
