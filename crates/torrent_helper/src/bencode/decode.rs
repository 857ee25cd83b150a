use bytes::Bytes;
use thiserror::Error;

use super::value::{Dict, Value};

/// Lists and dictionaries nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 64;

/// Offsets are byte positions in the input buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    #[error("Unexpected byte `{byte:#04x}` at byte {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    #[error("Invalid integer at byte {0}")]
    InvalidInteger(usize),

    #[error("Invalid byte string length prefix at byte {0}")]
    InvalidLength(usize),

    #[error("Dictionary key at byte {0} is not a byte string")]
    NonStringKey(usize),

    #[error("Trailing data after the value at byte {0}")]
    TrailingData(usize),

    #[error("Nesting deeper than 64 levels at byte {0}")]
    NestingTooDeep(usize),

    #[error("The root value is not a dictionary")]
    RootNotDictionary,
}

/// Decode exactly one value spanning the whole buffer.
pub fn decode(buf: &[u8]) -> Result<Value, DecodeError> {
    let mut decoder = Decoder { buf, pos: 0 };
    let value = decoder.value(0)?;

    if decoder.pos != buf.len() {
        return Err(DecodeError::TrailingData(decoder.pos));
    }

    Ok(value)
}

struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    fn peek(&self) -> Result<u8, DecodeError> {
        self.buf
            .get(self.pos)
            .copied()
            .ok_or(DecodeError::UnexpectedEof(self.pos))
    }

    fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        if depth > MAX_DEPTH {
            return Err(DecodeError::NestingTooDeep(self.pos));
        }

        match self.peek()? {
            b'i' => self.integer().map(Value::Integer),
            b'0'..=b'9' => self.bytes().map(Value::Bytes),
            b'l' => self.list(depth),
            b'd' => self.dict(depth),
            byte => Err(DecodeError::UnexpectedByte { byte, offset: self.pos }),
        }
    }

    /// Read up to (not including) `delim`, returning the slice and leaving
    /// `pos` after the delimiter.
    fn until(&mut self, delim: u8) -> Result<&'a [u8], DecodeError> {
        let start = self.pos;
        let len = self.buf[start..]
            .iter()
            .position(|b| *b == delim)
            .ok_or(DecodeError::UnexpectedEof(self.buf.len()))?;

        self.pos = start + len + 1;
        Ok(&self.buf[start..start + len])
    }

    fn integer(&mut self) -> Result<i64, DecodeError> {
        let start = self.pos;
        self.pos += 1;

        let digits = self.until(b'e')?;
        let unsigned = digits.strip_prefix(b"-").unwrap_or(digits);

        // canonical form only: no empty body, no `-0`, no leading zeros
        let canonical = !unsigned.is_empty()
            && unsigned.iter().all(u8::is_ascii_digit)
            && (unsigned == b"0" || unsigned[0] != b'0')
            && digits != b"-0";

        if !canonical {
            return Err(DecodeError::InvalidInteger(start));
        }

        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(DecodeError::InvalidInteger(start))
    }

    fn bytes(&mut self) -> Result<Bytes, DecodeError> {
        let start = self.pos;
        let prefix = self.until(b':')?;

        if !prefix.iter().all(u8::is_ascii_digit)
            || (prefix.len() > 1 && prefix[0] == b'0')
        {
            return Err(DecodeError::InvalidLength(start));
        }

        let len: usize = std::str::from_utf8(prefix)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(DecodeError::InvalidLength(start))?;

        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(DecodeError::UnexpectedEof(self.buf.len()))?;

        let bytes = Bytes::copy_from_slice(&self.buf[self.pos..end]);
        self.pos = end;

        Ok(bytes)
    }

    fn list(&mut self, depth: usize) -> Result<Value, DecodeError> {
        self.pos += 1;
        let mut list = Vec::new();

        while self.peek()? != b'e' {
            list.push(self.value(depth + 1)?);
        }

        self.pos += 1;
        Ok(Value::List(list))
    }

    fn dict(&mut self, depth: usize) -> Result<Value, DecodeError> {
        self.pos += 1;
        let mut dict = Dict::new();

        while self.peek()? != b'e' {
            if !self.peek()?.is_ascii_digit() {
                return Err(DecodeError::NonStringKey(self.pos));
            }

            let key = self.bytes()?;
            let value = self.value(depth + 1)?;

            // a repeated key keeps its last value
            dict.insert(key, value);
        }

        self.pos += 1;
        Ok(Value::Dict(dict))
    }
}
