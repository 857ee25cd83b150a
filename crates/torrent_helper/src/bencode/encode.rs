use super::value::{Dict, Value};

/// Encode `value` in canonical form: dictionary keys sorted by raw bytes,
/// integers and lengths without leading zeros.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf);
    buf
}

pub fn encode_into(value: &Value, buf: &mut Vec<u8>) {
    match value {
        Value::Integer(i) => {
            buf.push(b'i');
            buf.extend_from_slice(i.to_string().as_bytes());
            buf.push(b'e');
        }
        Value::Bytes(b) => byte_string(b, buf),
        Value::List(list) => {
            buf.push(b'l');
            for item in list {
                encode_into(item, buf);
            }
            buf.push(b'e');
        }
        Value::Dict(dict) => encode_dict_into(dict, buf),
    }
}

pub fn encode_dict_into(dict: &Dict, buf: &mut Vec<u8>) {
    buf.push(b'd');
    for (key, value) in dict {
        byte_string(key, buf);
        encode_into(value, buf);
    }
    buf.push(b'e');
}

fn byte_string(bytes: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(bytes.len().to_string().as_bytes());
    buf.push(b':');
    buf.extend_from_slice(bytes);
}
