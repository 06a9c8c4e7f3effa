//! Self-delimiting variable-length unsigned integers.
//!
//! Used for every length and count in a document: container `num_elements`,
//! column `capacity`, string/binary lengths, object key lengths and binary
//! mime ids. The first byte alone tells how many bytes follow:
//!
//! | First byte | Bytes | Value                                       |
//! |------------|-------|---------------------------------------------|
//! | 0 - 240    | 1     | the byte itself                             |
//! | 241 - 248  | 2     | `240 + ((first - 241) << 8) + b1`           |
//! | 249        | 3     | `2288 + (b1 << 8) + b2`                     |
//! | 250        | 4     | next 3 bytes, big-endian                    |
//! | 251        | 5     | next 4 bytes, big-endian                    |
//! | 252 - 254  | -     | reserved, never written                     |
//! | 255        | 9     | next 8 bytes, big-endian                    |
//!
//! Rewriting a varint in place may change its width (e.g. a count going from
//! 241 down to 240 shrinks from two bytes to one); callers shift everything
//! behind it by the difference, see [`crate::memfile::MemFile::update_varint`].

use arrayvec::ArrayVec;

pub const MAX_VARINT_LEN: usize = 9;

pub fn varint_len(value: u64) -> usize {
    if value <= 240 {
        1
    } else if value <= 2287 {
        2
    } else if value <= 67823 {
        3
    } else if value <= 0xFF_FFFF {
        4
    } else if value <= 0xFFFF_FFFF {
        5
    } else {
        9
    }
}

/// Total encoded length announced by a first byte, `None` for reserved ones.
pub fn encoded_len(first: u8) -> Option<usize> {
    match first {
        0..=240 => Some(1),
        241..=248 => Some(2),
        249 => Some(3),
        250 => Some(4),
        251 => Some(5),
        252..=254 => None,
        255 => Some(9),
    }
}

pub fn encode_varint(value: u64) -> ArrayVec<u8, MAX_VARINT_LEN> {
    let mut out = ArrayVec::new();
    if value <= 240 {
        out.push(value as u8);
    } else if value <= 2287 {
        let v = value - 240;
        out.push(((v >> 8) + 241) as u8);
        out.push((v & 0xFF) as u8);
    } else if value <= 67823 {
        let v = value - 2288;
        out.push(249);
        out.push((v >> 8) as u8);
        out.push((v & 0xFF) as u8);
    } else if value <= 0xFF_FFFF {
        out.push(250);
        out.extend(value.to_be_bytes()[5..].iter().copied());
    } else if value <= 0xFFFF_FFFF {
        out.push(251);
        out.extend(value.to_be_bytes()[4..].iter().copied());
    } else {
        out.push(255);
        out.extend(value.to_be_bytes());
    }
    out
}

#[inline]
pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&encode_varint(value));
}

/// Decodes the varint at the start of `buf`, returning `(value, bytes_read)`.
/// `None` when `buf` is empty, truncated or starts with a reserved byte.
pub fn decode_varint(buf: &[u8]) -> Option<(u64, usize)> {
    let first = *buf.first()?;
    let len = encoded_len(first)?;
    let rest = buf.get(1..len)?;
    let value = match len {
        1 => first as u64,
        2 => 240 + (((first - 241) as u64) << 8) + rest[0] as u64,
        3 => 2288 + ((rest[0] as u64) << 8) + rest[1] as u64,
        _ => rest.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64),
    };
    Some((value, len))
}
