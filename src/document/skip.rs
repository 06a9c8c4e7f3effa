use crate::error::{DocError, Result};
use crate::memfile::{MemFile, Offset};
use crate::types::*;

/// Deepest container nesting the skipper follows.
pub const MAX_NESTING_DEPTH: usize = 512;

/// Returns the offset just past the field whose marker sits at `at`.
pub fn skip_field(file: &MemFile, at: Offset) -> Result<Offset> {
    skip_nested(file, at, 0)
}

/// Encoded length of the field at `at`, marker included.
pub fn field_len(file: &MemFile, at: Offset) -> Result<usize> {
    Ok(at.distance_to(skip_field(file, at)?))
}

fn skip_nested(file: &MemFile, at: Offset, depth: usize) -> Result<Offset> {
    let marker = file.peek_u8(at)?;
    let payload = at + 1;
    match type_of(marker)? {
        FieldType::Null | FieldType::True | FieldType::False => Ok(payload),
        FieldType::String => skip_bytes(file, payload),
        FieldType::Binary => {
            let (_, n) = file.read_varint(payload)?;
            skip_bytes(file, payload + n)
        }
        FieldType::BinaryCustom => {
            let type_name_end = skip_bytes(file, payload)?;
            skip_bytes(file, type_name_end)
        }
        container @ (FieldType::Array | FieldType::Object) => {
            if depth >= MAX_NESTING_DEPTH {
                return Err(DocError::DepthLimit { max: MAX_NESTING_DEPTH });
            }
            let keyed = container == FieldType::Object;
            let (len, n) = file.read_varint(payload)?;
            let mut pos = payload + n;
            for _ in 0..len {
                pos = skip_element(file, pos, keyed, depth + 1)?;
            }
            Ok(pos)
        }
        FieldType::Column(column_type) => {
            let (len, n) = file.read_varint(payload)?;
            let (capacity, m) = file.read_varint(payload + n)?;
            if capacity < len {
                return Err(DocError::InternalError(format!(
                    "column at {} holds {len} elements in {capacity} slots",
                    at.get()
                )));
            }
            let bytes = capacity.saturating_mul(column_type.width() as u64);
            file.check_span(payload + n + m, bytes)
        }
        numeric => file.check_span(payload, numeric.fixed_width().unwrap_or(0) as u64),
    }
}

/// Skips one container element: the key for object elements, then the value.
/// Arrays, objects and the iterators all advance through this routine.
pub(crate) fn skip_element(file: &MemFile, at: Offset, keyed: bool, depth: usize) -> Result<Offset> {
    let value_at = if keyed { skip_key(file, at)? } else { at };
    skip_nested(file, value_at, depth)
}

/// Skips an object key (varint length + bytes) and returns the value offset.
pub(crate) fn skip_key(file: &MemFile, at: Offset) -> Result<Offset> {
    skip_bytes(file, at)
}

fn skip_bytes(file: &MemFile, at: Offset) -> Result<Offset> {
    let (len, n) = file.read_varint(at)?;
    file.check_span(at + n, len)
}

/// Skips a numeric field that must be exactly `width` bytes wide.
pub fn skip_numeric(file: &MemFile, at: Offset, width: usize) -> Result<Offset> {
    let marker = file.peek_u8(at)?;
    let field_type = type_of(marker)?;
    match field_type.fixed_width() {
        Some(w) if field_type.is_number() && w == width => file.check_span(at + 1, w as u64),
        _ => Err(DocError::TypeMismatch {
            expected: match width {
                1 => "8-bit number",
                2 => "16-bit number",
                4 => "32-bit number",
                8 => "64-bit number",
                _ => "number",
            },
            actual: marker,
        }),
    }
}
