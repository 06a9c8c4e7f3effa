use crate::colbin_value::{BinaryKind, ColbinArray, ColbinBinary, ColbinColumn, ColbinObject, ColbinValue};
use crate::document::{ArrayIter, ColumnIter, ObjectIter};
use crate::error::{DocError, Result};
use crate::memfile::{MemFile, Offset};
use crate::scalar::Number;
use crate::types::*;
use smol_str::SmolStr;

// ─── FieldRef ───────────────────────────────────────────────────────────────

/// A decoded field borrowing from the buffer. Containers are not decoded,
/// they carry the offset of their marker for opening an iterator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    Null,
    Bool(bool),
    Number(Number),
    Str(&'a str),
    Binary { mime_id: u64, data: &'a [u8] },
    CustomBinary { type_name: &'a str, data: &'a [u8] },
    Array(Offset),
    Object(Offset),
    Column(Offset, ColumnType),
}

/// Varint length + bytes at `at`. Returns the bytes and the offset after them.
pub(crate) fn read_bytes(file: &MemFile, at: Offset) -> Result<(&[u8], Offset)> {
    let (len, n) = file.read_varint(at)?;
    let start = at + n;
    let end = file.check_span(start, len)?;
    Ok((file.read_at(start, start.distance_to(end))?, end))
}

pub(crate) fn read_str(file: &MemFile, at: Offset) -> Result<(&str, Offset)> {
    let (bytes, end) = read_bytes(file, at)?;
    let s = std::str::from_utf8(bytes).map_err(|_| DocError::InvalidUtf8 { offset: at.get() })?;
    Ok((s, end))
}

/// Decodes the field whose marker sits at `at`.
pub fn read_field(file: &MemFile, at: Offset) -> Result<FieldRef<'_>> {
    let marker = file.peek_u8(at)?;
    let payload = at + 1;
    let field = match type_of(marker)? {
        FieldType::Null => FieldRef::Null,
        FieldType::True => FieldRef::Bool(true),
        FieldType::False => FieldRef::Bool(false),
        FieldType::String => FieldRef::Str(read_str(file, payload)?.0),
        FieldType::Binary => {
            let (mime_id, n) = file.read_varint(payload)?;
            let (data, _) = read_bytes(file, payload + n)?;
            FieldRef::Binary { mime_id, data }
        }
        FieldType::BinaryCustom => {
            let (type_name, data_at) = read_str(file, payload)?;
            let (data, _) = read_bytes(file, data_at)?;
            FieldRef::CustomBinary { type_name, data }
        }
        FieldType::Array => FieldRef::Array(at),
        FieldType::Object => FieldRef::Object(at),
        FieldType::Column(column_type) => FieldRef::Column(at, column_type),
        numeric => {
            let width = numeric.fixed_width().unwrap_or(0);
            let bytes = file.read_at(payload, width)?;
            let number = Number::decode(numeric, bytes)
                .ok_or(DocError::UnsupportedType(marker))?;
            FieldRef::Number(number)
        }
    };
    Ok(field)
}

// ─── Owned decode ───────────────────────────────────────────────────────────

/// Decodes the field at `at` and everything nested in it.
pub fn decode_field(file: &MemFile, at: Offset) -> Result<ColbinValue> {
    let value = match read_field(file, at)? {
        FieldRef::Null => ColbinValue::Null,
        FieldRef::Bool(b) => ColbinValue::Bool(b),
        FieldRef::Number(n) => ColbinValue::Number(n),
        FieldRef::Str(s) => ColbinValue::Str(SmolStr::from(s)),
        FieldRef::Binary { mime_id, data } => ColbinValue::Binary(ColbinBinary {
            kind: BinaryKind::Mime(mime_id),
            data: data.to_vec(),
        }),
        FieldRef::CustomBinary { type_name, data } => ColbinValue::Binary(ColbinBinary {
            kind: BinaryKind::Custom(SmolStr::from(type_name)),
            data: data.to_vec(),
        }),
        FieldRef::Array(at) => {
            let mut it = ArrayIter::open(file, at)?;
            let mut items = Vec::new();
            while it.next()? {
                items.push(decode_field(file, it.value_offset()?)?);
            }
            ColbinValue::Array(ColbinArray {
                class: it.class()?,
                items,
            })
        }
        FieldRef::Object(at) => {
            let mut it = ObjectIter::open(file, at)?;
            let mut entries = Vec::new();
            while it.next()? {
                let key = SmolStr::from(it.key()?);
                entries.push((key, decode_field(file, it.value_offset()?)?));
            }
            ColbinValue::Object(ColbinObject {
                class: it.class()?,
                entries,
            })
        }
        FieldRef::Column(at, column_type) => {
            let column = ColumnIter::open(file, at)?;
            let slots = (0..column.len())
                .map(|pos| column.get(pos))
                .collect::<Result<Vec<_>>>()?;
            ColbinValue::Column(ColbinColumn {
                column_type,
                class: column.class(),
                capacity: column.capacity(),
                slots,
            })
        }
    };
    Ok(value)
}

/// Decodes the record at offset 0. A unit record yields its only element,
/// any other record an array of its elements.
pub fn decode_document(file: &MemFile) -> Result<ColbinValue> {
    let mut record = ArrayIter::open(file, Offset::ZERO)?;
    if record.is_unit() && record.next()? {
        return decode_field(file, record.value_offset()?);
    }
    decode_field(file, Offset::ZERO)
}
