use crate::colbin_value::{BinaryKind, ColbinBinary, ColbinColumn, ColbinValue};
use crate::config::DocConfig;
use crate::error::{DocError, Result};
use crate::types::*;
use crate::varint::write_varint;

// ─── Field writers ──────────────────────────────────────────────────────────

/// Appends `value` as one encoded field.
pub fn write_field_into(buf: &mut Vec<u8>, value: &ColbinValue) -> Result<()> {
    match value {
        ColbinValue::Null => buf.push(MARKER_NULL),
        ColbinValue::Bool(true) => buf.push(MARKER_TRUE),
        ColbinValue::Bool(false) => buf.push(MARKER_FALSE),
        ColbinValue::Number(n) => n.encode(buf),
        ColbinValue::Str(s) => write_string(buf, s),
        ColbinValue::Binary(binary) => write_binary(buf, binary),
        ColbinValue::Array(array) => {
            write_container_header(buf, ContainerKind::Array, array.class, array.items.len())?;
            for item in &array.items {
                write_field_into(buf, item)?;
            }
        }
        ColbinValue::Column(column) => write_column(buf, column)?,
        ColbinValue::Object(object) => {
            write_container_header(buf, ContainerKind::Object, object.class, object.entries.len())?;
            for (key, item) in &object.entries {
                write_key(buf, key);
                write_field_into(buf, item)?;
            }
        }
    }
    Ok(())
}

pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    buf.push(MARKER_STRING);
    write_varint(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

pub fn write_binary(buf: &mut Vec<u8>, binary: &ColbinBinary) {
    match &binary.kind {
        BinaryKind::Mime(id) => {
            buf.push(MARKER_BINARY);
            write_varint(buf, *id);
        }
        BinaryKind::Custom(name) => {
            buf.push(MARKER_BINARY_CUSTOM);
            write_varint(buf, name.len() as u64);
            buf.extend_from_slice(name.as_bytes());
        }
    }
    write_varint(buf, binary.data.len() as u64);
    buf.extend_from_slice(&binary.data);
}

/// Object property key: varint length + UTF-8 bytes.
pub fn write_key(buf: &mut Vec<u8>, key: &str) {
    write_varint(buf, key.len() as u64);
    buf.extend_from_slice(key.as_bytes());
}

/// Marker + `num_elements` of an array or object.
pub fn write_container_header(
    buf: &mut Vec<u8>,
    kind: ContainerKind,
    class: AbstractClass,
    len: usize,
) -> Result<()> {
    if matches!(kind, ContainerKind::Column(_)) {
        return Err(DocError::IllegalOperation("columns carry a capacity header"));
    }
    buf.push(concrete_marker(kind, class)?);
    write_varint(buf, len as u64);
    Ok(())
}

/// Marker, `num_elements`, `capacity` and every slot. Slots past the live
/// elements are written as nulls.
pub fn write_column(buf: &mut Vec<u8>, column: &ColbinColumn) -> Result<()> {
    let len = column.slots.len() as u64;
    let capacity = column.capacity.max(len);
    buf.push(concrete_marker(
        ContainerKind::Column(column.column_type),
        column.class,
    )?);
    write_varint(buf, len);
    write_varint(buf, capacity);
    buf.reserve(capacity as usize * column.column_type.width());
    for slot in &column.slots {
        column.column_type.push_slot(*slot, buf)?;
    }
    for _ in len..capacity {
        let start = buf.len();
        buf.resize(start + column.column_type.width(), 0);
        column.column_type.write_null(&mut buf[start..]);
    }
    Ok(())
}

// ─── Documents ──────────────────────────────────────────────────────────────

pub fn encode_field(value: &ColbinValue) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_field_into(&mut buf, value)?;
    Ok(buf)
}

/// Encodes a document: the record array at offset 0.
///
/// A top-level array with zero or several items becomes the record itself;
/// anything else (objects, scalars, columns, single-item arrays) is wrapped
/// as the record's only element.
pub fn encode_document(value: &ColbinValue) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match value {
        ColbinValue::Array(array) if array.items.len() != 1 => {
            write_container_header(&mut buf, ContainerKind::Array, array.class, array.items.len())?;
            for item in &array.items {
                write_field_into(&mut buf, item)?;
            }
        }
        other => {
            write_container_header(
                &mut buf,
                ContainerKind::Array,
                AbstractClass::UnsortedMultiset,
                1,
            )?;
            write_field_into(&mut buf, other)?;
        }
    }
    Ok(buf)
}

pub fn from_json_str(json: &str, config: &DocConfig) -> Result<Vec<u8>> {
    let parsed: serde_json::Value = serde_json::from_str(json)?;
    encode_document(&ColbinValue::from_json(&parsed, config)?)
}

pub fn from_cbor(data: &[u8], config: &DocConfig) -> Result<Vec<u8>> {
    let parsed: cbor4ii::core::Value =
        cbor4ii::serde::from_slice(data).map_err(|e| DocError::Cbor(format!("{e:?}")))?;
    encode_document(&ColbinValue::from_cbor(&parsed, config)?)
}
