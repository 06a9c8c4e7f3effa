use super::column::ColumnIter;
use super::skip::field_len;
use crate::error::{DocError, Result};
use crate::memfile::{MemFile, Offset};
use crate::scalar::{Number, Scalar};
use crate::types::*;
use crate::varint::write_varint;
use tracing::{debug, trace};

/// Replaces the field at `dst` with the encoded field `src`, growing or
/// shrinking the buffer in place. Returns the size delta.
pub fn rewrite_field(file: &mut MemFile, dst: Offset, src: &[u8]) -> Result<isize> {
    let old_len = field_len(file, dst)?;
    let delta = file.splice(dst, old_len, src)?;
    trace!(at = dst.get(), old_len, new_len = src.len(), "rewrote field");
    Ok(delta)
}

fn column_header(out: &mut Vec<u8>, column_type: ColumnType, class: AbstractClass, len: u64, capacity: u64) -> Result<()> {
    out.push(concrete_marker(ContainerKind::Column(column_type), class)?);
    write_varint(out, len);
    write_varint(out, capacity);
    Ok(())
}

/// Rewrites the column at `header` with `wider` slots. Every live value and
/// every null carries over; the capacity is kept.
pub fn widen_column(file: &mut MemFile, header: Offset, wider: ColumnType) -> Result<isize> {
    let (encoded, from) = {
        let column = ColumnIter::open(&*file, header)?;
        let mut out = Vec::with_capacity(10 + column.capacity() as usize * wider.width());
        column_header(&mut out, wider, column.class(), column.len(), column.capacity())?;
        for pos in 0..column.len() {
            wider.push_slot(column.get(pos)?, &mut out)?;
        }
        for _ in column.len()..column.capacity() {
            wider.push_slot(Scalar::Null, &mut out)?;
        }
        (out, column.column_type())
    };
    let delta = rewrite_field(file, header, &encoded)?;
    debug!(at = header.get(), %from, to = %wider, delta, "widened column");
    Ok(delta)
}

/// Turns the column at `header` into an array of the same list class. Each
/// live slot becomes a field at the column's width; null slots become null
/// fields and the spare capacity is dropped.
pub fn column_to_array(file: &mut MemFile, header: Offset) -> Result<isize> {
    let (encoded, from, len) = {
        let column = ColumnIter::open(&*file, header)?;
        let column_type = column.column_type();
        let mut out = Vec::with_capacity(10 + column.len() as usize * (1 + column_type.width()));
        out.push(concrete_marker(ContainerKind::Array, column.class())?);
        write_varint(&mut out, column.len());
        for pos in 0..column.len() {
            let slot = column.get(pos)?;
            match Number::of_column(column_type, slot) {
                Some(number) => number.encode(&mut out),
                None => slot.encode_field(&mut out),
            }
        }
        (out, column_type, column.len())
    };
    let delta = rewrite_field(file, header, &encoded)?;
    debug!(at = header.get(), %from, len, delta, "promoted column to array");
    Ok(delta)
}

/// Rewrites the column at `header` with room for `capacity` slots.
pub fn resize_column(file: &mut MemFile, header: Offset, capacity: u64) -> Result<isize> {
    let encoded = {
        let column = ColumnIter::open(&*file, header)?;
        if capacity < column.len() {
            return Err(DocError::IllegalOperation("capacity below element count"));
        }
        let column_type = column.column_type();
        let mut out = Vec::with_capacity(10 + capacity as usize * column_type.width());
        column_header(&mut out, column_type, column.class(), column.len(), capacity)?;
        out.extend_from_slice(column.raw_payload()?);
        for _ in column.len()..capacity {
            column_type.push_slot(Scalar::Null, &mut out)?;
        }
        out
    };
    rewrite_field(file, header, &encoded)
}
