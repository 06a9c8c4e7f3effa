use super::rewrite::resize_column;
use crate::colbin_value::ColbinValue;
use crate::error::{DocError, Result};
use crate::memfile::{DocBuf, DocBufMut, Offset};
use crate::scalar::{ColumnValue, Number, Scalar};
use crate::types::*;
use std::marker::PhantomData;
use tracing::debug;

/// Smallest capacity a full column grows to.
const MIN_GROWN_CAPACITY: u64 = 4;

/// Outcome of writing a value into a column slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnWrite {
    /// The slot was overwritten.
    InPlace,
    /// The column was rewritten at a wider element type first.
    Widened(ColumnType),
    /// The column became an array; this iterator no longer applies.
    Promoted,
}

/// Random-access cursor over a typed column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnIter<B> {
    pub(super) buf: B,
    header: Offset,
    column_type: ColumnType,
    class: AbstractClass,
    len: u64,
    capacity: u64,
    payload: Offset,
    cursor: Option<u64>,
    pub(super) retired: bool,
}

impl<B: DocBuf> ColumnIter<B> {
    /// Reads the column header at `at`. Fails with `IllegalOperation` on any
    /// other field kind and `Corrupted` when the slots run past the buffer.
    pub fn open(buf: B, at: Offset) -> Result<Self> {
        let file = buf.file();
        let marker = file.peek_u8(at)?;
        let FieldType::Column(column_type) = type_of(marker)? else {
            return Err(DocError::IllegalOperation("field is not a column"));
        };
        let (len, n) = file.read_varint(at + 1)?;
        let (capacity, m) = file.read_varint(at + 1 + n)?;
        if capacity < len {
            return Err(DocError::InternalError(format!(
                "column at {} holds {len} elements in {capacity} slots",
                at.get()
            )));
        }
        let payload = at + 1 + n + m;
        file.check_span(payload, capacity.saturating_mul(column_type.width() as u64))?;
        Ok(ColumnIter {
            class: class_of(marker)?,
            buf,
            header: at,
            column_type,
            len,
            capacity,
            payload,
            cursor: None,
            retired: false,
        })
    }

    pub fn header(&self) -> Offset {
        self.header
    }

    pub fn payload_offset(&self) -> Offset {
        self.payload
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn class(&self) -> AbstractClass {
        self.class
    }

    pub fn is_sorted(&self) -> bool {
        self.class.is_sorted()
    }

    pub fn is_multiset(&self) -> bool {
        self.class.is_multiset()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Advances the sequential cursor. False once past the last element.
    pub fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.len {
            self.cursor = Some(next);
            true
        } else {
            self.cursor = Some(self.len);
            false
        }
    }

    /// Element the cursor is on, if any.
    pub fn position(&self) -> Option<u64> {
        self.cursor.filter(|c| *c < self.len)
    }

    pub fn current(&self) -> Result<Option<Scalar>> {
        self.position().map(|pos| self.get(pos)).transpose()
    }

    fn check_index(&self, pos: u64) -> Result<()> {
        if self.retired {
            return Err(DocError::IllegalOperation("column was promoted to an array"));
        }
        if pos >= self.len {
            return Err(DocError::OutOfBounds {
                index: pos,
                len: self.len,
            });
        }
        Ok(())
    }

    fn slot_offset(&self, pos: u64) -> Offset {
        self.payload + pos as usize * self.column_type.width()
    }

    fn slot(&self, pos: u64) -> Result<&[u8]> {
        self.check_index(pos)?;
        self.buf.file().read_at(self.slot_offset(pos), self.column_type.width())
    }

    pub fn get(&self, pos: u64) -> Result<Scalar> {
        Ok(self.column_type.read_slot(self.slot(pos)?))
    }

    /// Element `pos` as a number of the column's own width.
    pub fn value(&self, pos: u64) -> Result<ColbinValue> {
        let slot = self.get(pos)?;
        Ok(match Number::of_column(self.column_type, slot) {
            Some(number) => ColbinValue::Number(number),
            None => ColbinValue::from_scalar(slot),
        })
    }

    pub fn is_null(&self, pos: u64) -> Result<bool> {
        Ok(self.column_type.slot_is_null(self.slot(pos)?))
    }

    /// Typed view of the live elements. `T` must be the column's slot type.
    pub fn values<T: ColumnValue>(&self) -> Result<ColumnValues<'_, T>> {
        if T::COLUMN_TYPE != self.column_type {
            return Err(DocError::TypeMismatch {
                expected: T::COLUMN_TYPE.name(),
                actual: self.buf.file().peek_u8(self.header)?,
            });
        }
        Ok(ColumnValues {
            bytes: self.raw_payload()?,
            _slot: PhantomData,
        })
    }

    /// Bytes of the live slots, little-endian.
    pub fn raw_payload(&self) -> Result<&[u8]> {
        if self.retired {
            return Err(DocError::IllegalOperation("column was promoted to an array"));
        }
        self.buf
            .file()
            .read_at(self.payload, self.len as usize * self.column_type.width())
    }
}

impl<B> ColumnIter<B> {
    pub fn rebind<C>(self, buf: C) -> ColumnIter<C> {
        ColumnIter {
            buf,
            header: self.header,
            column_type: self.column_type,
            class: self.class,
            len: self.len,
            capacity: self.capacity,
            payload: self.payload,
            cursor: self.cursor,
            retired: self.retired,
        }
    }
}

impl<B: DocBufMut> ColumnIter<B> {
    /// The marker still says this column. Guards every write.
    pub(super) fn ensure_column(&self) -> Result<()> {
        let marker = self.buf.file().peek_u8(self.header)?;
        match type_of(marker)? {
            FieldType::Column(column_type) if !self.retired && column_type == self.column_type => {
                Ok(())
            }
            _ => Err(DocError::UnsupportedContainer(marker)),
        }
    }

    /// Re-reads the header after the column was rewritten in place.
    pub(super) fn reload(&mut self) -> Result<()> {
        let file = self.buf.file();
        let marker = file.peek_u8(self.header)?;
        let FieldType::Column(column_type) = type_of(marker)? else {
            return Err(DocError::UnsupportedContainer(marker));
        };
        let (len, n) = file.read_varint(self.header + 1)?;
        let (capacity, m) = file.read_varint(self.header + 1 + n)?;
        self.column_type = column_type;
        self.class = class_of(marker)?;
        self.len = len;
        self.capacity = capacity;
        self.payload = self.header + 1 + n + m;
        Ok(())
    }

    pub(super) fn write_slot(&mut self, pos: u64, value: Scalar) -> Result<()> {
        self.check_index(pos)?;
        let mut slot = [0u8; 8];
        let width = self.column_type.width();
        self.column_type.write_slot(value, &mut slot[..width])?;
        let at = self.slot_offset(pos);
        self.buf.file_mut().write_at(at, &slot[..width])
    }

    /// Rewrites the element count and moves the payload with the header.
    fn set_len(&mut self, len: u64) -> Result<()> {
        let delta = self.buf.file_mut().update_varint(self.header + 1, len)?;
        self.payload = self.payload.shifted(delta);
        self.len = len;
        Ok(())
    }

    /// Removes element `pos`. Later slots move down one and a null slot is
    /// left at the end of the live range, so capacity and byte span stay put.
    pub fn remove(&mut self, pos: u64) -> Result<()> {
        self.ensure_column()?;
        self.check_index(pos)?;
        let width = self.column_type.width();
        let at = self.slot_offset(pos);
        let tail = (self.len - pos - 1) as usize * width;
        let last = self.slot_offset(self.len - 1);
        let mut null = [0u8; 8];
        self.column_type.write_null(&mut null[..width]);
        let file = self.buf.file_mut();
        file.copy_within(at + width, tail, at)?;
        file.write_at(last, &null[..width])?;
        self.set_len(self.len - 1)?;
        if let Some(c) = self.cursor {
            if c >= pos {
                self.cursor = c.checked_sub(1);
            }
        }
        Ok(())
    }

    pub fn update_set_null(&mut self, pos: u64) -> Result<()> {
        self.ensure_column()?;
        self.write_slot(pos, Scalar::Null)
    }

    /// Boolean columns take the value in place; any other column type is
    /// promoted to an array first.
    pub fn update_set_true(&mut self, pos: u64) -> Result<ColumnWrite> {
        self.write_scalar(pos, Scalar::Bool(true))
    }

    pub fn update_set_false(&mut self, pos: u64) -> Result<ColumnWrite> {
        self.write_scalar(pos, Scalar::Bool(false))
    }

    /// Writes a value of the column's own slot type.
    pub fn set<T: ColumnValue>(&mut self, pos: u64, value: T) -> Result<()> {
        self.ensure_column()?;
        if T::COLUMN_TYPE != self.column_type {
            return Err(DocError::TypeMismatch {
                expected: self.column_type.name(),
                actual: self.buf.file().peek_u8(self.header)?,
            });
        }
        self.check_index(pos)?;
        let mut slot = [0u8; 8];
        let width = self.column_type.width();
        value.write_slot(&mut slot[..width]);
        let at = self.slot_offset(pos);
        self.buf.file_mut().write_at(at, &slot[..width])
    }

    /// Retypes to another list refinement. Only the marker byte changes.
    pub fn update_type(&mut self, class: AbstractClass) -> Result<()> {
        self.ensure_column()?;
        let marker = concrete_marker(ContainerKind::Column(self.column_type), class)?;
        self.buf.file_mut().write_u8(self.header, marker)?;
        self.class = class;
        Ok(())
    }

    /// Appends a value that fits the column, doubling the capacity when full.
    pub fn push(&mut self, value: Scalar) -> Result<()> {
        self.ensure_column()?;
        if !value.fits_column(self.column_type) {
            return Err(DocError::TypeMismatch {
                expected: self.column_type.name(),
                actual: value.minimal_type().scalar_marker().unwrap_or(MARKER_NULL),
            });
        }
        if self.len == self.capacity {
            let grown = (self.capacity * 2).max(MIN_GROWN_CAPACITY);
            resize_column(self.buf.file_mut(), self.header, grown)?;
            debug!(from = self.capacity, to = grown, "grew column capacity");
            self.reload()?;
        }
        let pos = self.len;
        self.set_len(pos + 1)?;
        self.write_slot(pos, value)
    }
}

// ─── Typed view ─────────────────────────────────────────────────────────────

/// Live slots of a column read as `T`. Slots are not aligned in the buffer,
/// so elements are decoded on access rather than borrowed.
#[derive(Debug, Clone, Copy)]
pub struct ColumnValues<'a, T> {
    bytes: &'a [u8],
    _slot: PhantomData<T>,
}

impl<'a, T: ColumnValue> ColumnValues<'a, T> {
    pub fn len(&self) -> usize {
        self.bytes.len() / T::COLUMN_TYPE.width()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<T> {
        let width = T::COLUMN_TYPE.width();
        self.bytes
            .get(pos * width..(pos + 1) * width)
            .map(T::from_slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = T> {
        self.bytes
            .chunks_exact(T::COLUMN_TYPE.width())
            .map(T::from_slot)
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }
}
