use super::column::ColumnIter;
use super::elements::{Elements, IterState};
use super::object::ObjectIter;
use super::rewrite::rewrite_field;
use crate::colbin_value::{ColbinBinary, ColbinValue};
use crate::deserialization::{FieldRef, decode_field, read_field};
use crate::error::Result;
use crate::memfile::{DocBuf, DocBufMut, MemFile, Offset};
use crate::scalar::Scalar;
use crate::serialization::{write_binary, write_field_into, write_string};
use crate::types::*;
use tracing::warn;

/// Cursor over the elements of an array field.
///
/// `B` is the buffer borrow: `&MemFile` for read views, `&mut MemFile`
/// inside a revision. Mutating methods only exist for the latter.
#[derive(Debug, Clone, Copy)]
pub struct ArrayIter<B> {
    pub(super) buf: B,
    pub(super) el: Elements,
}

impl<B: DocBuf> ArrayIter<B> {
    pub fn open(buf: B, at: Offset) -> Result<Self> {
        let el = Elements::open(buf.file(), at, FieldType::Array)?;
        Ok(ArrayIter { buf, el })
    }

    /// Offset of the array's marker.
    pub fn header(&self) -> Offset {
        self.el.header
    }

    pub fn len(&self) -> u64 {
        self.el.len
    }

    pub fn is_empty(&self) -> bool {
        self.el.len == 0
    }

    /// Exactly one element.
    pub fn is_unit(&self) -> bool {
        self.el.len == 1
    }

    pub fn state(&self) -> IterState {
        self.el.state
    }

    pub fn index(&self) -> u64 {
        self.el.index
    }

    pub fn next(&mut self) -> Result<bool> {
        self.el.next(self.buf.file())
    }

    pub fn advance_to(&mut self, index: u64) -> Result<bool> {
        self.el.advance_to(self.buf.file(), index)
    }

    pub fn value_offset(&self) -> Result<Offset> {
        self.el.value_offset(self.buf.file())
    }

    pub fn field_type(&self) -> Result<FieldType> {
        let file = self.buf.file();
        type_of(file.peek_u8(self.el.value_offset(file)?)?)
    }

    pub fn value(&self) -> Result<FieldRef<'_>> {
        let file = self.buf.file();
        read_field(file, self.el.value_offset(file)?)
    }

    /// Owned copy of the current element.
    pub fn decode(&self) -> Result<ColbinValue> {
        let file = self.buf.file();
        decode_field(file, self.el.value_offset(file)?)
    }

    pub fn class(&self) -> Result<AbstractClass> {
        self.el.class(self.buf.file())
    }

    pub fn is_sorted(&self) -> Result<bool> {
        Ok(self.class()?.is_sorted())
    }

    pub fn is_multiset(&self) -> Result<bool> {
        Ok(self.class()?.is_multiset())
    }

    pub fn array_value(&self) -> Result<ArrayIter<&MemFile>> {
        ArrayIter::open(self.buf.file(), self.value_offset()?)
    }

    pub fn object_value(&self) -> Result<ObjectIter<&MemFile>> {
        ObjectIter::open(self.buf.file(), self.value_offset()?)
    }

    pub fn column_value(&self) -> Result<ColumnIter<&MemFile>> {
        ColumnIter::open(self.buf.file(), self.value_offset()?)
    }
}

impl<B> ArrayIter<B> {
    /// Same cursor over another borrow of the buffer.
    pub fn rebind<C>(self, buf: C) -> ArrayIter<C> {
        ArrayIter { buf, el: self.el }
    }
}

impl<B: DocBufMut> ArrayIter<B> {
    pub fn array_value_mut(&mut self) -> Result<ArrayIter<&mut MemFile>> {
        let at = self.value_offset()?;
        ArrayIter::open(self.buf.file_mut(), at)
    }

    pub fn object_value_mut(&mut self) -> Result<ObjectIter<&mut MemFile>> {
        let at = self.value_offset()?;
        ObjectIter::open(self.buf.file_mut(), at)
    }

    pub fn column_value_mut(&mut self) -> Result<ColumnIter<&mut MemFile>> {
        let at = self.value_offset()?;
        ColumnIter::open(self.buf.file_mut(), at)
    }

    /// Removes the current element; `next()` then yields the one after it.
    pub fn remove(&mut self) -> Result<()> {
        self.el.remove(self.buf.file_mut())
    }

    /// Replaces the current element with `value`, whatever its size.
    pub fn replace(&mut self, value: &ColbinValue) -> Result<()> {
        let at = self.value_offset()?;
        let mut encoded = Vec::new();
        write_field_into(&mut encoded, value)?;
        rewrite_field(self.buf.file_mut(), at, &encoded).map(|_| ())
    }

    /// Retypes the array to another list refinement. Only the marker changes.
    pub fn update_type(&mut self, class: AbstractClass) -> Result<()> {
        self.el.set_class(self.buf.file_mut(), ContainerKind::Array, class)
    }

    /// Opens an insertion session behind the current element (or at the
    /// cursor when not positioned).
    pub fn inserter(&mut self) -> ArrayInserter<'_, B> {
        ArrayInserter {
            iter: self,
            staged: Vec::new(),
            count: 0,
            done: false,
        }
    }
}

// ─── Insertion ──────────────────────────────────────────────────────────────

/// Collects new elements and splices them into the array in one go. The
/// element count is fixed up once, on [`ArrayInserter::end`] or on drop.
pub struct ArrayInserter<'it, B: DocBufMut> {
    iter: &'it mut ArrayIter<B>,
    staged: Vec<u8>,
    count: u64,
    done: bool,
}

impl<B: DocBufMut> ArrayInserter<'_, B> {
    pub fn push(&mut self, value: &ColbinValue) -> Result<&mut Self> {
        write_field_into(&mut self.staged, value)?;
        self.count += 1;
        Ok(self)
    }

    pub fn push_scalar(&mut self, value: Scalar) -> &mut Self {
        value.encode_field(&mut self.staged);
        self.count += 1;
        self
    }

    pub fn push_str(&mut self, value: &str) -> &mut Self {
        write_string(&mut self.staged, value);
        self.count += 1;
        self
    }

    pub fn push_binary(&mut self, value: &ColbinBinary) -> &mut Self {
        write_binary(&mut self.staged, value);
        self.count += 1;
        self
    }

    /// Writes the staged elements and returns how many were inserted.
    pub fn end(mut self) -> Result<u64> {
        self.commit()
    }

    fn commit(&mut self) -> Result<u64> {
        if self.done {
            return Ok(0);
        }
        self.done = true;
        let el = &mut self.iter.el;
        let file = self.iter.buf.file_mut();
        let at = el.insertion_point(file)?;
        file.insert_at(at, &self.staged)?;
        el.commit_insert(file, self.count)?;
        Ok(self.count)
    }
}

impl<B: DocBufMut> Drop for ArrayInserter<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            warn!(error = %e, "array insertion dropped without commit");
        }
    }
}
