use super::array::ArrayIter;
use super::column::ColumnIter;
use super::elements::{Elements, IterState};
use super::rewrite::rewrite_field;
use crate::colbin_value::ColbinValue;
use crate::deserialization::{FieldRef, decode_field, read_bytes, read_field, read_str};
use crate::error::Result;
use crate::memfile::{DocBuf, DocBufMut, MemFile, Offset};
use crate::scalar::Scalar;
use crate::serialization::{write_field_into, write_key};
use crate::types::*;
use tracing::warn;

/// Cursor over the (key, value) properties of an object field.
#[derive(Debug, Clone, Copy)]
pub struct ObjectIter<B> {
    pub(super) buf: B,
    pub(super) el: Elements,
}

impl<B: DocBuf> ObjectIter<B> {
    pub fn open(buf: B, at: Offset) -> Result<Self> {
        let el = Elements::open(buf.file(), at, FieldType::Object)?;
        Ok(ObjectIter { buf, el })
    }

    pub fn header(&self) -> Offset {
        self.el.header
    }

    pub fn len(&self) -> u64 {
        self.el.len
    }

    pub fn is_empty(&self) -> bool {
        self.el.len == 0
    }

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

    /// Key of the current property.
    pub fn key(&self) -> Result<&str> {
        self.el.require_positioned()?;
        Ok(read_str(self.buf.file(), self.el.pos)?.0)
    }

    fn key_bytes(&self) -> Result<&[u8]> {
        self.el.require_positioned()?;
        Ok(read_bytes(self.buf.file(), self.el.pos)?.0)
    }

    /// Positions on the first property named `key`. Linear scan from the
    /// start, comparing key bytes exactly.
    pub fn find(&mut self, key: &str) -> Result<bool> {
        if self.el.state != IterState::Unpositioned || self.el.index != 0 {
            self.el = Elements::open(self.buf.file(), self.el.header, FieldType::Object)?;
        }
        while self.next()? {
            if self.key_bytes()? == key.as_bytes() {
                return Ok(true);
            }
        }
        Ok(false)
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

    pub fn is_multimap(&self) -> Result<bool> {
        Ok(self.class()?.is_multimap())
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

impl<B> ObjectIter<B> {
    pub fn rebind<C>(self, buf: C) -> ObjectIter<C> {
        ObjectIter { buf, el: self.el }
    }
}

impl<B: DocBufMut> ObjectIter<B> {
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

    /// Removes the current property, key included.
    pub fn remove(&mut self) -> Result<()> {
        self.el.remove(self.buf.file_mut())
    }

    /// Replaces the current property's value; the key stays.
    pub fn replace(&mut self, value: &ColbinValue) -> Result<()> {
        let at = self.value_offset()?;
        let mut encoded = Vec::new();
        write_field_into(&mut encoded, value)?;
        rewrite_field(self.buf.file_mut(), at, &encoded).map(|_| ())
    }

    pub fn update_type(&mut self, class: AbstractClass) -> Result<()> {
        self.el.set_class(self.buf.file_mut(), ContainerKind::Object, class)
    }

    pub fn inserter(&mut self) -> ObjectInserter<'_, B> {
        ObjectInserter {
            iter: self,
            staged: Vec::new(),
            count: 0,
            done: false,
        }
    }
}

// ─── Insertion ──────────────────────────────────────────────────────────────

/// Like [`ArrayInserter`](super::ArrayInserter), every property takes a key.
pub struct ObjectInserter<'it, B: DocBufMut> {
    iter: &'it mut ObjectIter<B>,
    staged: Vec<u8>,
    count: u64,
    done: bool,
}

impl<B: DocBufMut> ObjectInserter<'_, B> {
    pub fn push(&mut self, key: &str, value: &ColbinValue) -> Result<&mut Self> {
        write_key(&mut self.staged, key);
        write_field_into(&mut self.staged, value)?;
        self.count += 1;
        Ok(self)
    }

    pub fn push_scalar(&mut self, key: &str, value: Scalar) -> &mut Self {
        write_key(&mut self.staged, key);
        value.encode_field(&mut self.staged);
        self.count += 1;
        self
    }

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

impl<B: DocBufMut> Drop for ObjectInserter<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            warn!(error = %e, "object insertion dropped without commit");
        }
    }
}
