use super::array::ArrayIter;
use super::column::{ColumnIter, ColumnWrite};
use super::object::ObjectIter;
use super::path::ToDotPath;
use super::resolve::{PathPosition, Resolved};
use super::revision::Revision;
use super::rewrite::{column_to_array, rewrite_field, widen_column};
use crate::colbin_value::{ColbinBinary, ColbinColumn, ColbinValue};
use crate::error::{DocError, Result};
use crate::memfile::{DocBufMut, MemFile, Offset};
use crate::scalar::Scalar;
use crate::types::*;
use tracing::debug;

/// Writes `value` over the field at `at`: in place when the stored type is
/// the value's minimal type, otherwise by splicing in the new field.
pub(crate) fn write_scalar_at(file: &mut MemFile, at: Offset, value: Scalar) -> Result<()> {
    let stored = type_of(file.peek_u8(at)?)?;
    let mut encoded = Vec::with_capacity(9);
    value.encode_field(&mut encoded);
    if stored == value.minimal_type() {
        file.write_at(at, &encoded)
    } else {
        rewrite_field(file, at, &encoded).map(|_| ())
    }
}

impl<B: DocBufMut> ArrayIter<B> {
    /// Sets the current element to a scalar.
    pub fn write_scalar(&mut self, value: Scalar) -> Result<()> {
        let at = self.value_offset()?;
        write_scalar_at(self.buf.file_mut(), at, value)
    }
}

impl<B: DocBufMut> ObjectIter<B> {
    /// Sets the current property's value to a scalar.
    pub fn write_scalar(&mut self, value: Scalar) -> Result<()> {
        let at = self.value_offset()?;
        write_scalar_at(self.buf.file_mut(), at, value)
    }
}

impl<B: DocBufMut> ColumnIter<B> {
    /// Sets element `pos`, restructuring the column when the value does not
    /// fit: a wider element type of the same signedness when one holds it,
    /// else promotion to an array.
    pub fn write_scalar(&mut self, pos: u64, value: Scalar) -> Result<ColumnWrite> {
        self.ensure_column()?;
        if pos >= self.len() {
            return Err(DocError::OutOfBounds {
                index: pos,
                len: self.len(),
            });
        }
        let column_type = self.column_type();
        if value.fits_column(column_type) {
            self.update_slot(pos, value)?;
            return Ok(ColumnWrite::InPlace);
        }
        let header = self.header();
        if let Some(wider) = value.widened_column(column_type) {
            widen_column(self.buf.file_mut(), header, wider)?;
            self.reload()?;
            self.update_slot(pos, value)?;
            return Ok(ColumnWrite::Widened(wider));
        }
        column_to_array(self.buf.file_mut(), header)?;
        self.retired = true;
        let mut array = ArrayIter::open(self.buf.file_mut(), header)?;
        if !array.advance_to(pos)? {
            return Err(DocError::InternalError(format!(
                "promoted column lost element {pos}"
            )));
        }
        array.write_scalar(value)?;
        debug!(at = header.get(), pos, %column_type, "column write promoted to array");
        Ok(ColumnWrite::Promoted)
    }

    fn update_slot(&mut self, pos: u64, value: Scalar) -> Result<()> {
        match value {
            Scalar::Null => self.update_set_null(pos),
            other => self.write_slot(pos, other),
        }
    }
}

// ─── Revision setters ───────────────────────────────────────────────────────

macro_rules! scalar_setters {
    ($($name:ident($ty:ty) => $variant:ident;)*) => {
        $(
            pub fn $name<P: ToDotPath + ?Sized>(&mut self, path: &P, value: $ty) -> Result<Resolved<()>> {
                self.set_scalar(path, Scalar::$variant(value.into()))
            }
        )*
    };
}

impl Revision<'_> {
    /// Sets the field at `path` to a scalar. Writes always land: array and
    /// object fields are retyped as needed, columns widen or turn into
    /// arrays.
    pub fn set_scalar<P: ToDotPath + ?Sized>(&mut self, path: &P, value: Scalar) -> Result<Resolved<()>> {
        let position = match self.locate_mut(path)? {
            Resolved::Found(position) => position,
            Resolved::Missing(status) => return Ok(Resolved::Missing(status)),
        };
        match position {
            PathPosition::Array(mut it) => it.write_scalar(value)?,
            PathPosition::Object(mut it) => it.write_scalar(value)?,
            PathPosition::Column(mut column, pos) => {
                column.write_scalar(pos, value)?;
            }
        }
        self.mark_dirty();
        Ok(Resolved::Found(()))
    }

    pub fn set_null<P: ToDotPath + ?Sized>(&mut self, path: &P) -> Result<Resolved<()>> {
        self.set_scalar(path, Scalar::Null)
    }

    pub fn set_true<P: ToDotPath + ?Sized>(&mut self, path: &P) -> Result<Resolved<()>> {
        self.set_scalar(path, Scalar::Bool(true))
    }

    pub fn set_false<P: ToDotPath + ?Sized>(&mut self, path: &P) -> Result<Resolved<()>> {
        self.set_scalar(path, Scalar::Bool(false))
    }

    scalar_setters! {
        set_bool(bool) => Bool;
        set_u8(u8) => Unsigned;
        set_u16(u16) => Unsigned;
        set_u32(u32) => Unsigned;
        set_u64(u64) => Unsigned;
        set_i8(i8) => Signed;
        set_i16(i16) => Signed;
        set_i32(i32) => Signed;
        set_i64(i64) => Signed;
        set_float(f32) => Float;
    }

    pub fn set_string<P: ToDotPath + ?Sized>(&mut self, _path: &P, _value: &str) -> Result<Resolved<()>> {
        Err(DocError::NotImplemented("set_string"))
    }

    pub fn set_binary<P: ToDotPath + ?Sized>(&mut self, _path: &P, _value: &ColbinBinary) -> Result<Resolved<()>> {
        Err(DocError::NotImplemented("set_binary"))
    }

    pub fn set_array<P: ToDotPath + ?Sized>(&mut self, _path: &P, _items: &[ColbinValue]) -> Result<Resolved<()>> {
        Err(DocError::NotImplemented("set_array"))
    }

    pub fn set_column<P: ToDotPath + ?Sized>(&mut self, _path: &P, _column: &ColbinColumn) -> Result<Resolved<()>> {
        Err(DocError::NotImplemented("set_column"))
    }

    pub fn set_object<P: ToDotPath + ?Sized>(&mut self, _path: &P, _value: &ColbinValue) -> Result<Resolved<()>> {
        Err(DocError::NotImplemented("set_object"))
    }

    /// Removes the field at `path` from its parent container.
    pub fn remove<P: ToDotPath + ?Sized>(&mut self, path: &P) -> Result<Resolved<()>> {
        let position = match self.locate_mut(path)? {
            Resolved::Found(position) => position,
            Resolved::Missing(status) => return Ok(Resolved::Missing(status)),
        };
        match position {
            PathPosition::Array(mut it) => it.remove()?,
            PathPosition::Object(mut it) => it.remove()?,
            PathPosition::Column(mut column, pos) => column.remove(pos)?,
        }
        self.mark_dirty();
        Ok(Resolved::Found(()))
    }
}
