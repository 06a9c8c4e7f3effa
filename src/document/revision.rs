use super::array::ArrayIter;
use super::doc::Document;
use super::path::ToDotPath;
use super::resolve::{PathPosition, Resolved, resolve};
use crate::colbin_value::ColbinValue;
use crate::error::Result;
use crate::memfile::{MemFile, Offset};
use tracing::debug;

/// Exclusive write session over a [`Document`].
///
/// Holding the `&mut Document` for its whole scope is what makes it the
/// only writer. Dropping (or [`end`](Revision::end)ing) a revision that
/// handed out write access bumps the document's revision counter.
pub struct Revision<'d> {
    doc: &'d mut Document,
    dirty: bool,
}

impl<'d> Revision<'d> {
    pub(crate) fn new(doc: &'d mut Document) -> Self {
        Revision { doc, dirty: false }
    }

    pub fn document(&self) -> &Document {
        self.doc
    }

    /// Read-only lookup through the session.
    pub fn find<P: ToDotPath + ?Sized>(&self, path: &P) -> Result<Resolved<PathPosition<&MemFile>>> {
        resolve(&self.doc.file, &*path.to_dot_path()?)
    }

    pub fn get<P: ToDotPath + ?Sized>(&self, path: &P) -> Result<Option<ColbinValue>> {
        self.find(path)?.found().map(|position| position.value()).transpose()
    }

    /// Resolves `path` to a position that can write through to the buffer.
    pub fn resolve_mut<P: ToDotPath + ?Sized>(
        &mut self,
        path: &P,
    ) -> Result<Resolved<PathPosition<&mut MemFile>>> {
        let parked = resolve(&self.doc.file, &*path.to_dot_path()?)?.map(PathPosition::detach);
        if parked.is_found() {
            self.dirty = true;
        }
        let file = &mut self.doc.file;
        Ok(parked.map(|position| position.rebind(file)))
    }

    /// Like [`resolve_mut`](Revision::resolve_mut) but leaves the session
    /// clean; the caller marks it once its write has landed.
    pub(super) fn locate_mut<P: ToDotPath + ?Sized>(
        &mut self,
        path: &P,
    ) -> Result<Resolved<PathPosition<&mut MemFile>>> {
        let parked = resolve(&self.doc.file, &*path.to_dot_path()?)?.map(PathPosition::detach);
        let file = &mut self.doc.file;
        Ok(parked.map(|position| position.rebind(file)))
    }

    pub(super) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The record array, writable.
    pub fn root_mut(&mut self) -> Result<ArrayIter<&mut MemFile>> {
        self.dirty = true;
        ArrayIter::open(&mut self.doc.file, Offset::ZERO)
    }

    /// Closes the session and returns the document's revision.
    pub fn end(mut self) -> u64 {
        self.finish();
        self.doc.revision
    }

    fn finish(&mut self) {
        if self.dirty {
            self.dirty = false;
            self.doc.revision += 1;
            debug!(
                revision = self.doc.revision,
                bytes = self.doc.file.len(),
                "revision committed"
            );
        }
    }
}

impl Drop for Revision<'_> {
    fn drop(&mut self) {
        self.finish();
    }
}
