use super::skip::{skip_element, skip_key};
use crate::error::{DocError, Result};
use crate::memfile::{MemFile, Offset};
use crate::types::*;
use tracing::trace;

/// Where an array or object iterator stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterState {
    /// Before element `index`; `next()` lands on it.
    Unpositioned,
    /// On element `index`.
    Positioned,
    /// Past the last element.
    Exhausted,
}

/// Cursor bookkeeping shared by array and object iterators. Holds offsets
/// only; the buffer is passed into every call.
///
/// `pos` is the start of the current element when positioned, the start of
/// the next element when unpositioned, and the container end when exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Elements {
    pub header: Offset,
    pub len: u64,
    pub state: IterState,
    pub index: u64,
    pub pos: Offset,
    pub keyed: bool,
}

impl Elements {
    pub fn open(file: &MemFile, header: Offset, expected: FieldType) -> Result<Self> {
        let marker = file.peek_u8(header)?;
        if type_of(marker)? != expected {
            return Err(DocError::TypeMismatch {
                expected: expected.name(),
                actual: marker,
            });
        }
        let (len, n) = file.read_varint(header + 1)?;
        Ok(Elements {
            header,
            len,
            state: IterState::Unpositioned,
            index: 0,
            pos: header + 1 + n,
            keyed: expected == FieldType::Object,
        })
    }

    fn rewind(&mut self, file: &MemFile) -> Result<()> {
        let (_, n) = file.read_varint(self.header + 1)?;
        self.pos = self.header + 1 + n;
        self.index = 0;
        self.state = IterState::Unpositioned;
        Ok(())
    }

    pub fn next(&mut self, file: &MemFile) -> Result<bool> {
        match self.state {
            IterState::Exhausted => return Ok(false),
            IterState::Positioned => {
                self.pos = skip_element(file, self.pos, self.keyed, 0)?;
                self.index += 1;
            }
            IterState::Unpositioned => {}
        }
        if self.index < self.len {
            self.state = IterState::Positioned;
            Ok(true)
        } else {
            self.state = IterState::Exhausted;
            self.index = self.len;
            Ok(false)
        }
    }

    /// Positions on element `target`, rewinding if it lies behind the cursor.
    /// Returns false and leaves the cursor untouched when out of range.
    pub fn advance_to(&mut self, file: &MemFile, target: u64) -> Result<bool> {
        if target >= self.len {
            return Ok(false);
        }
        let behind = match self.state {
            IterState::Exhausted => true,
            IterState::Positioned | IterState::Unpositioned => self.index > target,
        };
        if behind {
            self.rewind(file)?;
        }
        loop {
            if self.state == IterState::Positioned && self.index == target {
                return Ok(true);
            }
            if !self.next(file)? {
                return Ok(false);
            }
        }
    }

    pub fn require_positioned(&self) -> Result<()> {
        match self.state {
            IterState::Positioned => Ok(()),
            IterState::Unpositioned | IterState::Exhausted => {
                Err(DocError::IllegalOperation("iterator is not on an element"))
            }
        }
    }

    /// Offset of the current element's value field (past the key for objects).
    pub fn value_offset(&self, file: &MemFile) -> Result<Offset> {
        self.require_positioned()?;
        if self.keyed {
            skip_key(file, self.pos)
        } else {
            Ok(self.pos)
        }
    }

    pub fn element_end(&self, file: &MemFile) -> Result<Offset> {
        self.require_positioned()?;
        skip_element(file, self.pos, self.keyed, 0)
    }

    /// Rewrites the element count and moves `pos` with the header.
    fn set_len(&mut self, file: &mut MemFile, len: u64) -> Result<()> {
        let delta = file.update_varint(self.header + 1, len)?;
        self.pos = self.pos.shifted(delta);
        self.len = len;
        Ok(())
    }

    /// Cuts the current element out. The cursor ends up before the element
    /// that followed it, or exhausted.
    pub fn remove(&mut self, file: &mut MemFile) -> Result<()> {
        let end = self.element_end(file)?;
        let removed = self.pos.distance_to(end);
        file.remove_at(self.pos, removed)?;
        trace!(at = self.pos.get(), removed, index = self.index, "removed element");
        self.set_len(file, self.len - 1)?;
        if self.index < self.len {
            self.state = IterState::Unpositioned;
        } else {
            self.state = IterState::Exhausted;
            self.index = self.len;
        }
        Ok(())
    }

    /// Behind the current element when positioned, else at `pos`.
    pub fn insertion_point(&self, file: &MemFile) -> Result<Offset> {
        match self.state {
            IterState::Positioned => self.element_end(file),
            IterState::Unpositioned | IterState::Exhausted => Ok(self.pos),
        }
    }

    /// Bytes for `added` elements were spliced in at the insertion point;
    /// fix the count once. The next `next()` lands on the first new element.
    pub fn commit_insert(&mut self, file: &mut MemFile, added: u64) -> Result<()> {
        if added == 0 {
            return Ok(());
        }
        let old_len = self.len;
        self.set_len(file, old_len + added)?;
        if self.state == IterState::Exhausted {
            self.state = IterState::Unpositioned;
            self.index = old_len;
        }
        Ok(())
    }

    pub fn class(&self, file: &MemFile) -> Result<AbstractClass> {
        class_of(file.peek_u8(self.header)?)
    }

    pub fn set_class(&self, file: &mut MemFile, kind: ContainerKind, class: AbstractClass) -> Result<()> {
        file.write_u8(self.header, concrete_marker(kind, class)?)
    }
}
