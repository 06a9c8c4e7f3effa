use super::array::ArrayIter;
use super::column::ColumnIter;
use super::object::ObjectIter;
use super::path::{DotPath, PathNode};
use crate::colbin_value::ColbinValue;
use crate::error::{DocError, Result};
use crate::memfile::{DocBuf, MemFile, Offset};
use crate::types::FieldType;
use std::fmt;
use tracing::trace;

/// Why a path does not lead to a field. These are ordinary outcomes, not
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStatus {
    EmptyDoc,
    NotTraversable,
    NotAnObject,
    NoSuchKey,
    NoSuchIndex,
    NoNesting,
}

impl fmt::Display for PathStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PathStatus::EmptyDoc => "document is empty",
            PathStatus::NotTraversable => "path continues below a scalar",
            PathStatus::NotAnObject => "key applied to a non-object",
            PathStatus::NoSuchKey => "no such key",
            PathStatus::NoSuchIndex => "no such index",
            PathStatus::NoNesting => "path continues below a column element",
        })
    }
}

/// Result of a lookup that may legitimately miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved<T> {
    Found(T),
    Missing(PathStatus),
}

impl<T> Resolved<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        match self {
            Resolved::Found(t) => Resolved::Found(f(t)),
            Resolved::Missing(status) => Resolved::Missing(status),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Resolved::Found(t) => Some(t),
            Resolved::Missing(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolved::Found(_))
    }

    pub fn status(&self) -> Option<PathStatus> {
        match self {
            Resolved::Found(_) => None,
            Resolved::Missing(status) => Some(*status),
        }
    }
}

/// A resolved field: the iterator of its parent container, positioned on
/// it, plus the slot index for column elements.
#[derive(Debug, Clone, Copy)]
pub enum PathPosition<B> {
    Array(ArrayIter<B>),
    Object(ObjectIter<B>),
    Column(ColumnIter<B>, u64),
}

impl<B> PathPosition<B> {
    /// Same position over another borrow of the buffer. Rebinding to `()`
    /// parks it without holding a borrow.
    pub fn rebind<C>(self, buf: C) -> PathPosition<C> {
        match self {
            PathPosition::Array(it) => PathPosition::Array(it.rebind(buf)),
            PathPosition::Object(it) => PathPosition::Object(it.rebind(buf)),
            PathPosition::Column(it, pos) => PathPosition::Column(it.rebind(buf), pos),
        }
    }

    pub fn detach(self) -> PathPosition<()> {
        self.rebind(())
    }
}

impl<B: DocBuf> PathPosition<B> {
    pub fn field_type(&self) -> Result<FieldType> {
        match self {
            PathPosition::Array(it) => it.field_type(),
            PathPosition::Object(it) => it.field_type(),
            PathPosition::Column(it, pos) => Ok(it.value(*pos)?.field_type()),
        }
    }

    /// Owned copy of the resolved field.
    pub fn value(&self) -> Result<ColbinValue> {
        match self {
            PathPosition::Array(it) => it.decode(),
            PathPosition::Object(it) => it.decode(),
            PathPosition::Column(it, pos) => it.value(*pos),
        }
    }
}

enum Frame<'f> {
    Array(ArrayIter<&'f MemFile>),
    Object(ObjectIter<&'f MemFile>),
    Column(ColumnIter<&'f MemFile>),
}

fn missing<T>(status: PathStatus, node: &PathNode) -> Result<Resolved<T>> {
    trace!(%status, %node, "path did not resolve");
    Ok(Resolved::Missing(status))
}

/// Descends into the container that `field_type` names, starting at `at`.
fn enter(file: &MemFile, field_type: FieldType, at: Offset) -> Result<Option<Frame<'_>>> {
    let frame = match field_type {
        FieldType::Array => Frame::Array(ArrayIter::open(file, at)?),
        FieldType::Object => Frame::Object(ObjectIter::open(file, at)?),
        FieldType::Column(_) => Frame::Column(ColumnIter::open(file, at)?),
        _ => return Ok(None),
    };
    Ok(Some(frame))
}

/// Walks `path` from the record at offset 0.
///
/// A record holding a single array or column is looked through when the
/// path starts with an index, and a unit array holding an object is looked
/// through by key nodes.
pub fn resolve<'f>(file: &'f MemFile, path: &DotPath) -> Result<Resolved<PathPosition<&'f MemFile>>> {
    let Some(first) = path.nodes().first() else {
        return Err(DocError::InvalidPath("empty path".into()));
    };
    let mut record = ArrayIter::open(file, Offset::ZERO)?;
    if record.is_empty() {
        return missing(PathStatus::EmptyDoc, first);
    }

    let mut frame = Frame::Array(record);
    if record.is_unit() && matches!(first, PathNode::Index(_)) {
        record.next()?;
        let field_type = record.field_type()?;
        if matches!(field_type, FieldType::Array | FieldType::Column(_)) {
            if let Some(inner) = enter(file, field_type, record.value_offset()?)? {
                frame = inner;
            }
        }
    }

    let mut at_root = true;
    let mut rest = path.nodes();
    while let Some((node, tail)) = rest.split_first() {
        let (field_type, value_at) = match (frame, node) {
            (Frame::Array(mut it), PathNode::Index(index)) => {
                if !it.advance_to(*index)? {
                    let status = if at_root && it.is_empty() {
                        PathStatus::EmptyDoc
                    } else {
                        PathStatus::NoSuchIndex
                    };
                    return missing(status, node);
                }
                if tail.is_empty() {
                    return Ok(Resolved::Found(PathPosition::Array(it)));
                }
                (it.field_type()?, it.value_offset()?)
            }
            (Frame::Array(mut it), PathNode::Key(_)) => {
                // look through a unit array wrapping an object, same node
                if it.is_unit() && it.advance_to(0)? && it.field_type()? == FieldType::Object {
                    frame = Frame::Object(ObjectIter::open(file, it.value_offset()?)?);
                    continue;
                }
                return missing(PathStatus::NotAnObject, node);
            }
            (Frame::Object(mut it), PathNode::Key(key)) => {
                if !it.find(key)? {
                    let status = if at_root && it.is_empty() {
                        PathStatus::EmptyDoc
                    } else {
                        PathStatus::NoSuchKey
                    };
                    return missing(status, node);
                }
                if tail.is_empty() {
                    return Ok(Resolved::Found(PathPosition::Object(it)));
                }
                (it.field_type()?, it.value_offset()?)
            }
            (Frame::Object(_), PathNode::Index(_)) => {
                return missing(PathStatus::NoSuchIndex, node);
            }
            (Frame::Column(column), PathNode::Index(index)) => {
                if *index >= column.len() {
                    return missing(PathStatus::NoSuchIndex, node);
                }
                if !tail.is_empty() {
                    return missing(PathStatus::NoNesting, &tail[0]);
                }
                return Ok(Resolved::Found(PathPosition::Column(column, *index)));
            }
            (Frame::Column(_), PathNode::Key(_)) => {
                return missing(PathStatus::NotAnObject, node);
            }
        };
        frame = match enter(file, field_type, value_at)? {
            Some(inner) => inner,
            None => return missing(PathStatus::NotTraversable, &tail[0]),
        };
        at_root = false;
        rest = tail;
    }
    Err(DocError::InternalError("path walk ended without a result".into()))
}
