use super::array::ArrayIter;
use super::path::ToDotPath;
use super::resolve::{PathPosition, Resolved, resolve};
use super::revision::Revision;
use super::skip::skip_field;
use crate::colbin_value::ColbinValue;
use crate::config::DocConfig;
use crate::deserialization::decode_document;
use crate::error::{DocError, Result};
use crate::memfile::{MemFile, Offset};
use crate::printer::print_document;
use crate::serialization::encode_document;
use crate::types::*;

/// An owned document buffer: the record array at offset 0 and everything
/// nested in it.
///
/// Reads go through [`find`](Document::find) and [`root`](Document::root);
/// writes through a [`Revision`] opened with [`revise`](Document::revise).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub(super) file: MemFile,
    pub(super) revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new_empty()
    }
}

impl Document {
    /// A document whose record has no elements.
    pub fn new_empty() -> Self {
        Document {
            file: MemFile::from_vec(vec![MARKER_ARRAY, 0]),
            revision: 0,
        }
    }

    pub fn from_value(value: &ColbinValue) -> Result<Self> {
        Ok(Document {
            file: MemFile::from_vec(encode_document(value)?),
            revision: 0,
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_str_with(json, &DocConfig::default())
    }

    pub fn from_json_str_with(json: &str, config: &DocConfig) -> Result<Self> {
        let parsed: serde_json::Value = serde_json::from_str(json)?;
        Self::from_json_value_with(&parsed, config)
    }

    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        Self::from_json_value_with(value, &DocConfig::default())
    }

    pub fn from_json_value_with(value: &serde_json::Value, config: &DocConfig) -> Result<Self> {
        Self::from_value(&ColbinValue::from_json(value, config)?)
    }

    pub fn from_cbor_slice(data: &[u8]) -> Result<Self> {
        Self::from_cbor_slice_with(data, &DocConfig::default())
    }

    pub fn from_cbor_slice_with(data: &[u8], config: &DocConfig) -> Result<Self> {
        let parsed: cbor4ii::core::Value =
            cbor4ii::serde::from_slice(data).map_err(|e| DocError::Cbor(format!("{e:?}")))?;
        Self::from_value(&ColbinValue::from_cbor(&parsed, config)?)
    }

    /// Adopts encoded bytes. The buffer must be exactly one array field.
    pub fn from_vec(bytes: Vec<u8>) -> Result<Self> {
        let file = MemFile::from_vec(bytes);
        let marker = file.peek_u8(Offset::ZERO)?;
        if type_of(marker)? != FieldType::Array {
            return Err(DocError::TypeMismatch {
                expected: FieldType::Array.name(),
                actual: marker,
            });
        }
        let end = skip_field(&file, Offset::ZERO)?;
        if end != file.end() {
            return Err(DocError::InternalError(format!(
                "{} trailing bytes after the record",
                end.distance_to(file.end())
            )));
        }
        Ok(Document { file, revision: 0 })
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.file.as_bytes()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.file.into_bytes()
    }

    pub fn byte_len(&self) -> usize {
        self.file.len()
    }

    pub fn file(&self) -> &MemFile {
        &self.file
    }

    /// Number of completed revisions that wrote to this document.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Iterator over the record array.
    pub fn root(&self) -> Result<ArrayIter<&MemFile>> {
        ArrayIter::open(&self.file, Offset::ZERO)
    }

    pub fn find<P: ToDotPath + ?Sized>(&self, path: &P) -> Result<Resolved<PathPosition<&MemFile>>> {
        resolve(&self.file, &*path.to_dot_path()?)
    }

    /// Owned copy of the field at `path`, `None` when it does not resolve.
    pub fn get<P: ToDotPath + ?Sized>(&self, path: &P) -> Result<Option<ColbinValue>> {
        self.find(path)?.found().map(|position| position.value()).transpose()
    }

    /// Opens the write session. Only one can exist at a time.
    pub fn revise(&mut self) -> Revision<'_> {
        Revision::new(self)
    }

    pub fn to_value(&self) -> Result<ColbinValue> {
        decode_document(&self.file)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(self.to_value()?.into())
    }

    pub fn to_json_string(&self) -> Result<String> {
        print_document(&self.file)
    }
}
