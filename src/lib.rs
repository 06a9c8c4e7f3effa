//! Columnar binary JSON: a self-describing document format kept in one
//! contiguous buffer and edited in place.
//!
//! ```text
//! let mut doc = Document::from_json_str("[1, null, 3]")?;
//! doc.revise().set_u32("0", 1024)?;
//! assert_eq!(doc.to_json_string()?, "[1024, null, 3]");
//! ```

pub mod colbin_value;
pub mod config;
pub mod deserialization;
pub mod document;
pub mod error;
pub mod memfile;
pub mod printer;
pub mod scalar;
pub mod serialization;
pub mod types;
pub mod varint;

pub use colbin_value::ColbinValue;
pub use config::DocConfig;
pub use document::{DotPath, Document, PathStatus, Resolved, Revision};
pub use error::{DocError, Result};
pub use scalar::Scalar;
pub use types::{AbstractClass, ColumnType, FieldType};
