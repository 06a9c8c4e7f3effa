// ─── Error ──────────────────────────────────────────────────────────────────
use thiserror::Error;

pub type Result<T, E = DocError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("Index {index} out of bounds for {len} live elements")]
    OutOfBounds { index: u64, len: u64 },
    #[error("Corrupted buffer at offset {offset}: needed {needed} bytes, {available} available")]
    Corrupted {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Type mismatch: expected {expected}, got marker {actual:#04x}")]
    TypeMismatch { expected: &'static str, actual: u8 },
    #[error("Illegal operation: {0}")]
    IllegalOperation(&'static str),
    #[error("Unsupported container marker {0:#04x}")]
    UnsupportedContainer(u8),
    #[error("Unsupported type marker {0:#04x}")]
    UnsupportedType(u8),
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("Internal error: {0}")]
    InternalError(String),
    #[error("Invalid dot-path: {0}")]
    InvalidPath(String),
    #[error("Invalid UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("Nesting depth exceeds the limit of {max}")]
    DepthLimit { max: usize },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR error: {0}")]
    Cbor(String),
}

impl DocError {
    pub(crate) fn corrupted(offset: usize, needed: usize, available: usize) -> Self {
        DocError::Corrupted {
            offset,
            needed,
            available,
        }
    }
}
