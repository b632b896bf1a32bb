use crate::types::DataType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the codec can produce. A failure at any field aborts the
/// whole decode or encode call; nothing is recovered locally.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid magic number: expected {expected:02x?}, got {got:02x?}")]
    InvalidMagic { expected: [u8; 4], got: Vec<u8> },

    #[error("truncated input: wanted {wanted} bytes at offset {offset}, only {remaining} left")]
    TruncatedInput {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },

    #[error("field name {name:?} hashes to {got}, meta2 table says {expected}")]
    HashMismatch {
        name: String,
        expected: i32,
        got: i32,
    },

    #[error("corrupt meta2 table: {0}")]
    CorruptMeta2(String),

    #[error("meta1 entry {meta1_index} points at meta2 entry {meta2_index}, which claims meta1 index {got}")]
    Meta1CrossCheck {
        meta1_index: usize,
        meta2_index: usize,
        got: usize,
    },

    #[error("first key of a DSON object must be {expected:?}, found {got:?}")]
    MissingRevision { expected: &'static str, got: String },

    #[error("cannot encode value as {0}")]
    UnsupportedType(DataType),

    #[error("bad {data_type} payload: expected {expected}, got {got}")]
    InvalidDataLength {
        data_type: DataType,
        expected: usize,
        got: usize,
    },

    #[error("field {name:?} holds non-UTF-8 text")]
    InvalidString {
        name: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
}
