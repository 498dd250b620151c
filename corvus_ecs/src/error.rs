use thiserror::Error;

use crate::Uid;

/// Everything that can go wrong while addressing pools or (de)serializing them.
///
/// Lookup misses (`NotFound`, `InvalidParent`) are returned to the caller untouched. The remaining variants signal
/// structural corruption and abort the operation that produced them.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no element with id {id:#018x} in pool `{pool}`")]
    NotFound { id: Uid, pool: &'static str },

    #[error("parent id {0:#018x} does not resolve to a live entity")]
    InvalidParent(Uid),

    #[error("id {id:#018x} was addressed as `{expected}` but lives in pool `{found}`")]
    TypeMismatch {
        id: Uid,
        expected: &'static str,
        found: &'static str,
    },

    #[error("binary write produced {actual} bytes but {expected} were reserved")]
    SerializationLengthMismatch { expected: usize, actual: usize },

    #[error("unexpected end of buffer: needed {needed} bytes at offset {offset}, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("malformed tree node: expected {expected}")]
    MalformedTree { expected: &'static str },

    #[error("invalid discriminant {value} for `{ty}`")]
    InvalidDiscriminant { ty: &'static str, value: u8 },

    #[error("unknown variant `{variant}` for `{ty}`")]
    UnknownVariant { ty: &'static str, variant: String },

    #[error("resource `{0}` was not interned before being written")]
    UnknownResource(String),

    #[error("resource `{0}` appears twice in the remap table")]
    DuplicateResource(String),

    #[error("resource index {index} is out of range (table holds {len} entries)")]
    ResourceIndexOutOfRange { index: u32, len: usize },

    #[error("invalid UTF-8 in serialized string")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("could not generate a fresh id for pool `{pool}` after {attempts} attempts")]
    IdCollision { pool: &'static str, attempts: u32 },

    #[error("id {id:#018x} is already taken in pool `{pool}`")]
    DuplicateId { id: Uid, pool: &'static str },

    #[error("entity {parent:#018x} lists child {child:#018x} more than once")]
    DuplicateChild { parent: Uid, child: Uid },

    #[error("entity {0:#018x} is not reachable from any top-level entity")]
    HierarchyCycle(Uid),

    #[error("id 0 is reserved and cannot be stored in pool `{pool}`")]
    ReservedId { pool: &'static str },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
