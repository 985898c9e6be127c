//! Block storage error types

use jbod_proto::{Command, ProtoError};
use thiserror::Error;

/// Block storage error
#[derive(Error, Debug)]
pub enum BlockError {
    /// Read or write attempted before mount
    #[error("volume is not mounted")]
    NotMounted,

    /// Mount attempted while mounted
    #[error("volume is already mounted")]
    AlreadyMounted,

    /// Cache operation without a cache
    #[error("cache has not been created")]
    CacheNotCreated,

    /// Cache creation while one exists
    #[error("cache already exists")]
    CacheExists,

    /// Cache capacity outside the permitted range
    #[error("invalid cache capacity {0}")]
    InvalidCapacity(usize),

    /// Disk or block id outside the array
    #[error("invalid block key: disk {disk_id}, block {block_id}")]
    InvalidKey { disk_id: u32, block_id: u32 },

    /// Insert of a key that is already cached
    #[error("block already cached: disk {disk_id}, block {block_id}")]
    DuplicateKey { disk_id: u32, block_id: u32 },

    /// Single call larger than the per-call cap
    #[error("I/O of {length} bytes exceeds the {max} byte limit")]
    TooLarge { length: usize, max: usize },

    /// Range extends past the end of the address space
    #[error("Offset {offset} + length {length} exceeds volume size {size}")]
    OutOfBounds { offset: u64, length: u64, size: u64 },

    /// Remote array reported failure
    #[error("remote {command} failed with status {status}")]
    Remote { command: Command, status: u16 },

    /// Protocol or transport error
    #[error("protocol error: {0}")]
    Proto(#[from] ProtoError),
}

/// Result type for block operations
pub type BlockResult<T> = Result<T, BlockError>;
