//! Disk-array geometry
//!
//! The remote service exposes `NUM_DISKS` disks of `BLOCKS_PER_DISK` blocks
//! each. Callers see the concatenation of all disks as one linear address
//! space:
//!
//! ```text
//! linear address
//! ├── Disk 0:  bytes 0      - 64KB   → blocks 0..256 of 256 bytes
//! ├── Disk 1:  bytes 64KB   - 128KB
//! │   ...
//! └── Disk 15: bytes 960KB  - 1MB
//! ```
//!
//! These values must match the remote service exactly.

/// Size of a block in bytes, the unit of every remote operation
pub const BLOCK_SIZE: usize = 256;

/// Number of blocks on each disk
pub const BLOCKS_PER_DISK: u32 = 256;

/// Number of disks in the array
pub const NUM_DISKS: u32 = 16;

/// Size of a single disk in bytes
pub const DISK_SIZE: u32 = BLOCK_SIZE as u32 * BLOCKS_PER_DISK;

/// Total addressable bytes across all disks
pub const TOTAL_SIZE: u32 = NUM_DISKS * DISK_SIZE;

/// Largest byte count accepted by a single read or write call
pub const MAX_IO_SIZE: usize = 1024;

/// Smallest permitted cache capacity (entries)
pub const MIN_CACHE_ENTRIES: usize = 2;

/// Largest permitted cache capacity (entries)
pub const MAX_CACHE_ENTRIES: usize = 4096;

/// Contents of one block
pub type Block = [u8; BLOCK_SIZE];

/// Disk index within the array
pub type DiskId = u32;

/// Block index within a disk
pub type BlockId = u32;

/// Returns a zero-filled block.
#[must_use]
pub const fn zero_block() -> Block {
    [0u8; BLOCK_SIZE]
}

/// Returns true if `disk_id` names a disk of the array.
#[must_use]
pub const fn is_valid_disk(disk_id: DiskId) -> bool {
    disk_id < NUM_DISKS
}

/// Returns true if `block_id` names a block within a disk.
#[must_use]
pub const fn is_valid_block(block_id: BlockId) -> bool {
    block_id < BLOCKS_PER_DISK
}
