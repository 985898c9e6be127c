//! jbod-net Block Storage
//!
//! This crate presents the disks of a remote JBOD array as one linear byte
//! address space. Arbitrary byte ranges are split into whole-block
//! operations, served from an LRU block cache when possible and from the
//! remote array otherwise.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │     Caller      │  read(addr, buf) / write(addr, data)
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   JbodVolume    │
//! │  - mapper       │  byte range → (disk, block, offset, len)
//! │  - CacheSlot    │  LRU over (disk, block)
//! └────────┬────────┘
//!          │ BlockOperations
//! ┌────────▼────────┐
//! │   JbodClient    │  length-prefixed packets over TCP
//! └─────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod mapper;
pub mod volume;

pub use cache::{BlockCache, CacheKey, CacheSlot, CacheStats};
pub use error::{BlockError, BlockResult};
pub use mapper::{BlockRange, byte_range_to_blocks, locate};
pub use volume::JbodVolume;
