//! Linear volume over the remote disk array
//!
//! Reads and writes take any byte range up to `MAX_IO_SIZE` and are split
//! into whole-block operations. Each remote block access is a seek to the
//! disk, a seek to the block, then the read or write itself. Writes are
//! read-modify-write so bytes outside the written range keep their value.

use jbod_common::{Block, MAX_IO_SIZE, TOTAL_SIZE, zero_block};
use jbod_proto::{BlockOperations, ProtoError, Request, Response};
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CacheSlot, CacheStats};
use crate::error::{BlockError, BlockResult};
use crate::mapper::{BlockRange, byte_range_to_blocks};

/// Linear byte-addressed view of the disk array
///
/// Every operation takes `&mut self`; callers sharing a volume must
/// serialize access themselves.
pub struct JbodVolume<C> {
    ops: C,
    mounted: bool,
    cache: CacheSlot,
}

impl<C: BlockOperations> JbodVolume<C> {
    /// Create an unmounted volume without a cache
    pub const fn new(ops: C) -> Self {
        Self {
            ops,
            mounted: false,
            cache: CacheSlot::new(),
        }
    }

    /// Create an unmounted volume with a cache of `capacity` entries
    pub fn with_cache(ops: C, capacity: usize) -> BlockResult<Self> {
        let mut volume = Self::new(ops);
        volume.create_cache(capacity)?;
        Ok(volume)
    }

    /// Borrow the underlying operation executor
    pub const fn ops(&self) -> &C {
        &self.ops
    }

    pub const fn ops_mut(&mut self) -> &mut C {
        &mut self.ops
    }

    pub fn into_inner(self) -> C {
        self.ops
    }

    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn create_cache(&mut self, capacity: usize) -> BlockResult<()> {
        self.cache.create(capacity)
    }

    pub fn destroy_cache(&mut self) -> BlockResult<()> {
        self.cache.destroy()
    }

    pub const fn cache_enabled(&self) -> bool {
        self.cache.enabled()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.stats()
    }

    pub const fn cache(&self) -> &CacheSlot {
        &self.cache
    }

    /// Mount the remote array
    pub async fn mount(&mut self) -> BlockResult<()> {
        if self.mounted {
            return Err(BlockError::AlreadyMounted);
        }
        self.remote(Request::Mount).await?;
        self.mounted = true;
        info!("Volume mounted");
        Ok(())
    }

    /// Unmount the remote array
    pub async fn unmount(&mut self) -> BlockResult<()> {
        if !self.mounted {
            return Err(BlockError::NotMounted);
        }
        self.remote(Request::Unmount).await?;
        self.mounted = false;
        info!("Volume unmounted");
        Ok(())
    }

    /// Read `buf.len()` bytes starting at `addr`
    ///
    /// Returns the number of bytes read. A failed block aborts the whole
    /// call; bytes already copied into `buf` are not reported.
    pub async fn read(&mut self, addr: u32, buf: &mut [u8]) -> BlockResult<usize> {
        self.check_io(addr, buf.len())?;

        let mut block = zero_block();
        let mut done = 0usize;

        for range in byte_range_to_blocks(addr, buf.len()) {
            let key = CacheKey::new(range.disk_id, range.block_id);

            let hit = self.cache.enabled() && self.cache.lookup(key, &mut block)?;
            if !hit {
                block = self.fetch_block(&range).await?;
                if self.cache.enabled() {
                    self.cache.insert(key, &block)?;
                }
            }

            let start = range.offset_in_block;
            buf[done..done + range.length].copy_from_slice(&block[start..start + range.length]);
            done += range.length;
        }

        Ok(done)
    }

    /// Write `data` starting at `addr`
    ///
    /// Returns the number of bytes written. A failed block aborts the whole
    /// call; blocks already written stay written.
    pub async fn write(&mut self, addr: u32, data: &[u8]) -> BlockResult<usize> {
        self.check_io(addr, data.len())?;

        let mut block = zero_block();
        let mut done = 0usize;

        for range in byte_range_to_blocks(addr, data.len()) {
            let key = CacheKey::new(range.disk_id, range.block_id);

            let hit = self.cache.enabled() && self.cache.lookup(key, &mut block)?;
            if !hit {
                block = self.fetch_block(&range).await?;
            }

            let start = range.offset_in_block;
            block[start..start + range.length].copy_from_slice(&data[done..done + range.length]);
            self.store_block(&range, &block).await?;

            if hit {
                self.cache.update(key, &block);
            } else if self.cache.enabled() {
                self.cache.insert(key, &block)?;
            }
            done += range.length;
        }

        Ok(done)
    }

    /// Entry guards shared by read and write
    fn check_io(&self, addr: u32, length: usize) -> BlockResult<()> {
        if !self.mounted {
            return Err(BlockError::NotMounted);
        }
        if length > MAX_IO_SIZE {
            return Err(BlockError::TooLarge {
                length,
                max: MAX_IO_SIZE,
            });
        }
        let end = u64::from(addr) + length as u64;
        if end > u64::from(TOTAL_SIZE) {
            return Err(BlockError::OutOfBounds {
                offset: u64::from(addr),
                length: length as u64,
                size: u64::from(TOTAL_SIZE),
            });
        }
        Ok(())
    }

    /// Position the array head on the block covering `range`
    async fn seek(&mut self, range: &BlockRange) -> BlockResult<()> {
        self.remote(Request::SeekToDisk(range.disk_id)).await?;
        self.remote(Request::SeekToBlock(range.block_id)).await?;
        Ok(())
    }

    /// Read the current content of a block from the array
    async fn fetch_block(&mut self, range: &BlockRange) -> BlockResult<Block> {
        self.seek(range).await?;
        let response = self.remote(Request::ReadBlock).await?;
        response
            .block
            .ok_or(BlockError::Proto(ProtoError::MissingPayload("READ_BLOCK")))
    }

    /// Write a full block back to the array
    async fn store_block(&mut self, range: &BlockRange, block: &Block) -> BlockResult<()> {
        self.seek(range).await?;
        self.remote(Request::WriteBlock(block)).await?;
        Ok(())
    }

    /// Execute one remote operation, turning a nonzero status into an error
    async fn remote(&mut self, request: Request<'_>) -> BlockResult<Response> {
        let response = self.ops.execute(request).await?;
        if !response.is_success() {
            warn!(%request, status = response.status, "remote block operation failed");
            return Err(BlockError::Remote {
                command: request.command(),
                status: response.status,
            });
        }
        debug!(%request, "remote block operation completed");
        Ok(response)
    }
}
