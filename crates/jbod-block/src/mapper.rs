//! Address mapping for the linear volume
//!
//! Maps linear byte addresses to `(disk, block, offset)` coordinates.

use jbod_common::{BLOCK_SIZE, BlockId, DISK_SIZE, DiskId};

/// A range of bytes within one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub disk_id: DiskId,
    pub block_id: BlockId,
    /// Byte offset within the block
    pub offset_in_block: usize,
    /// Number of bytes in this range
    pub length: usize,
}

/// Split a linear address into disk, block and in-block offset
#[must_use]
pub const fn locate(addr: u32) -> (DiskId, BlockId, usize) {
    let disk_id = addr / DISK_SIZE;
    let block_id = (addr % DISK_SIZE) / BLOCK_SIZE as u32;
    let offset = (addr % BLOCK_SIZE as u32) as usize;
    (disk_id, block_id, offset)
}

/// Convert a byte range to the block ranges covering it, in address order
///
/// No range crosses a block boundary or the end of the request. The caller
/// is responsible for bounds checking against the volume size.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn byte_range_to_blocks(start: u32, length: usize) -> Vec<BlockRange> {
    let mut ranges = Vec::with_capacity(length / BLOCK_SIZE + 2);
    let mut addr = start;
    let mut remaining = length;

    while remaining > 0 {
        let (disk_id, block_id, offset_in_block) = locate(addr);
        let length = (BLOCK_SIZE - offset_in_block).min(remaining);

        ranges.push(BlockRange {
            disk_id,
            block_id,
            offset_in_block,
            length,
        });

        addr += length as u32;
        remaining -= length;
    }

    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use jbod_common::{BLOCKS_PER_DISK, NUM_DISKS, TOTAL_SIZE};

    const fn block_start(disk_id: DiskId, block_id: BlockId) -> u32 {
        disk_id * DISK_SIZE + block_id * BLOCK_SIZE as u32
    }

    #[test]
    fn test_locate() {
        assert_eq!(locate(0), (0, 0, 0));
        assert_eq!(locate(255), (0, 0, 255));
        assert_eq!(locate(256), (0, 1, 0));
        assert_eq!(locate(DISK_SIZE - 1), (0, BLOCKS_PER_DISK - 1, 255));
        assert_eq!(locate(DISK_SIZE), (1, 0, 0));
        assert_eq!(locate(TOTAL_SIZE - 1), (NUM_DISKS - 1, BLOCKS_PER_DISK - 1, 255));
    }

    #[test]
    fn test_block_start_inverts_locate() {
        let addr = 3 * DISK_SIZE + 17 * 256 + 40;
        let (disk, block, offset) = locate(addr);
        assert_eq!(block_start(disk, block) + offset as u32, addr);
    }

    #[test]
    fn test_range_single_block() {
        let ranges = byte_range_to_blocks(10, 20);
        assert_eq!(
            ranges,
            vec![BlockRange {
                disk_id: 0,
                block_id: 0,
                offset_in_block: 10,
                length: 20,
            }]
        );
    }

    #[test]
    fn test_range_spanning_blocks() {
        // 100 bytes before the block boundary, one full block, 50 after
        let ranges = byte_range_to_blocks(156, 100 + 256 + 50);
        assert_eq!(ranges.len(), 3);
        assert_eq!((ranges[0].block_id, ranges[0].offset_in_block, ranges[0].length), (0, 156, 100));
        assert_eq!((ranges[1].block_id, ranges[1].offset_in_block, ranges[1].length), (1, 0, 256));
        assert_eq!((ranges[2].block_id, ranges[2].offset_in_block, ranges[2].length), (2, 0, 50));
    }

    #[test]
    fn test_range_spanning_disks() {
        let ranges = byte_range_to_blocks(DISK_SIZE - 8, 16);
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].disk_id, ranges[0].block_id), (0, BLOCKS_PER_DISK - 1));
        assert_eq!((ranges[1].disk_id, ranges[1].block_id), (1, 0));
        assert_eq!(ranges[1].length, 8);
    }

    #[test]
    fn test_empty_range() {
        assert!(byte_range_to_blocks(1000, 0).is_empty());
    }
}
