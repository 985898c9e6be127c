//! Disk array state machine

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use jbod_common::{
    BLOCKS_PER_DISK, Block, BlockId, DiskId, NUM_DISKS, is_valid_block, is_valid_disk, zero_block,
};
use jbod_proto::{BlockOperations, Command, ProtoResult, Request, Response};
use tracing::trace;

/// Status returned for any failed operation (-1 as a 16-bit word)
pub const FAILURE_STATUS: u16 = 0xFFFF;

/// One executed operation, kept for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRecord {
    pub command: Command,
    /// Disk or block selector for seeks
    pub selector: Option<u32>,
}

impl fmt::Display for OpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selector {
            Some(id) => write!(f, "{}({id})", self.command),
            None => write!(f, "{}", self.command),
        }
    }
}

/// In-memory JBOD array
pub struct DiskArray {
    blocks: Vec<Block>,
    mounted: bool,
    head_disk: DiskId,
    head_block: BlockId,
    counts: HashMap<Command, u64>,
    /// Executed operations, recorded only when enabled
    history: Option<Vec<OpRecord>>,
    /// Remaining successes before an injected failure, per command
    faults: HashMap<Command, u64>,
}

impl Default for DiskArray {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskArray {
    /// Create an unmounted array with every block zeroed
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: vec![zero_block(); (NUM_DISKS * BLOCKS_PER_DISK) as usize],
            mounted: false,
            head_disk: 0,
            head_block: 0,
            counts: HashMap::new(),
            history: None,
            faults: HashMap::new(),
        }
    }

    /// Create an array that records every executed operation
    ///
    /// The record is never trimmed; meant for tests, not long-running servers.
    #[must_use]
    pub fn with_history() -> Self {
        Self {
            history: Some(Vec::new()),
            ..Self::new()
        }
    }

    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Number of executed operations of one kind, failed ones included
    #[must_use]
    pub fn count(&self, command: Command) -> u64 {
        self.counts.get(&command).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_operations(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Every executed operation in order; empty unless created `with_history`
    #[must_use]
    pub fn history(&self) -> &[OpRecord] {
        self.history.as_deref().unwrap_or_default()
    }

    /// Make the next `command` fail
    pub fn fail_next(&mut self, command: Command) {
        self.fail_after(command, 0);
    }

    /// Let `successes` more `command`s succeed, then fail one
    pub fn fail_after(&mut self, command: Command, successes: u64) {
        self.faults.insert(command, successes);
    }

    /// Direct view of a block, bypassing mount state and position
    ///
    /// `None` if either id lies outside the array.
    #[must_use]
    pub fn block(&self, disk_id: DiskId, block_id: BlockId) -> Option<&Block> {
        if !is_valid_disk(disk_id) || !is_valid_block(block_id) {
            return None;
        }
        Some(&self.blocks[Self::index(disk_id, block_id)])
    }

    const fn index(disk_id: DiskId, block_id: BlockId) -> usize {
        (disk_id * BLOCKS_PER_DISK + block_id) as usize
    }

    fn injected_failure(&mut self, command: Command) -> bool {
        let Some(remaining) = self.faults.get_mut(&command) else {
            return false;
        };
        if *remaining == 0 {
            self.faults.remove(&command);
            return true;
        }
        *remaining -= 1;
        false
    }

    /// Execute one operation against the array
    pub fn apply(&mut self, request: &Request<'_>) -> Response {
        let command = request.command();
        *self.counts.entry(command).or_default() += 1;
        if let Some(history) = self.history.as_mut() {
            history.push(OpRecord {
                command,
                selector: match request {
                    Request::SeekToDisk(id) | Request::SeekToBlock(id) => Some(*id),
                    _ => None,
                },
            });
        }

        if self.injected_failure(command) {
            trace!(%request, "injected failure");
            return Response::failed(FAILURE_STATUS);
        }

        let response = self.step(request);
        trace!(%request, status = response.status, disk = self.head_disk, block = self.head_block);
        response
    }

    fn step(&mut self, request: &Request<'_>) -> Response {
        match *request {
            Request::Mount if !self.mounted => {
                self.mounted = true;
                Response::ok()
            }
            Request::Unmount if self.mounted => {
                self.mounted = false;
                Response::ok()
            }
            Request::Mount | Request::Unmount => Response::failed(FAILURE_STATUS),
            _ if !self.mounted => Response::failed(FAILURE_STATUS),
            Request::SeekToDisk(disk_id) if disk_id < NUM_DISKS => {
                self.head_disk = disk_id;
                self.head_block = 0;
                Response::ok()
            }
            Request::SeekToBlock(block_id) if block_id < BLOCKS_PER_DISK => {
                self.head_block = block_id;
                Response::ok()
            }
            Request::SeekToDisk(_) | Request::SeekToBlock(_) => Response::failed(FAILURE_STATUS),
            _ if self.head_block >= BLOCKS_PER_DISK => Response::failed(FAILURE_STATUS),
            Request::ReadBlock => {
                let block = self.blocks[Self::index(self.head_disk, self.head_block)];
                self.head_block += 1;
                Response::with_block(block)
            }
            Request::WriteBlock(data) => {
                let index = Self::index(self.head_disk, self.head_block);
                self.blocks[index] = *data;
                self.head_block += 1;
                Response::ok()
            }
        }
    }
}

#[async_trait]
impl BlockOperations for DiskArray {
    async fn execute(&mut self, request: Request<'_>) -> ProtoResult<Response> {
        Ok(self.apply(&request))
    }
}
