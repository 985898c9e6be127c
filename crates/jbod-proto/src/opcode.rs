//! Block-operation requests and their packed 32-bit opcode
//!
//! ```text
//! 31    28 27        20 19    14 13             0
//! ┌───────┬────────────┬────────┬────────────────┐
//! │ disk  │   block    │command │    reserved    │
//! └───────┴────────────┴────────┴────────────────┘
//! ```
//!
//! The disk field is only meaningful for `SeekToDisk`, the block field only
//! for `SeekToBlock`.

use std::fmt;

use jbod_common::{Block, BlockId, DiskId};

use crate::error::{ProtoError, ProtoResult};

const COMMAND_SHIFT: u32 = 14;
const COMMAND_MASK: u32 = 0x3f;
const BLOCK_SHIFT: u32 = 20;
const BLOCK_MASK: u32 = 0xff;
const DISK_SHIFT: u32 = 28;
const DISK_MASK: u32 = 0x0f;

/// Command field of an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    Mount = 0,
    Unmount = 1,
    SeekToDisk = 2,
    SeekToBlock = 3,
    ReadBlock = 4,
    WriteBlock = 5,
}

impl Command {
    pub const ALL: [Self; 6] = [
        Self::Mount,
        Self::Unmount,
        Self::SeekToDisk,
        Self::SeekToBlock,
        Self::ReadBlock,
        Self::WriteBlock,
    ];

    /// Short upper-case name used in logs
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mount => "MOUNT",
            Self::Unmount => "UNMOUNT",
            Self::SeekToDisk => "SEEK_TO_DISK",
            Self::SeekToBlock => "SEEK_TO_BLOCK",
            Self::ReadBlock => "READ_BLOCK",
            Self::WriteBlock => "WRITE_BLOCK",
        }
    }
}

impl TryFrom<u32> for Command {
    type Error = ProtoError;

    fn try_from(value: u32) -> ProtoResult<Self> {
        Self::ALL
            .into_iter()
            .find(|cmd| *cmd as u32 == value)
            .ok_or(ProtoError::UnknownCommand(value))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Packed 32-bit opcode as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u32);

impl Opcode {
    /// Pack a command with its disk and block selectors
    #[must_use]
    pub const fn new(command: Command, disk_id: DiskId, block_id: BlockId) -> Self {
        Self(
            ((disk_id & DISK_MASK) << DISK_SHIFT)
                | ((block_id & BLOCK_MASK) << BLOCK_SHIFT)
                | ((command as u32 & COMMAND_MASK) << COMMAND_SHIFT),
        )
    }

    /// Wrap a raw opcode received from the wire
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Decode the command field
    pub fn command(self) -> ProtoResult<Command> {
        Command::try_from((self.0 >> COMMAND_SHIFT) & COMMAND_MASK)
    }

    #[must_use]
    pub const fn disk_id(self) -> DiskId {
        (self.0 >> DISK_SHIFT) & DISK_MASK
    }

    #[must_use]
    pub const fn block_id(self) -> BlockId {
        (self.0 >> BLOCK_SHIFT) & BLOCK_MASK
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A single block operation
///
/// Only `WriteBlock` carries a payload in the request; `ReadBlock` expects
/// one in the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    Mount,
    Unmount,
    SeekToDisk(DiskId),
    SeekToBlock(BlockId),
    ReadBlock,
    WriteBlock(&'a Block),
}

impl<'a> Request<'a> {
    #[must_use]
    pub const fn command(&self) -> Command {
        match self {
            Self::Mount => Command::Mount,
            Self::Unmount => Command::Unmount,
            Self::SeekToDisk(_) => Command::SeekToDisk,
            Self::SeekToBlock(_) => Command::SeekToBlock,
            Self::ReadBlock => Command::ReadBlock,
            Self::WriteBlock(_) => Command::WriteBlock,
        }
    }

    /// Pack this request into its wire opcode
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::SeekToDisk(disk_id) => Opcode::new(Command::SeekToDisk, *disk_id, 0),
            Self::SeekToBlock(block_id) => Opcode::new(Command::SeekToBlock, 0, *block_id),
            other => Opcode::new(other.command(), 0, 0),
        }
    }

    /// Block sent along with the request, if any
    #[must_use]
    pub const fn payload(&self) -> Option<&'a Block> {
        match self {
            Self::WriteBlock(block) => Some(*block),
            _ => None,
        }
    }

    /// Rebuild a request from a received opcode and optional payload
    pub fn decode(opcode: Opcode, payload: Option<&'a Block>) -> ProtoResult<Self> {
        Ok(match opcode.command()? {
            Command::Mount => Self::Mount,
            Command::Unmount => Self::Unmount,
            Command::SeekToDisk => Self::SeekToDisk(opcode.disk_id()),
            Command::SeekToBlock => Self::SeekToBlock(opcode.block_id()),
            Command::ReadBlock => Self::ReadBlock,
            Command::WriteBlock => {
                Self::WriteBlock(payload.ok_or(ProtoError::MissingPayload("WRITE_BLOCK"))?)
            }
        })
    }
}

impl fmt::Display for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SeekToDisk(id) | Self::SeekToBlock(id) => write!(f, "{}({id})", self.command()),
            other => write!(f, "{}", other.command()),
        }
    }
}
