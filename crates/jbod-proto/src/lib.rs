//! jbod-net Protocol - Disk-array wire protocol
//!
//! Every block operation is one request/response exchange over a TCP
//! stream. Each packet starts with a fixed 8-byte header and optionally
//! carries exactly one block:
//!
//! ```text
//! 0        2                6        8                    8 + BLOCK_SIZE
//! ┌────────┬────────────────┬────────┬─────────────────────┐
//! │ length │     opcode     │ status │  block (optional)   │
//! │  u16   │      u32       │  u16   │                     │
//! └────────┴────────────────┴────────┴─────────────────────┘
//! ```
//!
//! All integers are big-endian. The block is present iff `length` exceeds
//! the header size.

pub mod client;
pub mod error;
pub mod opcode;
pub mod packet;

pub use client::{BlockOperations, JbodClient, Response};
pub use error::{ProtoError, ProtoResult};
pub use opcode::{Command, Opcode, Request};
pub use packet::{HEADER_LEN, PACKET_MAX_LEN, Packet, PacketHeader, read_packet, write_packet};
