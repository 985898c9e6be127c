//! jbod-net Simulator - In-memory disk array
//!
//! Emulates the remote JBOD service: a set of zero-initialised disks with a
//! current (disk, block) position that seek commands move and block reads
//! and writes advance. The array can be driven in-process through
//! `BlockOperations` or served over TCP with the same framing the client
//! uses.

pub mod disk;
pub mod server;

pub use disk::{DiskArray, FAILURE_STATUS, OpRecord};
pub use server::JbodServer;
