//! Packet framing
//!
//! Reads and writes go through `read_exact` / `write_all`, which loop until
//! the full byte count has moved or the stream fails. A short transfer is
//! always an error, never a partial packet.

use bytes::{Buf, BufMut, BytesMut};
use jbod_common::{BLOCK_SIZE, Block, zero_block};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtoError, ProtoResult};
use crate::opcode::{Opcode, Request};

/// Size of the fixed packet header
pub const HEADER_LEN: usize = 8;

/// Size of a packet carrying a block
pub const PACKET_MAX_LEN: usize = HEADER_LEN + BLOCK_SIZE;

/// Fixed-layout packet prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Total packet length including the header
    pub length: u16,
    pub opcode: Opcode,
    /// Result code; only meaningful in responses
    pub status: u16,
}

impl PacketHeader {
    pub fn encode(&self, buf: &mut impl BufMut) {
        buf.put_u16(self.length);
        buf.put_u32(self.opcode.raw());
        buf.put_u16(self.status);
    }

    #[must_use]
    pub fn decode(raw: &[u8; HEADER_LEN]) -> Self {
        let mut bytes = &raw[..];
        let length = bytes.get_u16();
        let opcode = Opcode::from_raw(bytes.get_u32());
        let status = bytes.get_u16();
        Self {
            length,
            opcode,
            status,
        }
    }

    /// Whether a block follows this header, rejecting any other length
    pub fn has_payload(&self) -> ProtoResult<bool> {
        match self.length as usize {
            HEADER_LEN => Ok(false),
            PACKET_MAX_LEN => Ok(true),
            _ => Err(ProtoError::BadLength(self.length)),
        }
    }
}

/// A complete packet, request or response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub opcode: Opcode,
    pub status: u16,
    pub block: Option<Block>,
}

impl Packet {
    /// Build the request packet for a block operation
    #[must_use]
    pub fn request(request: &Request<'_>) -> Self {
        Self {
            opcode: request.opcode(),
            status: 0,
            block: request.payload().copied(),
        }
    }

    /// Build a response echoing `opcode`
    #[must_use]
    pub const fn response(opcode: Opcode, status: u16, block: Option<Block>) -> Self {
        Self {
            opcode,
            status,
            block,
        }
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn header(&self) -> PacketHeader {
        let length = if self.block.is_some() {
            PACKET_MAX_LEN
        } else {
            HEADER_LEN
        };
        PacketHeader {
            length: length as u16,
            opcode: self.opcode,
            status: self.status,
        }
    }

    /// Serialize header and optional block
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let header = self.header();
        let mut buf = BytesMut::with_capacity(header.length as usize);
        header.encode(&mut buf);
        if let Some(block) = &self.block {
            buf.put_slice(block);
        }
        buf
    }
}

/// Write one packet to the stream
pub async fn write_packet<W>(writer: &mut W, packet: &Packet) -> ProtoResult<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let buf = packet.encode();
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one packet from the stream: header first, then the block if declared
pub async fn read_packet<R>(reader: &mut R) -> ProtoResult<Packet>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header_buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut header_buf).await?;
    let header = PacketHeader::decode(&header_buf);

    let block = if header.has_payload()? {
        let mut block = zero_block();
        reader.read_exact(&mut block).await?;
        Some(block)
    } else {
        None
    };

    Ok(Packet {
        opcode: header.opcode,
        status: header.status,
        block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Command;

    #[test]
    fn test_header_only_request() {
        let packet = Packet::request(&Request::SeekToDisk(2));
        let bytes = packet.encode();
        assert_eq!(bytes.len(), HEADER_LEN);
        // length 8, opcode (2 << 14) | (2 << 28), status 0
        assert_eq!(&bytes[..], &[0x00, 0x08, 0x20, 0x00, 0x80, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_write_request_carries_block() {
        let block = [0xABu8; BLOCK_SIZE];
        let bytes = Packet::request(&Request::WriteBlock(&block)).encode();
        assert_eq!(bytes.len(), PACKET_MAX_LEN);
        assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]) as usize, PACKET_MAX_LEN);
        assert!(bytes[HEADER_LEN..].iter().all(|b| *b == 0xAB));
    }

    #[test]
    fn test_header_big_endian() {
        let header = PacketHeader {
            length: 0x0108,
            opcode: Opcode::from_raw(0x1234_5678),
            status: 0xBEEF,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(&buf[..], &[0x01, 0x08, 0x12, 0x34, 0x56, 0x78, 0xBE, 0xEF]);

        let raw: [u8; HEADER_LEN] = buf[..].try_into().unwrap();
        assert_eq!(PacketHeader::decode(&raw), header);
    }

    #[test]
    fn test_bad_length_rejected() {
        let header = PacketHeader {
            length: 12,
            opcode: Opcode::new(Command::ReadBlock, 0, 0),
            status: 0,
        };
        assert!(matches!(header.has_payload(), Err(ProtoError::BadLength(12))));
    }

    #[tokio::test]
    async fn test_read_response_with_block() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let opcode = Opcode::new(Command::ReadBlock, 0, 0);
        let sent = Packet::response(opcode, 0, Some([9u8; BLOCK_SIZE]));
        write_packet(&mut server, &sent).await.unwrap();

        let received = read_packet(&mut client).await.unwrap();
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_truncated_payload_is_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let header = PacketHeader {
            length: PACKET_MAX_LEN as u16,
            opcode: Opcode::new(Command::ReadBlock, 0, 0),
            status: 0,
        };
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        buf.put_slice(&[1u8; 10]);
        server.write_all(&buf).await.unwrap();
        drop(server);

        let err = read_packet(&mut client).await.unwrap_err();
        assert!(matches!(err, ProtoError::Io(_)));
    }
}
