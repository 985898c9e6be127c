//! Disk-array client
//!
//! Holds at most one connection and runs one request/response exchange at a
//! time. There is no pipelining: `execute` returns only after the matching
//! response has been read in full.
//!
//! There is no timeout either. A server that stops answering blocks the
//! caller until the socket itself fails.

use async_trait::async_trait;
use jbod_common::Block;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::{ProtoError, ProtoResult};
use crate::opcode::{Command, Request};
use crate::packet::{Packet, read_packet, write_packet};

/// Result of one block operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Server status; 0 means success
    pub status: u16,
    /// Block returned by a successful read
    pub block: Option<Block>,
}

impl Response {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            status: 0,
            block: None,
        }
    }

    #[must_use]
    pub const fn with_block(block: Block) -> Self {
        Self {
            status: 0,
            block: Some(block),
        }
    }

    #[must_use]
    pub const fn failed(status: u16) -> Self {
        Self {
            status,
            block: None,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status == 0
    }
}

/// Anything that can execute block operations
///
/// Implemented by the TCP client and by in-process disk arrays.
#[async_trait]
pub trait BlockOperations: Send {
    /// Execute one operation and wait for its completion
    ///
    /// `Err` means the exchange itself failed; a remote failure is an `Ok`
    /// response with a nonzero status.
    async fn execute(&mut self, request: Request<'_>) -> ProtoResult<Response>;
}

/// Client for the disk-array service
#[derive(Debug)]
pub struct JbodClient<S = TcpStream> {
    stream: Option<S>,
}

impl Default for JbodClient<TcpStream> {
    fn default() -> Self {
        Self::new()
    }
}

impl JbodClient<TcpStream> {
    /// Create a client with no connection
    #[must_use]
    pub const fn new() -> Self {
        Self { stream: None }
    }

    /// Open the connection to `address:port`
    pub async fn connect(&mut self, address: &str, port: u16) -> ProtoResult<()> {
        if self.stream.is_some() {
            return Err(ProtoError::AlreadyConnected);
        }

        let stream = TcpStream::connect((address, port))
            .await
            .map_err(|source| ProtoError::Connect {
                address: format!("{address}:{port}"),
                source,
            })?;
        stream.set_nodelay(true)?;

        info!("Connected to disk array at {address}:{port}");
        self.stream = Some(stream);
        Ok(())
    }
}

impl<S> JbodClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already-connected stream
    pub const fn from_stream(stream: S) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Close the connection; does nothing when not connected
    pub async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Shutdown of disk-array connection failed: {e}");
            }
            info!("Disconnected from disk array");
        }
    }

    async fn exchange(stream: &mut S, request: &Request<'_>) -> ProtoResult<Response> {
        write_packet(stream, &Packet::request(request)).await?;
        let reply = read_packet(stream).await?;

        // A payload is drained by read_packet even when unwanted, so the
        // stream stays aligned; only a read hands it back.
        let block = match request.command() {
            Command::ReadBlock => reply.block,
            _ => None,
        };
        Ok(Response {
            status: reply.status,
            block,
        })
    }
}

#[async_trait]
impl<S> BlockOperations for JbodClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn execute(&mut self, request: Request<'_>) -> ProtoResult<Response> {
        let stream = self.stream.as_mut().ok_or(ProtoError::NotConnected)?;

        match Self::exchange(stream, &request).await {
            Ok(response) => {
                debug!(%request, status = response.status, "block operation");
                Ok(response)
            }
            Err(e) => {
                // The stream position is unknown after a failed exchange.
                warn!(%request, "Dropping disk-array connection: {e}");
                self.stream = None;
                Err(e)
            }
        }
    }
}
