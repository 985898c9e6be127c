//! TCP front end for the in-memory array
//!
//! Each connection gets its own task. Requests from all connections go to
//! one shared array; the lock is held for a single operation only, so
//! interleaved clients see each other's seeks. That matches the real
//! service, which has one head per array.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use jbod_proto::{Packet, ProtoError, ProtoResult, Request, Response, read_packet, write_packet};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use crate::disk::{DiskArray, FAILURE_STATUS};

pub struct JbodServer {
    array: Arc<Mutex<DiskArray>>,
}

impl JbodServer {
    #[must_use]
    pub fn new(array: DiskArray) -> Self {
        Self {
            array: Arc::new(Mutex::new(array)),
        }
    }

    /// Shared handle to the served array
    #[must_use]
    pub fn array(&self) -> Arc<Mutex<DiskArray>> {
        Arc::clone(&self.array)
    }

    /// Accept connections until the listener fails
    pub async fn serve(self: Arc<Self>, listener: TcpListener) {
        match listener.local_addr() {
            Ok(addr) => info!("JBOD: listening on {addr}"),
            Err(e) => warn!("JBOD: listening on unknown address: {e}"),
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let server = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_client(stream, peer).await {
                            warn!("JBOD: client {peer} error: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("JBOD: accept error: {e}");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                }
            }
        }
    }

    async fn handle_client(&self, mut stream: TcpStream, peer: SocketAddr) -> ProtoResult<()> {
        info!("JBOD: client {peer} connected");
        stream.set_nodelay(true)?;

        loop {
            let packet = match read_packet(&mut stream).await {
                Ok(packet) => packet,
                Err(ProtoError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    info!("JBOD: client {peer} disconnected");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            let response = match Request::decode(packet.opcode, packet.block.as_ref()) {
                Ok(request) => {
                    let mut array = self.array.lock();
                    array.apply(&request)
                }
                Err(e) => {
                    warn!("JBOD: bad request {} from {peer}: {e}", packet.opcode);
                    Response::failed(FAILURE_STATUS)
                }
            };

            let reply = Packet::response(packet.opcode, response.status, response.block);
            write_packet(&mut stream, &reply).await?;
        }
    }
}
