//! Callback listener
//!
//! One listener per outstanding round trip. It binds an ephemeral loopback
//! port before the script is sent, then waits for exactly one connection
//! and reads its payload to end of stream. Cancelling the token stops the
//! wait and releases the port.

use std::net::SocketAddr;

use tgsync_common::Result;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Payloads larger than this are truncated
pub const MAX_PAYLOAD_BYTES: u64 = 64 * 1024;

#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackListener {
    /// Bind an ephemeral port on the loopback interface
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let addr = listener.local_addr()?;
        debug!("Callback listener bound to {}", addr);
        Ok(Self { listener, addr })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the completion message. Returns `None` when cancelled.
    /// Consumes the listener: the port is closed when this returns.
    pub async fn accept_one(self, cancel: CancellationToken) -> Option<String> {
        loop {
            let accepted = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Callback listener on {} cancelled", self.addr);
                    return None;
                }
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Callback accept failed on {}: {}", self.addr, e);
                    continue;
                }
            };

            let mut payload = Vec::new();
            let mut limited = stream.take(MAX_PAYLOAD_BYTES);
            let read = tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                read = limited.read_to_end(&mut payload) => read,
            };
            if let Err(e) = read {
                // The connection itself is the completion signal
                warn!("Error reading callback from {}: {}", peer, e);
            }
            debug!("Callback from {} ({} bytes)", peer, payload.len());
            return Some(String::from_utf8_lossy(&payload).into_owned());
        }
    }
}
