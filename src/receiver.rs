//! UDP side of the bridge: one datagram per receive, with an optional timeout.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::BridgeError;

/// Maximum UDP datagram size (64KB for fragmented packets).
pub const MAX_DATAGRAM_SIZE: usize = 65536;

/// Raw payload from one receive call, tagged with its sender.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub payload: Vec<u8>,
    pub sender: SocketAddr,
}

#[derive(Debug)]
pub enum Received {
    Datagram(Datagram),
    /// Nothing arrived within the window. Not an error.
    TimedOut,
}

pub struct UdpReceiver {
    socket: UdpSocket,
    buffer: Vec<u8>,
    last_sender: Option<SocketAddr>,
}

impl UdpReceiver {
    pub async fn bind(addr: SocketAddr) -> Result<Self, BridgeError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;

        Ok(Self {
            socket,
            buffer: vec![0u8; MAX_DATAGRAM_SIZE],
            last_sender: None,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Waits for one datagram. `None` waits indefinitely.
    ///
    /// Transport errors carry the most recent sender seen on this socket,
    /// since the failed call itself does not report one.
    pub async fn receive(&mut self, timeout: Option<Duration>) -> Result<Received, BridgeError> {
        let result = match timeout {
            Some(window) => {
                match tokio::time::timeout(window, self.socket.recv_from(&mut self.buffer)).await {
                    Ok(result) => result,
                    Err(_) => return Ok(Received::TimedOut),
                }
            }
            None => self.socket.recv_from(&mut self.buffer).await,
        };

        match result {
            Ok((len, sender)) => {
                self.last_sender = Some(sender);
                Ok(Received::Datagram(Datagram {
                    payload: self.buffer[..len].to_vec(),
                    sender,
                }))
            }
            Err(cause) => Err(BridgeError::Receive {
                sender: self.last_sender,
                cause,
            }),
        }
    }
}
