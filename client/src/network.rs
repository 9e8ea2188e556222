//! UDP plumbing bridging the frame loop and tokio.
//!
//! macroquad owns the main thread, so the socket lives on a private tokio
//! runtime. Decoded packets flow to the frame loop through a channel it
//! polls once per frame; outbound packets travel the other way and are
//! encoded and sent by a background task, keeping the frame loop free of
//! network waits.

use log::{error, warn};
use shared::{codec, Packet, PROTOCOL_VERSION};
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

pub struct NetClient {
    // Held to keep the background tasks alive for the client's lifetime
    _runtime: Runtime,
    incoming: std_mpsc::Receiver<Packet>,
    outgoing: mpsc::UnboundedSender<Packet>,
}

impl NetClient {
    /// Binds an ephemeral local port, starts the receive and send tasks,
    /// and sends the connect handshake.
    pub fn connect(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let runtime = Runtime::new()?;

        let socket = runtime.block_on(async {
            let socket = UdpSocket::bind("0.0.0.0:0").await?;
            socket.connect(server_addr).await?;
            Ok::<_, std::io::Error>(socket)
        })?;
        let socket = Arc::new(socket);

        let (incoming_tx, incoming) = std_mpsc::channel();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Packet>();

        let recv_socket = Arc::clone(&socket);
        runtime.spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match recv_socket.recv(&mut buffer).await {
                    Ok(len) => match codec::decode(&buffer[0..len]) {
                        Ok(packet) => {
                            if incoming_tx.send(packet).is_err() {
                                break;
                            }
                        }
                        // A bad datagram costs one snapshot; the next one
                        // restores full state
                        Err(e) => warn!("Discarding undecodable datagram: {}", e),
                    },
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        break;
                    }
                }
            }
        });

        runtime.spawn(async move {
            while let Some(packet) = outgoing_rx.recv().await {
                match codec::encode(&packet) {
                    Ok(bytes) => {
                        if let Err(e) = socket.send(&bytes).await {
                            error!("Error sending packet: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to encode packet: {}", e),
                }
            }
        });

        let client = NetClient {
            _runtime: runtime,
            incoming,
            outgoing,
        };
        client.send(Packet::Connect {
            client_version: PROTOCOL_VERSION,
        });

        Ok(client)
    }

    /// Queues a packet for the send task. Errors surface in the task's
    /// own logging; the frame loop never blocks on them.
    pub fn send(&self, packet: Packet) {
        let _ = self.outgoing.send(packet);
    }

    /// Drains every packet that arrived since the last frame.
    pub fn poll(&self) -> Vec<Packet> {
        self.incoming.try_iter().collect()
    }

    pub fn disconnect(&self) {
        self.send(Packet::Disconnect);
    }
}
