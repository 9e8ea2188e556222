//! Server network layer: UDP transport, packet dispatch, and the tick loop.

use crate::game::Match;
use crate::session::SessionRegistry;
use log::{debug, error, info, warn};
use shared::{codec, now_ms, Config, DirectionSet, Packet, Team, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Outbound queue depth. Snapshots beyond this are dropped: only the
/// newest one is ever useful to a viewer, so a slow consumer loses frames
/// instead of stalling the simulation.
const OUTBOUND_QUEUE: usize = 256;

/// Messages sent from network tasks to the main server loop.
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: Packet,
        addr: SocketAddr,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// An encoded payload queued for a specific participant.
#[derive(Debug)]
pub struct Outbound {
    pub bytes: Vec<u8>,
    pub addr: SocketAddr,
}

/// Main server coordinating transport and the authoritative simulation.
///
/// The `run` loop is the only writer of `registry` and `game`; network
/// tasks communicate with it exclusively through channels.
pub struct Server {
    socket: Arc<UdpSocket>,
    registry: SessionRegistry,
    game: Match,
    config: Config,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    out_tx: mpsc::Sender<Outbound>,
    out_rx: Option<mpsc::Receiver<Outbound>>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: Config,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_QUEUE);

        Ok(Server {
            socket,
            registry: SessionRegistry::new(max_clients),
            game: Match::new(&config),
            config,
            server_tx,
            server_rx,
            out_tx,
            out_rx: Some(out_rx),
        })
    }

    /// The socket address the server actually bound, for tests using an
    /// ephemeral port.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Spawns the task that continuously listens for incoming datagrams.
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match codec::decode(&buffer[0..len]) {
                        Ok(packet) => {
                            if server_tx
                                .send(ServerMessage::PacketReceived { packet, addr })
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Discarding malformed datagram from {}: {}", addr, e);
                        }
                    },
                    Err(e) => {
                        error!("Error receiving datagram: {}", e);
                        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns the task that drains the bounded outbound queue. Sends are
    /// fire-and-forget relative to the tick deadline.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut out_rx = self
            .out_rx
            .take()
            .expect("sender task spawned exactly once");

        tokio::spawn(async move {
            while let Some(Outbound { bytes, addr }) = out_rx.recv().await {
                if let Err(e) = socket.send_to(&bytes, addr).await {
                    error!("Failed to send to {}: {}", addr, e);
                }
            }
        });
    }

    /// Queues a payload without blocking the loop; drops it if the queue
    /// is full.
    fn queue_send(&self, bytes: Vec<u8>, addr: SocketAddr) {
        if let Err(mpsc::error::TrySendError::Full(_)) =
            self.out_tx.try_send(Outbound { bytes, addr })
        {
            warn!("Outbound queue full, dropping payload for {}", addr);
        }
    }

    fn send_packet(&self, packet: &Packet, addr: SocketAddr) {
        match codec::encode(packet) {
            Ok(bytes) => self.queue_send(bytes, addr),
            Err(e) => error!("Failed to encode packet: {}", e),
        }
    }

    /// Applies one inbound packet to the pending session slots. Runs
    /// between ticks on the loop task, never during one.
    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                if client_version != PROTOCOL_VERSION {
                    warn!(
                        "Rejecting {} with protocol version {}",
                        addr, client_version
                    );
                    self.send_packet(
                        &Packet::Disconnected {
                            reason: "Protocol version mismatch".to_string(),
                        },
                        addr,
                    );
                    return;
                }

                // A reconnect from the same address supersedes the old
                // session. The removal is immediate, not deferred, so the
                // slot frees up before the capacity check and the address
                // maps to exactly one session.
                if let Some(existing) = self.registry.find_by_addr(addr) {
                    info!("Superseding existing participant {} from {}", existing, addr);
                    self.registry.disconnect_now(existing);
                    self.game.remove_player(existing);
                }

                match self.registry.connect(addr) {
                    Some((client_id, team)) => {
                        self.game.add_player(client_id, team, &self.config);
                        self.send_packet(&Packet::Connected { client_id, team }, addr);
                    }
                    None => {
                        self.send_packet(
                            &Packet::Disconnected {
                                reason: "Server full".to_string(),
                            },
                            addr,
                        );
                    }
                }
            }

            Packet::Input { directions } => {
                if let Some(client_id) = self.registry.find_by_addr(addr) {
                    let set = DirectionSet::from_tokens(directions.iter().map(String::as_str));
                    self.registry.set_input(client_id, set);
                }
                // Input from an unknown address is a late arrival; ignore it
            }

            Packet::Disconnect => {
                if let Some(client_id) = self.registry.find_by_addr(addr) {
                    self.registry.mark_disconnect(client_id);
                }
            }

            _ => {
                warn!("Unexpected packet type from {}", addr);
            }
        }
    }

    /// One tick boundary: commit deferred removals, consume pending
    /// inputs, advance the simulation, and fan out the snapshot.
    fn tick(&mut self) {
        self.registry.sweep_timeouts();
        for id in self.registry.take_removals() {
            self.game.remove_player(id);
        }

        let inputs = self.registry.pending_inputs();
        self.game
            .step(&inputs, self.config.tick_dt_ms(), &self.config);

        self.broadcast_snapshot();

        if self.game.tick % 300 == 0 && !self.registry.is_empty() {
            debug!(
                "Tick {}: {} participants, score red {} - blue {}",
                self.game.tick,
                self.registry.len(),
                self.game.score.red,
                self.game.score.blue
            );
        }
    }

    /// Encodes the current tick once and queues it for every participant.
    fn broadcast_snapshot(&self) {
        if self.registry.is_empty() {
            return;
        }

        let packet = Packet::Snapshot(self.game.snapshot(now_ms()));
        let bytes = match codec::encode(&packet) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode snapshot: {}", e);
                return;
            }
        };

        for (_, addr) in self.registry.addrs() {
            self.queue_send(bytes.clone(), addr);
        }
    }

    /// Main loop: serializes packet handling and tick advancement on one
    /// task, making it the sole writer of match and session state.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let mut tick_interval = interval(self.config.tick_period());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Server started: {} Hz, field {}x{}",
            self.config.tick_rate, self.config.field_width, self.config.field_height
        );

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr);
                        }
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                }

                _ = tick_interval.tick() => {
                    self.tick();
                }
            }
        }

        Ok(())
    }
}

/// Helper used by the binary and tests to assemble a server from CLI
/// arguments.
pub async fn bind_server(
    host: &str,
    port: u16,
    config: Config,
    max_clients: usize,
) -> Result<Server, Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", host, port);
    Server::new(&addr, config, max_clients).await
}
