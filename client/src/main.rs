use clap::Parser;
use client::{input::InputManager, network::NetClient, reconciler::Reconciler, rendering};
use log::{error, info, warn};
use macroquad::prelude::*;
use shared::{now_ms, Config, Packet};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,
}

fn window_conf() -> Conf {
    let cfg = Config::default();
    Conf {
        window_title: "fieldball".to_string(),
        window_width: rendering::window_width(&cfg) as i32,
        window_height: rendering::window_height(&cfg) as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = Config::default();

    info!("Connecting to {}", args.server);
    info!("Controls: WASD or arrow keys to move, Esc to quit");

    let net = match NetClient::connect(&args.server) {
        Ok(net) => net,
        Err(e) => {
            error!("Failed to reach {}: {}", args.server, e);
            return;
        }
    };

    let mut input = InputManager::new();
    let mut reconciler = Reconciler::new(
        config.snapshot_interval_ms(),
        config.interp_delay_ms as f64,
    );
    let mut client_id: Option<u32> = None;

    loop {
        for packet in net.poll() {
            match packet {
                Packet::Connected { client_id: id, team } => {
                    info!("Connected! Participant {} on team {:?}", id, team);
                    client_id = Some(id);
                }
                Packet::Snapshot(snapshot) => {
                    reconciler.record(snapshot, now_ms() as f64);
                }
                Packet::Disconnected { reason } => {
                    warn!("Disconnected: {}", reason);
                    client_id = None;
                }
                _ => warn!("Unexpected packet type"),
            }
        }

        if client_id.is_some() {
            if let Some(directions) = input.update() {
                net.send(Packet::Input { directions });
            }
        }

        if is_key_pressed(KeyCode::Escape) {
            net.disconnect();
            break;
        }

        match reconciler.render_state(now_ms() as f64) {
            Some(state) => rendering::draw_match(&state, &config),
            None => rendering::draw_waiting(&config),
        }

        next_frame().await
    }
}
