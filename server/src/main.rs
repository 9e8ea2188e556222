use clap::Parser;
use log::info;
use server::network::bind_server;
use shared::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (simulation updates per second)
    #[arg(short, long, default_value = "30")]
    tick_rate: u32,

    /// Maximum number of concurrent participants
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// Only count goals when the ball crosses within the goal mouth
    #[arg(long)]
    goal_mouth_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = Config {
        tick_rate: args.tick_rate,
        goal_mouth_only: args.goal_mouth_only,
        ..Config::default()
    };
    // Fatal here: an invalid configuration cannot be patched at runtime
    config.validate()?;

    info!("Starting server on {}:{}", args.host, args.port);

    let mut server = bind_server(&args.host, args.port, config, args.max_clients).await?;
    server.run().await
}
