mod authority;
mod client_manager;
mod network;

use clap::Parser;
use log::info;
use network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind the server to
    #[arg(short = 'a', long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Server tick rate in Hz
    #[arg(short = 't', long, default_value = "60")]
    tick_rate: u32,

    /// Maximum number of concurrent clients
    #[arg(short = 'm', long, default_value = "16")]
    max_clients: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let tick_duration = Duration::from_secs_f32(1.0 / args.tick_rate as f32);

    info!("Starting server on {}", args.addr);
    info!(
        "Tick rate: {}Hz, max clients: {}",
        args.tick_rate, args.max_clients
    );

    let mut server = Server::new(&args.addr, tick_duration, args.max_clients).await?;
    server.run().await?;

    Ok(())
}
