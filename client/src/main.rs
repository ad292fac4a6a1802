mod interpolation;
mod prediction;
mod reconcile;
mod session;
mod smoothing;

use clap::Parser;
use log::info;
use rand::Rng;
use session::{InputSource, Session};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Run duration in seconds (0 = run until interrupted)
    #[arg(short = 'd', long, default_value = "0")]
    duration: u64,
}

/// Scripted input for running the client headless: wanders left and right,
/// occasionally jumping. Stands in for a real input device.
struct ScriptedInput {
    axis: f32,
    ticks_left: u32,
}

impl ScriptedInput {
    fn new() -> Self {
        Self {
            axis: 1.0,
            ticks_left: 60,
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self) -> (f32, bool) {
        let mut rng = rand::thread_rng();

        if self.ticks_left == 0 {
            self.axis = match rng.gen_range(0..3) {
                0 => -1.0,
                1 => 1.0,
                _ => 0.0,
            };
            self.ticks_left = rng.gen_range(30..120);
        }
        self.ticks_left -= 1;

        let jump = rng.gen_bool(0.01);
        (self.axis, jump)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let mut session = Session::new(&args.server, ScriptedInput::new(), args.fake_ping).await?;

    let duration = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    session.run(duration).await?;

    info!("Client stopped");
    Ok(())
}
