//! Status server with a simulated vehicle
//!
//! Run with: cargo run --example simple_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example simple_server                    # binds to 0.0.0.0:11912
//!   cargo run --example simple_server localhost          # binds to 127.0.0.1:11912
//!   cargo run --example simple_server 127.0.0.1:11913    # binds to 127.0.0.1:11913
//!
//! ## Watching the stream
//!
//!   nc localhost 11912
//!   cargo run --example status_watcher localhost:11912
//!
//! The simulated vehicle drives a circle of roughly 200 m radius at 15 m/s and
//! stops for a few seconds every lap, so both change-driven broadcasts and
//! heartbeats show up in the output.

use std::net::SocketAddr;
use std::time::Duration;

use status_stream::protocol::constants::DEFAULT_PORT;
use status_stream::{ServerConfig, Status, StatusServer};

/// Update rate of the simulation loop
const SIMULATION_HZ: u64 = 50;

/// Degrees of latitude per metre (close enough for a demo)
const DEG_PER_METRE: f64 = 1.0 / 111_320.0;

/// Simulated vehicle going round in circles
struct Vehicle {
    centre: (f64, f64),
    radius_m: f64,
    speed_mps: f64,
    odometer: f64,
    parked_for: Duration,
}

impl Vehicle {
    fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            centre: (longitude, latitude),
            radius_m: 200.0,
            speed_mps: 15.0,
            odometer: 0.0,
            parked_for: Duration::ZERO,
        }
    }

    fn step(&mut self, dt: Duration) -> Status {
        if self.parked_for > Duration::ZERO {
            self.parked_for = self.parked_for.saturating_sub(dt);
        } else {
            let lap = 2.0 * std::f64::consts::PI * self.radius_m;
            let before = (self.odometer / lap).floor();
            self.odometer += self.speed_mps * dt.as_secs_f64();
            if (self.odometer / lap).floor() > before {
                self.parked_for = Duration::from_secs(3);
            }
        }

        let angle = self.odometer / self.radius_m;
        let offset = self.radius_m * DEG_PER_METRE;
        Status::new(
            self.odometer,
            self.centre.0 + offset * angle.cos() / self.centre.1.to_radians().cos(),
            self.centre.1 + offset * angle.sin(),
        )
    }
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:11912
/// - "localhost:11913" -> 127.0.0.1:11913
/// - "127.0.0.1" -> 127.0.0.1:11912
/// - "0.0.0.0:11912" -> 0.0.0.0:11912
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: simple_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:{})", DEFAULT_PORT);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => ServerConfig::with_addr(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default(),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("status_stream=debug".parse()?)
                .add_directive("simple_server=debug".parse()?),
        )
        .init();

    let mut server = StatusServer::start(config)?;
    println!("Broadcasting status on {}", server.local_addr());
    println!("Watch with: nc {} {}", server.local_addr().ip(), server.local_addr().port());

    let updater = server.updater();
    let producer = tokio::spawn(async move {
        let dt = Duration::from_millis(1000 / SIMULATION_HZ);
        let mut ticker = tokio::time::interval(dt);
        let mut vehicle = Vehicle::new(24.9384, 60.1699);

        loop {
            ticker.tick().await;
            updater.update(vehicle.step(dt));
        }
    });

    let mut report = tokio::time::interval(Duration::from_secs(5));
    report.tick().await;

    loop {
        tokio::select! {
            _ = report.tick() => {
                let stats = server.stats();
                tracing::info!(
                    clients = server.connection_count(),
                    broadcasts = stats.broadcasts,
                    heartbeats = stats.heartbeats,
                    pruned = stats.connections_pruned,
                    "Server stats"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    producer.abort();
    tokio::task::spawn_blocking(move || server.stop()).await?;

    Ok(())
}
