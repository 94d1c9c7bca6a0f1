//! Print the status stream of a running server
//!
//! Run with: cargo run --example status_watcher [SERVER_ADDR]
//!
//! Defaults to 127.0.0.1:11912.

use status_stream::client::StatusSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("status_stream=info".parse()?),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .map(|a| a.replace("localhost", "127.0.0.1"))
        .unwrap_or_else(|| "127.0.0.1:11912".to_string());

    let mut subscriber = StatusSubscriber::connect(addr.as_str()).await?;
    println!("Connected to {}", subscriber.peer_addr());

    let mut last_timestamp = None;
    while let Some(line) = subscriber.next_line().await? {
        let gap = last_timestamp
            .map(|prev| format!("+{} ms", line.timestamp_ms - prev))
            .unwrap_or_default();
        last_timestamp = Some(line.timestamp_ms);

        println!(
            "odometer={:>6}  lon={:>11.6}  lat={:>10.6}  {}",
            line.odometer, line.longitude, line.latitude, gap
        );
    }

    println!("Server closed the connection");
    Ok(())
}
