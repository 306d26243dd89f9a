//! Example: Watching Live Notifications
//!
//! Subscribes to the readings characteristic and prints every notification
//! until Ctrl+C, then releases the subscription and disconnects.
//!
//! Run with: `cargo run --example watch_sensor -- <DEVICE_ADDRESS>`

use std::env;

use futures::StreamExt;

use flowerpot_core::Device;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let identifier = env::args().nth(1).unwrap_or_else(|| "flowerpot".to_string());

    println!("Connecting to {}...", identifier);
    let device = Device::connect(&identifier).await?;
    let mut stream = device.subscribe_readings().await?;
    println!("Subscribed. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            item = stream.next() => match item {
                Some(Ok(reading)) => println!(
                    "{} °C | {} % | {} lx | fertility {} %",
                    reading.temperature, reading.humidity, reading.luminosity, reading.fertility
                ),
                Some(Err(e)) => eprintln!("Bad notification: {}", e),
                None => break,
            },
        }
    }

    stream.close().await;
    device.disconnect().await?;
    Ok(())
}
