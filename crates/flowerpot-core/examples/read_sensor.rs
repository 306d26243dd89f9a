//! Example: Reading and Classifying Sensor Values
//!
//! Connects to a flowerpot, reads the current values once and prints each
//! metric with its level plus the overall plant verdict.
//!
//! Run with: `cargo run --example read_sensor -- <DEVICE_ADDRESS>`

use std::env;

use flowerpot_core::{Device, Thresholds};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let identifier = if args.len() > 1 {
        &args[1]
    } else {
        eprintln!("Usage: {} <DEVICE_ADDRESS_OR_NAME>", args[0]);
        eprintln!();
        eprintln!("Example:");
        eprintln!("  {} AA:BB:CC:DD:EE:FF", args[0]);
        eprintln!("  {} flowerpot", args[0]);
        std::process::exit(1);
    };

    println!("Connecting to {}...", identifier);
    let device = Device::connect(identifier).await?;
    println!("Connected!");
    println!();

    let reading = device.read_current().await?;
    let assessment = Thresholds::default().evaluate(&reading);

    println!("Current Readings:");
    for status in assessment.metrics() {
        println!(
            "  {:<12} {:>5} {:<4} {:?} ({}%)",
            status.metric.to_string(),
            status.value,
            status.metric.unit(),
            status.level,
            status.progress
        );
    }
    println!("  Soil raw:    {}", reading.soil_raw);
    println!();
    println!("Plant is {:?}", assessment.verdict);

    device.disconnect().await?;
    println!();
    println!("Disconnected.");

    Ok(())
}
