//! Example: Scanning for Flowerpots
//!
//! Discovers flowerpots in range over Bluetooth Low Energy. Pass `--all` to
//! list every BLE device instead.
//!
//! Run with: `cargo run --example scan_devices [-- --all]`

use flowerpot_core::scan::{self, ScanOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let all = std::env::args().any(|a| a == "--all");

    println!("Scanning for flowerpots...");
    println!();

    let options = ScanOptions::default()
        .duration_secs(10)
        .filter_flowerpot_only(!all);

    let devices = scan::scan_with_options(options).await?;

    if devices.is_empty() {
        println!("No flowerpots found.");
        println!();
        println!("Make sure:");
        println!("  - The flowerpot is powered on");
        println!("  - Bluetooth is enabled on this computer");
        println!("  - The device is within range");
    } else {
        println!("Found {} device(s):", devices.len());
        println!();

        for device in &devices {
            let name = device.name.as_deref().unwrap_or("Unknown");
            let rssi = device
                .rssi
                .map(|r| format!("{} dBm", r))
                .unwrap_or_else(|| "N/A".to_string());

            println!("  {}{}", name, if device.is_flowerpot { " *" } else { "" });
            println!("    Identifier: {}", device.identifier);
            println!("    RSSI: {}", rssi);
            println!();
        }
    }

    Ok(())
}
