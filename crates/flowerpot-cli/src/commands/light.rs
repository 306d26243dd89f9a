//! Light command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use flowerpot_core::{FlowerpotDevice, LightState};

use crate::config::Config;
use crate::style;
use crate::util::{connect_device_with_progress, require_device_interactive};

pub async fn cmd_light(
    device: Option<String>,
    timeout: Duration,
    on: bool,
    quiet: bool,
    no_color: bool,
    config: &Config,
) -> Result<()> {
    let identifier = require_device_interactive(device, config, quiet).await?;
    let device =
        connect_device_with_progress(&identifier, timeout, !quiet, config.calibration).await?;

    let result = set_light_with(&device, on).await;
    device.disconnect().await.ok();
    let state = result?;

    if !quiet {
        println!(
            "{}",
            style::format_success(&format!("Light switched {}", state), no_color)
        );
    }
    Ok(())
}

/// Write the light command and report the state that was requested.
pub async fn set_light_with<D: FlowerpotDevice>(device: &D, on: bool) -> Result<LightState> {
    let state = LightState::from(on);
    device
        .set_light(on)
        .await
        .with_context(|| format!("Failed to switch light {}", state))?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowerpot_core::MockDeviceBuilder;

    #[tokio::test]
    async fn test_set_light_writes_command() {
        let device = MockDeviceBuilder::new().build();

        assert_eq!(set_light_with(&device, true).await.unwrap(), LightState::On);
        assert_eq!(set_light_with(&device, false).await.unwrap(), LightState::Off);

        assert_eq!(
            device.light_writes().await,
            vec![[0xFF, 0x00], [0x00, 0x00]]
        );
        assert_eq!(device.light_state().await, LightState::Off);
    }

    #[tokio::test]
    async fn test_set_light_failure_has_context() {
        let device = MockDeviceBuilder::new().build();
        device.set_should_fail(true, Some("radio busy")).await;

        let err = set_light_with(&device, true).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to switch light on");
        assert!(format!("{:#}", err).contains("radio busy"));
    }
}
