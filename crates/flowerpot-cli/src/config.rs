//! Configuration file management.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flowerpot_core::{ThresholdConfig, Thresholds};
use flowerpot_types::SoilCalibration;
use serde::{Deserialize, Serialize};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device address
    #[serde(default)]
    pub device: Option<String>,

    /// Default output format
    #[serde(default)]
    pub format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Connection timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Display names (nickname -> device address)
    #[serde(default)]
    pub names: BTreeMap<String, String>,

    /// Last successfully connected device (auto-updated)
    #[serde(default)]
    pub last_device: Option<String>,

    /// Name of the last connected device (for display)
    #[serde(default)]
    pub last_device_name: Option<String>,

    /// Plant-health bands per metric
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Soil sensor calibration points
    #[serde(default)]
    pub calibration: SoilCalibration,
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowerpot")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from `path`, falling back to defaults with a warning
    pub fn load_from(path: &Path) -> Self {
        match Self::try_load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load config from `path`; a missing file gives defaults, a broken one an error.
    fn try_load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Read-modify-write the config file at `path`.
    ///
    /// A file that exists but cannot be parsed is left untouched and the
    /// edit is not applied.
    pub fn update_at<R>(path: &Path, edit: impl FnOnce(&mut Config) -> Result<R>) -> Result<R> {
        let mut config = Self::try_load_from(path)
            .context("Refusing to overwrite a config file that does not parse")?;
        let result = edit(&mut config)?;
        config.save_to(path)?;
        Ok(result)
    }

    /// [`Config::update_at`] on the default path
    pub fn update(edit: impl FnOnce(&mut Config) -> Result<()>) -> Result<()> {
        Self::update_at(&Self::path(), edit)
    }

    /// Save config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Validated threshold evaluator
    pub fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::try_new(self.thresholds.clone())
            .with_context(|| format!("Invalid [thresholds] in {}", Self::path().display()))
    }

    /// Validated soil calibration
    pub fn soil_calibration(&self) -> Result<SoilCalibration> {
        self.calibration
            .validate()
            .with_context(|| format!("Invalid [calibration] in {}", Self::path().display()))?;
        Ok(self.calibration)
    }

    /// Display name for a device address, if one is configured
    pub fn name_for(&self, address: &str) -> Option<&str> {
        let address = flowerpot_core::normalize_address(address);
        self.names
            .iter()
            .find(|(_, v)| flowerpot_core::normalize_address(v) == address)
            .map(|(k, _)| k.as_str())
    }
}

/// Where the device identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSource {
    /// `--device` or `FLOWERPOT_DEVICE`
    Explicit,
    /// `device` in the config file
    Default,
    /// `last_device` in the config file
    Last,
}

/// Resolve a display name to its device address, or return the original if not a name.
pub fn resolve_name(device: &str, config: &Config) -> String {
    config
        .names
        .get(device)
        .cloned()
        .unwrap_or_else(|| device.to_string())
}

/// Pick the device identifier and where it came from.
///
/// Order: explicit argument (names resolved), configured default, last connected.
pub fn get_device_source(
    device: Option<&str>,
    config: &Config,
) -> Option<(String, DeviceSource)> {
    if let Some(d) = device {
        Some((resolve_name(d, config), DeviceSource::Explicit))
    } else if let Some(d) = &config.device {
        Some((resolve_name(d, config), DeviceSource::Default))
    } else {
        config
            .last_device
            .clone()
            .map(|d| (d, DeviceSource::Last))
    }
}

/// Print device source feedback (e.g., "Using last connected device: ...").
pub fn print_device_source_feedback(device: &str, source: DeviceSource, quiet: bool) {
    if quiet {
        return;
    }
    match source {
        DeviceSource::Default => eprintln!("Using default device: {}", device),
        DeviceSource::Last => eprintln!("Using last connected device: {}", device),
        DeviceSource::Explicit => {}
    }
}

/// Update the last connected device in config.
/// This is called after a successful connection.
pub fn update_last_device(identifier: &str, name: Option<&str>) -> Result<()> {
    update_last_device_at(&Config::path(), identifier, name)
}

fn update_last_device_at(path: &Path, identifier: &str, name: Option<&str>) -> Result<()> {
    Config::update_at(path, |config| {
        config.last_device = Some(identifier.to_string());
        config.last_device_name = name.map(|n| n.to_string());
        Ok(())
    })
}

/// Resolve timeout: use provided value, fall back to config, then default
pub fn resolve_timeout(cmd_timeout: u64, config: &Config, default: u64) -> u64 {
    if cmd_timeout != default {
        cmd_timeout
    } else {
        config.timeout.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowerpot_core::Band;

    fn config_with_names() -> Config {
        let mut config = Config::default();
        config
            .names
            .insert("basil".to_string(), "AA:BB:CC:DD:EE:FF".to_string());
        config
    }

    #[test]
    fn test_resolve_name_found() {
        let config = config_with_names();
        assert_eq!(resolve_name("basil", &config), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_resolve_name_not_found() {
        let config = config_with_names();
        assert_eq!(resolve_name("fern", &config), "fern");
    }

    #[test]
    fn test_get_device_source_explicit_resolves_name() {
        let config = Config {
            device: Some("default-device".to_string()),
            ..config_with_names()
        };
        let result = get_device_source(Some("basil"), &config);
        assert_eq!(
            result,
            Some(("AA:BB:CC:DD:EE:FF".to_string(), DeviceSource::Explicit))
        );
    }

    #[test]
    fn test_get_device_source_prefers_default_over_last() {
        let config = Config {
            device: Some("default-device".to_string()),
            last_device: Some("last-device".to_string()),
            ..Default::default()
        };
        let result = get_device_source(None, &config);
        assert_eq!(
            result,
            Some(("default-device".to_string(), DeviceSource::Default))
        );
    }

    #[test]
    fn test_get_device_source_from_last() {
        let config = Config {
            last_device: Some("last-device".to_string()),
            ..Default::default()
        };
        let result = get_device_source(None, &config);
        assert_eq!(result, Some(("last-device".to_string(), DeviceSource::Last)));
    }

    #[test]
    fn test_get_device_source_none() {
        assert_eq!(get_device_source(None, &Config::default()), None);
    }

    #[test]
    fn test_resolve_timeout() {
        let config = Config {
            timeout: Some(45),
            ..Default::default()
        };
        assert_eq!(resolve_timeout(60, &config, 15), 60);
        assert_eq!(resolve_timeout(15, &config, 15), 45);
        assert_eq!(resolve_timeout(15, &Config::default(), 15), 15);
    }

    #[test]
    fn test_name_for_ignores_separators_and_case() {
        let config = config_with_names();
        assert_eq!(config.name_for("aa-bb-cc-dd-ee-ff"), Some("basil"));
        assert_eq!(config.name_for("11:22:33:44:55:66"), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = config_with_names();
        config.device = Some("basil".to_string());
        config.thresholds.temperature = Band::new(18, 28);
        config.calibration = SoilCalibration::new(3000, 1200).unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("missing.toml"));
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_load_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "device = [not toml").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_update_keeps_unparsable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let original = "format = json\n\n[names]\nbasil = \"AA:BB:CC:DD:EE:FF\"\n";
        fs::write(&path, original).unwrap();

        let err = update_last_device_at(&path, "11:22:33:44:55:66", Some("flowerpot")).unwrap_err();
        assert!(format!("{:#}", err).contains("does not parse"));
        assert_eq!(fs::read_to_string(&path).unwrap(), original);

        let mut called = false;
        let result = Config::update_at(&path, |_| {
            called = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!called);
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_update_last_device_keeps_other_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        config_with_names().save_to(&path).unwrap();

        update_last_device_at(&path, "11:22:33:44:55:66", None).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.last_device.as_deref(), Some("11:22:33:44:55:66"));
        assert_eq!(loaded.names, config_with_names().names);
    }

    #[test]
    fn test_update_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowerpot").join("config.toml");

        Config::update_at(&path, |config| {
            config.device = Some("basil".to_string());
            Ok(())
        })
        .unwrap();

        assert_eq!(Config::load_from(&path).device.as_deref(), Some("basil"));
    }

    #[test]
    fn test_partial_sections_use_defaults() {
        let toml = r#"
            device = "basil"

            [thresholds.luminosity]
            ok = 200
            high = 3000

            [calibration]
            in_air = 3200
            in_water = 1400
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.thresholds.luminosity, Band::new(200, 3000));
        assert_eq!(config.thresholds.temperature, Band::new(21, 26));
        assert_eq!(config.calibration.in_air, 3200);
        assert!(config.thresholds().is_ok());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = Config::default();
        config.thresholds.humidity = Band::new(90, 10);
        assert!(config.thresholds().is_err());
    }

    #[test]
    fn test_invalid_calibration_rejected() {
        let mut config = Config::default();
        config.calibration.in_air = 1000;
        config.calibration.in_water = 2000;
        assert!(config.soil_calibration().is_err());
    }
}
