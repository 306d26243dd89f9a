//! Plant-health thresholds and classification.
//!
//! Each metric has a band `{ ok, high }`: values below `ok` are
//! [`Level::Low`], values from `ok` up to (but excluding) `high` are
//! [`Level::Ok`], and anything at or above `high` is [`Level::High`]. A plant is
//! [`Verdict::Healthy`] when at least three of the four metrics are OK.
//!
//! # Example
//!
//! ```
//! use flowerpot_core::{Level, Metric, Thresholds, Verdict};
//! use flowerpot_types::SensorReading;
//!
//! let thresholds = Thresholds::default();
//! assert_eq!(thresholds.classify(Metric::Temperature, 22), Level::Ok);
//! assert_eq!(thresholds.classify(Metric::Temperature, 30), Level::High);
//!
//! let reading = SensorReading {
//!     temperature: 22,
//!     humidity: 70,
//!     luminosity: 500,
//!     fertility: 90,
//!     ..Default::default()
//! };
//! let assessment = thresholds.evaluate(&reading);
//! assert_eq!(assessment.verdict, Verdict::Healthy);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use flowerpot_types::{SensorReading, round_half_up};

use crate::error::{Error, Result};

/// Classification of a single metric against its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// Below the OK threshold.
    Low,
    /// Within the band.
    Ok,
    /// At or above the high threshold.
    High,
}

/// Aggregate plant status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Healthy,
    Unhealthy,
}

impl Verdict {
    /// Minimum number of OK metrics for a healthy plant.
    pub const HEALTHY_MIN_OK: usize = 3;

    /// Majority vote over the four metric levels.
    pub fn from_levels(levels: [Level; 4]) -> Self {
        let ok = levels.iter().filter(|l| **l == Level::Ok).count();
        if ok >= Self::HEALTHY_MIN_OK {
            Verdict::Healthy
        } else {
            Verdict::Unhealthy
        }
    }

    pub fn is_healthy(self) -> bool {
        self == Verdict::Healthy
    }
}

/// The four monitored metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    Humidity,
    Luminosity,
    Fertility,
}

impl Metric {
    /// All metrics in display order.
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Luminosity,
        Metric::Fertility,
    ];

    /// Unit suffix for display.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Luminosity => "lux",
            Metric::Fertility => "%",
        }
    }

    /// The metric's value in a reading.
    pub fn value_of(&self, reading: &SensorReading) -> i32 {
        match self {
            Metric::Temperature => i32::from(reading.temperature),
            Metric::Humidity => i32::from(reading.humidity),
            Metric::Luminosity => i32::from(reading.luminosity),
            Metric::Fertility => i32::from(reading.fertility),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Luminosity => "luminosity",
            Metric::Fertility => "fertility",
        };
        f.write_str(name)
    }
}

/// Lower and upper threshold for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    /// Values at or above this are at least OK.
    pub ok: i32,
    /// Values at or above this are High.
    pub high: i32,
}

impl Band {
    pub const fn new(ok: i32, high: i32) -> Self {
        Self { ok, high }
    }

    /// Classify a value against this band.
    pub fn classify(&self, value: i32) -> Level {
        if value < self.ok {
            Level::Low
        } else if value < self.high {
            Level::Ok
        } else {
            Level::High
        }
    }

    /// Progress-bar percentage: `100 * value / high`, clamped to 0..=100.
    pub fn progress(&self, value: i32) -> u8 {
        if self.high <= 0 {
            return 0;
        }
        let percent = 100.0 * f64::from(value) / f64::from(self.high);
        round_half_up(percent).clamp(0.0, 100.0) as u8
    }
}

/// Threshold bands for every metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Temperature band in °C.
    pub temperature: Band,
    /// Relative humidity band in %.
    pub humidity: Band,
    /// Light band in lux.
    pub luminosity: Band,
    /// Soil fertility band in %.
    pub fertility: Band,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            temperature: Band::new(21, 26),
            humidity: Band::new(65, 85),
            luminosity: Band::new(100, 2500),
            fertility: Band::new(45, 80),
        }
    }
}

impl ThresholdConfig {
    /// The band configured for `metric`.
    pub fn band(&self, metric: Metric) -> Band {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Luminosity => self.luminosity,
            Metric::Fertility => self.fertility,
        }
    }

    /// Check every band is ordered and has a positive upper bound.
    pub fn validate(&self) -> Result<()> {
        for metric in Metric::ALL {
            let band = self.band(metric);
            if band.ok > band.high {
                return Err(Error::invalid_config(format!(
                    "{metric} threshold ok ({}) must not exceed high ({})",
                    band.ok, band.high
                )));
            }
            if band.high <= 0 {
                return Err(Error::invalid_config(format!(
                    "{metric} threshold high ({}) must be positive",
                    band.high
                )));
            }
        }
        Ok(())
    }
}

/// Status of one metric within an [`Assessment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricStatus {
    pub metric: Metric,
    pub value: i32,
    pub level: Level,
    /// Percentage of the high threshold, 0-100.
    pub progress: u8,
}

/// Classification of a full reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    pub temperature: MetricStatus,
    pub humidity: MetricStatus,
    pub luminosity: MetricStatus,
    pub fertility: MetricStatus,
    pub verdict: Verdict,
}

impl Assessment {
    /// Per-metric statuses in display order.
    pub fn metrics(&self) -> [MetricStatus; 4] {
        [self.temperature, self.humidity, self.luminosity, self.fertility]
    }

    /// Number of metrics classified as OK.
    pub fn ok_count(&self) -> usize {
        self.metrics()
            .iter()
            .filter(|m| m.level == Level::Ok)
            .count()
    }
}

/// Threshold evaluator for sensor readings.
#[derive(Debug, Clone, Default)]
pub struct Thresholds {
    config: ThresholdConfig,
}

impl Thresholds {
    /// Create a new threshold evaluator with the given configuration.
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    /// Create an evaluator after validating the configuration.
    pub fn try_new(config: ThresholdConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Classify a single metric value.
    pub fn classify(&self, metric: Metric, value: i32) -> Level {
        self.config.band(metric).classify(value)
    }

    /// Progress-bar percentage for a single metric value.
    pub fn progress(&self, metric: Metric, value: i32) -> u8 {
        self.config.band(metric).progress(value)
    }

    fn status(&self, metric: Metric, reading: &SensorReading) -> MetricStatus {
        let value = metric.value_of(reading);
        MetricStatus {
            metric,
            value,
            level: self.classify(metric, value),
            progress: self.progress(metric, value),
        }
    }

    /// Classify every metric of a reading and compute the verdict.
    pub fn evaluate(&self, reading: &SensorReading) -> Assessment {
        let temperature = self.status(Metric::Temperature, reading);
        let humidity = self.status(Metric::Humidity, reading);
        let luminosity = self.status(Metric::Luminosity, reading);
        let fertility = self.status(Metric::Fertility, reading);
        let verdict = Verdict::from_levels([
            temperature.level,
            humidity.level,
            luminosity.level,
            fertility.level,
        ]);

        Assessment {
            temperature,
            humidity,
            luminosity,
            fertility,
            verdict,
        }
    }
}
