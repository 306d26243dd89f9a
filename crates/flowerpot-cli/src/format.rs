//! Output formatting utilities for text, JSON, and CSV output.

use std::collections::BTreeMap;

use anyhow::Result;
use flowerpot_core::{
    Assessment, CharacteristicInfo, DiscoveredDevice, Level, Metric, MetricStatus, Verdict,
};
use flowerpot_types::SensorReading;
use owo_colors::OwoColorize;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;

use crate::cli::StyleMode;
use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
    /// Visual styling mode.
    pub style: StyleMode,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            no_color: false,
            no_header: false,
            compact: false,
            style: StyleMode::Rich,
        }
    }
}

impl FormatOptions {
    pub fn new(no_color: bool, style: StyleMode) -> Self {
        // Plain mode never emits escape codes
        Self {
            no_color: no_color || style == StyleMode::Plain,
            style,
            ..Self::default()
        }
    }

    /// Check if rich styling is enabled.
    pub fn is_rich(&self) -> bool {
        self.style == StyleMode::Rich
    }

    /// Check if plain styling is enabled (no decorations).
    pub fn is_plain(&self) -> bool {
        self.style == StyleMode::Plain
    }

    /// Create with no_header option for CSV output.
    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }

    /// Unit suffix for a metric. Plain mode stays ASCII.
    pub fn unit(&self, metric: Metric) -> &'static str {
        match metric {
            Metric::Temperature if self.is_plain() => "C",
            other => other.unit(),
        }
    }

    /// Value with its unit, e.g. `22 °C` or `150 lux`.
    pub fn format_value(&self, metric: Metric, value: i32) -> String {
        match metric {
            Metric::Humidity | Metric::Fertility => format!("{}{}", value, self.unit(metric)),
            _ => format!("{} {}", value, self.unit(metric)),
        }
    }
}

/// Escape a string for CSV output.
/// Wraps the value in quotes if it contains commas, quotes, or newlines.
/// Double quotes are escaped by doubling them.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Display name of a metric.
pub fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Temperature => "Temperature",
        Metric::Humidity => "Humidity",
        Metric::Luminosity => "Light",
        Metric::Fertility => "Fertility",
    }
}

/// Machine-readable level, matching the JSON encoding.
fn level_key(level: Level) -> &'static str {
    match level {
        Level::Low => "low",
        Level::Ok => "ok",
        Level::High => "high",
    }
}

fn verdict_key(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Healthy => "healthy",
        Verdict::Unhealthy => "unhealthy",
    }
}

fn captured_at(reading: &SensorReading) -> Option<String> {
    reading.captured_at.and_then(|t| t.format(&Rfc3339).ok())
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "???".to_string())
}

// ============================================================================
// Scan formatting
// ============================================================================

/// A discovered device as shown in scan output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanEntry {
    pub name: Option<String>,
    pub address: String,
    pub identifier: String,
    pub rssi: Option<i16>,
    pub is_flowerpot: bool,
}

impl From<&DiscoveredDevice> for ScanEntry {
    fn from(device: &DiscoveredDevice) -> Self {
        Self {
            name: device.name.clone(),
            address: device.address.clone(),
            identifier: device.identifier.clone(),
            rssi: device.rssi,
            is_flowerpot: device.is_flowerpot,
        }
    }
}

fn display_name_for<'a>(
    entry: &ScanEntry,
    names: Option<&'a BTreeMap<String, String>>,
) -> Option<&'a str> {
    let id = flowerpot_core::normalize_address(&entry.identifier);
    names.and_then(|names| {
        names
            .iter()
            .find(|(_, v)| flowerpot_core::normalize_address(v) == id)
            .map(|(k, _)| k.as_str())
    })
}

pub fn format_scan_json(
    entries: &[ScanEntry],
    opts: &FormatOptions,
    names: Option<&BTreeMap<String, String>>,
) -> Result<String> {
    #[derive(Serialize)]
    struct ScanResult<'a> {
        count: usize,
        devices: Vec<DeviceJson<'a>>,
    }

    #[derive(Serialize)]
    struct DeviceJson<'a> {
        #[serde(flatten)]
        entry: &'a ScanEntry,
        #[serde(skip_serializing_if = "Option::is_none")]
        display_name: Option<&'a str>,
    }

    let result = ScanResult {
        count: entries.len(),
        devices: entries
            .iter()
            .map(|entry| DeviceJson {
                entry,
                display_name: display_name_for(entry, names),
            })
            .collect(),
    };

    opts.as_json(&result)
}

/// Format scan results as a table.
/// If `names` is provided, known devices get a display-name column.
#[must_use]
pub fn format_scan_text(
    entries: &[ScanEntry],
    opts: &FormatOptions,
    names: Option<&BTreeMap<String, String>>,
    show_tips: bool,
) -> String {
    use tabled::builder::Builder;

    if entries.is_empty() {
        return "No flowerpots found.\n".to_string();
    }

    let has_names = entries
        .iter()
        .any(|e| display_name_for(e, names).is_some());

    let header = if opts.is_rich() && !opts.no_color {
        format!(
            "Found {} device(s)\n\n",
            entries.len().to_string().green().bold()
        )
    } else {
        format!("Found {} device(s)\n\n", entries.len())
    };

    let mut builder = Builder::default();
    let mut columns = vec!["Name"];
    if has_names {
        columns.push("Display Name");
    }
    columns.extend(["Flowerpot", "Signal", "Identifier"]);
    builder.push_record(columns);

    for entry in entries {
        let name = entry.name.as_deref().unwrap_or("Unknown");
        let mut row = vec![if opts.no_color {
            name.to_string()
        } else {
            format!("{}", name.cyan())
        }];
        if has_names {
            row.push(display_name_for(entry, names).unwrap_or("-").to_string());
        }
        row.push(if entry.is_flowerpot { "yes" } else { "no" }.to_string());
        row.push(if opts.is_plain() {
            entry
                .rssi
                .map(|r| r.to_string())
                .unwrap_or_else(|| "N/A".to_string())
        } else {
            style::format_signal_bar(entry.rssi, opts.no_color)
        });
        row.push(entry.identifier.clone());
        builder.push_record(row);
    }

    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);

    let mut output = format!("{}{}\n", header, table);
    if show_tips && !opts.is_plain() {
        output.push_str(&format_scan_tips(opts.no_color));
    }
    output
}

/// Format helpful tips shown after scan results.
#[must_use]
pub fn format_scan_tips(no_color: bool) -> String {
    let tip_label = if no_color {
        "Tip:".to_string()
    } else {
        format!("{}", "Tip:".yellow().bold())
    };
    format!(
        "\n{} Use 'flowerpot name set <name> <identifier>' to save a display name\n     Use 'flowerpot pair' to remember the nearest flowerpot as default\n",
        tip_label
    )
}

#[must_use]
pub fn format_scan_csv(entries: &[ScanEntry], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "name,address,identifier,rssi,is_flowerpot\n".to_string()
    };
    for entry in entries {
        output.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_escape(entry.name.as_deref().unwrap_or("")),
            csv_escape(&entry.address),
            csv_escape(&entry.identifier),
            entry.rssi.map(|r| r.to_string()).unwrap_or_default(),
            entry.is_flowerpot
        ));
    }
    output
}

// ============================================================================
// Reading formatting
// ============================================================================

/// Format a reading and its assessment as text.
#[must_use]
pub fn format_reading_text(
    reading: &SensorReading,
    assessment: &Assessment,
    opts: &FormatOptions,
    device_name: Option<&str>,
) -> String {
    if opts.is_rich() {
        return format_reading_rich(reading, assessment, opts, device_name);
    }

    let mut output = String::new();
    for status in assessment.metrics() {
        output.push_str(&format!(
            "{:<12} {:>8}  {}\n",
            format!("{}:", metric_label(status.metric)),
            opts.format_value(status.metric, status.value),
            style::format_level_colored(status.level, opts.no_color)
        ));
    }
    output.push_str(&format!("{:<12} {:>8}\n", "Soil raw:", reading.soil_raw));
    output.push_str(&format!(
        "{:<12} {} ({}/4 OK)\n",
        "Plant:",
        style::format_verdict_colored(assessment.verdict, opts.no_color),
        assessment.ok_count()
    ));
    output
}

fn format_reading_rich(
    reading: &SensorReading,
    assessment: &Assessment,
    opts: &FormatOptions,
    device_name: Option<&str>,
) -> String {
    let mut output = String::new();

    let title = device_name.unwrap_or("Flowerpot");
    if opts.no_color {
        output.push_str(&format!("  {}\n", title));
        output.push_str(&format!("  {}\n\n", "─".repeat(title.chars().count())));
    } else {
        output.push_str(&format!("  {}\n", title.cyan().bold()));
        output.push_str(&format!(
            "  {}\n\n",
            "─".repeat(title.chars().count()).dimmed()
        ));
    }

    output.push_str(&format!(
        "  Plant Health: {} ({}/4 OK)\n\n",
        style::format_verdict_colored(assessment.verdict, opts.no_color),
        assessment.ok_count()
    ));

    let kv = |key: &str, value: &str| -> String {
        if opts.no_color {
            format!("  {:>11}:  {}\n", key, value)
        } else {
            format!("  {:>11}:  {}\n", key.dimmed(), value)
        }
    };

    for status in assessment.metrics() {
        output.push_str(&kv(metric_label(status.metric), &metric_cell(&status, opts)));
    }

    output.push('\n');
    output.push_str(&kv("Soil raw", &reading.soil_raw.to_string()));

    output
}

fn metric_cell(status: &MetricStatus, opts: &FormatOptions) -> String {
    format!(
        "{:<8} {} {}",
        opts.format_value(status.metric, status.value),
        style::format_progress_bar(status.progress, status.level, opts.no_color),
        style::format_level_colored(status.level, opts.no_color)
    )
}

#[must_use]
pub fn format_reading_csv(
    reading: &SensorReading,
    assessment: &Assessment,
    opts: &FormatOptions,
) -> String {
    let row = format!(
        "{},{},{},{},{},{},{},{},{},{}\n",
        reading.temperature,
        reading.humidity,
        reading.luminosity,
        reading.fertility,
        reading.soil_raw,
        level_key(assessment.temperature.level),
        level_key(assessment.humidity.level),
        level_key(assessment.luminosity.level),
        level_key(assessment.fertility.level),
        verdict_key(assessment.verdict)
    );
    if opts.no_header {
        row
    } else {
        format!("{}{}", reading_csv_columns(), row)
    }
}

fn reading_csv_columns() -> &'static str {
    "temperature_c,humidity,luminosity,fertility,soil_raw,\
     temperature_level,humidity_level,luminosity_level,fertility_level,verdict\n"
}

/// Format a reading as JSON, with per-metric levels and the verdict.
pub fn format_reading_json(
    reading: &SensorReading,
    assessment: &Assessment,
    opts: &FormatOptions,
    device: Option<&str>,
) -> Result<String> {
    #[derive(Serialize)]
    struct MetricJson {
        value: i32,
        unit: &'static str,
        level: Level,
        progress: u8,
    }

    #[derive(Serialize)]
    struct ReadingJson<'a> {
        #[serde(skip_serializing_if = "Option::is_none")]
        device: Option<&'a str>,
        temperature: MetricJson,
        humidity: MetricJson,
        luminosity: MetricJson,
        fertility: MetricJson,
        soil_raw: i16,
        verdict: Verdict,
        ok_count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        captured_at: Option<String>,
    }

    let metric = |status: MetricStatus| MetricJson {
        value: status.value,
        unit: status.metric.unit(),
        level: status.level,
        progress: status.progress,
    };

    let json = ReadingJson {
        device,
        temperature: metric(assessment.temperature),
        humidity: metric(assessment.humidity),
        luminosity: metric(assessment.luminosity),
        fertility: metric(assessment.fertility),
        soil_raw: reading.soil_raw,
        verdict: assessment.verdict,
        ok_count: assessment.ok_count(),
        captured_at: captured_at(reading),
    };

    opts.as_json(&json)
}

// ============================================================================
// Watch formatting
// ============================================================================

/// Format one line of `watch` output, with trends against the previous reading.
#[must_use]
pub fn format_watch_line(
    reading: &SensorReading,
    assessment: &Assessment,
    previous: Option<&SensorReading>,
    opts: &FormatOptions,
) -> String {
    use chrono::Local;

    let timestamp = Local::now().format("%H:%M:%S").to_string();
    let mut parts = vec![format!("[{}]", timestamp)];

    for status in assessment.metrics() {
        let trend = previous
            .map(|p| {
                style::trend_indicator(status.value, status.metric.value_of(p), opts.no_color)
            })
            .unwrap_or(" ");
        parts.push(format!(
            "{}{} {}",
            opts.format_value(status.metric, status.value),
            trend,
            style::format_level_colored(status.level, opts.no_color)
        ));
    }

    parts.push(style::format_verdict_colored(assessment.verdict, opts.no_color));
    parts.join("  ") + "\n"
}

/// Get the CSV header for watch output.
#[must_use]
pub fn format_watch_csv_header() -> String {
    format!("timestamp,{}", reading_csv_columns())
}

/// Format a reading as a CSV line for watch output (no header).
#[must_use]
pub fn format_watch_csv_line(reading: &SensorReading, assessment: &Assessment) -> String {
    let ts = captured_at(reading).unwrap_or_else(now_rfc3339);
    let opts = FormatOptions::default().with_no_header(true);
    format!("{},{}", ts, format_reading_csv(reading, assessment, &opts))
}

// ============================================================================
// Info formatting
// ============================================================================

/// What `info` reports about a connected device.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDetails {
    pub name: Option<String>,
    pub address: String,
    pub manufacturer: Option<String>,
    pub rssi: Option<i16>,
    pub characteristics: Vec<CharacteristicInfo>,
}

#[must_use]
pub fn format_info_text(details: &DeviceDetails, opts: &FormatOptions) -> String {
    use tabled::builder::Builder;

    let mut builder = Builder::default();
    builder.push_record(["Property", "Value"]);
    builder.push_record(["Name", details.name.as_deref().unwrap_or("Unknown")]);
    builder.push_record(["Address", &details.address]);
    builder.push_record([
        "Manufacturer",
        details.manufacturer.as_deref().unwrap_or("N/A"),
    ]);
    let signal = if opts.is_plain() {
        details
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string())
    } else {
        style::format_signal_bar(details.rssi, opts.no_color)
    };
    builder.push_record(["Signal", &signal]);

    let mut table = builder.build();
    style::apply_table_style(&mut table, opts.style);

    let mut output = format!(
        "{}\n{}\n",
        style::format_title("Device Information", opts.no_color),
        table
    );

    if !details.characteristics.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Service", "Characteristic", "Properties"]);
        for c in &details.characteristics {
            builder.push_record([
                c.service.to_string(),
                c.uuid.to_string(),
                c.properties_label(),
            ]);
        }
        let mut table = builder.build();
        style::apply_table_style(&mut table, opts.style);
        output.push_str(&format!(
            "\n{}\n{}\n",
            style::format_title("Characteristics", opts.no_color),
            table
        ));
    }

    output
}

pub fn format_info_json(details: &DeviceDetails, opts: &FormatOptions) -> Result<String> {
    opts.as_json(details)
}

#[must_use]
pub fn format_info_csv(details: &DeviceDetails, opts: &FormatOptions) -> String {
    let row = format!(
        "{},{},{},{},{}\n",
        csv_escape(details.name.as_deref().unwrap_or("")),
        csv_escape(&details.address),
        csv_escape(details.manufacturer.as_deref().unwrap_or("")),
        details.rssi.map(|r| r.to_string()).unwrap_or_default(),
        details.characteristics.len()
    );
    if opts.no_header {
        row
    } else {
        format!("name,address,manufacturer,rssi,characteristics\n{}", row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowerpot_core::Thresholds;
    use flowerpot_core::uuids::{READINGS, FLOWERPOT_SERVICE};

    fn reference_reading() -> SensorReading {
        SensorReading {
            temperature: 22,
            humidity: 60,
            luminosity: 150,
            soil_raw: 2000,
            fertility: 68,
            captured_at: None,
        }
    }

    fn plain() -> FormatOptions {
        FormatOptions::new(true, StyleMode::Plain)
    }

    fn entry(name: &str, identifier: &str, rssi: Option<i16>) -> ScanEntry {
        ScanEntry {
            name: Some(name.to_string()),
            address: identifier.to_string(),
            identifier: identifier.to_string(),
            rssi,
            is_flowerpot: true,
        }
    }

    // ========================================================================
    // FormatOptions tests
    // ========================================================================

    #[test]
    fn test_plain_style_disables_color() {
        let opts = FormatOptions::new(false, StyleMode::Plain);
        assert!(opts.no_color);
        assert!(opts.is_plain());
        assert!(!FormatOptions::new(false, StyleMode::Rich).no_color);
    }

    #[test]
    fn test_format_value_units() {
        let opts = FormatOptions::default();
        assert_eq!(opts.format_value(Metric::Temperature, 22), "22 °C");
        assert_eq!(plain().format_value(Metric::Temperature, 22), "22 C");
        assert_eq!(opts.format_value(Metric::Humidity, 60), "60%");
        assert_eq!(opts.format_value(Metric::Luminosity, 150), "150 lux");
    }

    #[test]
    fn test_as_json_compact() {
        let opts = FormatOptions::default().with_compact(true);
        assert_eq!(opts.as_json(&[1, 2]).unwrap(), "[1,2]\n");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("basil"), "basil");
        assert_eq!(csv_escape("a,b"), "\"a,b\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    // ========================================================================
    // Scan formatting tests
    // ========================================================================

    #[test]
    fn test_scan_text_empty() {
        assert_eq!(
            format_scan_text(&[], &plain(), None, true),
            "No flowerpots found.\n"
        );
    }

    #[test]
    fn test_scan_text_with_display_name() {
        let mut names = BTreeMap::new();
        names.insert("basil".to_string(), "aa:bb:cc:dd:ee:ff".to_string());
        let entries = [entry("flowerpot", "AA:BB:CC:DD:EE:FF", Some(-60))];

        let output = format_scan_text(&entries, &plain(), Some(&names), false);
        assert!(output.starts_with("Found 1 device(s)"));
        assert!(output.contains("Display Name"));
        assert!(output.contains("basil"));
        assert!(output.contains("-60"));
        assert!(!output.contains("Tip:"));
    }

    #[test]
    fn test_scan_csv() {
        let entries = [
            entry("flowerpot", "AA:BB:CC:DD:EE:FF", Some(-60)),
            ScanEntry {
                name: None,
                is_flowerpot: false,
                ..entry("", "11:22:33:44:55:66", None)
            },
        ];
        let csv = format_scan_csv(&entries, &FormatOptions::default());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "name,address,identifier,rssi,is_flowerpot");
        assert_eq!(
            lines[1],
            "flowerpot,AA:BB:CC:DD:EE:FF,AA:BB:CC:DD:EE:FF,-60,true"
        );
        assert_eq!(lines[2], ",11:22:33:44:55:66,11:22:33:44:55:66,,false");
    }

    #[test]
    fn test_scan_json() {
        let entries = [entry("flowerpot", "AA:BB:CC:DD:EE:FF", Some(-60))];
        let json = format_scan_json(&entries, &FormatOptions::default(), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["count"], 1);
        assert_eq!(value["devices"][0]["identifier"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(value["devices"][0]["is_flowerpot"], true);
        assert!(value["devices"][0].get("display_name").is_none());
    }

    // ========================================================================
    // Reading formatting tests
    // ========================================================================

    #[test]
    fn test_reading_text_plain() {
        let reading = reference_reading();
        let assessment = Thresholds::default().evaluate(&reading);
        let output = format_reading_text(&reading, &assessment, &plain(), None);

        assert!(output.contains("Temperature:"));
        assert!(output.contains("22 C"));
        assert!(output.contains("[Low]"));
        assert!(output.contains("Soil raw:"));
        assert!(output.contains("Healthy (3/4 OK)"));
    }

    #[test]
    fn test_reading_text_rich_has_bars() {
        let reading = reference_reading();
        let assessment = Thresholds::default().evaluate(&reading);
        let opts = FormatOptions::new(true, StyleMode::Rich);
        let output = format_reading_text(&reading, &assessment, &opts, Some("basil"));

        assert!(output.starts_with("  basil\n"));
        assert!(output.contains("Plant Health: Healthy"));
        assert!(output.contains("█"));
    }

    #[test]
    fn test_reading_json() {
        let reading = reference_reading();
        let assessment = Thresholds::default().evaluate(&reading);
        let json =
            format_reading_json(&reading, &assessment, &FormatOptions::default(), Some("basil"))
                .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["device"], "basil");
        assert_eq!(value["temperature"]["value"], 22);
        assert_eq!(value["temperature"]["level"], "ok");
        assert_eq!(value["humidity"]["level"], "low");
        assert_eq!(value["fertility"]["value"], 68);
        assert_eq!(value["soil_raw"], 2000);
        assert_eq!(value["verdict"], "healthy");
        assert_eq!(value["ok_count"], 3);
        assert!(value.get("captured_at").is_none());
    }

    #[test]
    fn test_reading_csv() {
        let reading = reference_reading();
        let assessment = Thresholds::default().evaluate(&reading);
        let csv = format_reading_csv(&reading, &assessment, &FormatOptions::default());
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("temperature_c,humidity"));
        assert_eq!(lines[1], "22,60,150,68,2000,ok,low,ok,ok,healthy");

        let no_header = FormatOptions::default().with_no_header(true);
        assert_eq!(
            format_reading_csv(&reading, &assessment, &no_header).lines().count(),
            1
        );
    }

    // ========================================================================
    // Watch formatting tests
    // ========================================================================

    #[test]
    fn test_watch_line_trends() {
        let previous = reference_reading();
        let reading = SensorReading {
            temperature: 23,
            humidity: 55,
            ..previous
        };
        let assessment = Thresholds::default().evaluate(&reading);
        let line = format_watch_line(&reading, &assessment, Some(&previous), &plain());

        assert!(line.contains("23 C^ [OK]"));
        assert!(line.contains("55%v [Low]"));
        assert!(line.contains("150 lux- [OK]"));
        assert!(line.trim_end().ends_with("Healthy"));
    }

    #[test]
    fn test_watch_csv_line_matches_header() {
        let reading = reference_reading();
        let assessment = Thresholds::default().evaluate(&reading);
        let header_cols = format_watch_csv_header().trim_end().split(',').count();
        let line = format_watch_csv_line(&reading, &assessment);
        assert_eq!(line.trim_end().split(',').count(), header_cols);
        assert!(line.ends_with("ok,low,ok,ok,healthy\n"));
    }

    // ========================================================================
    // Info formatting tests
    // ========================================================================

    fn details() -> DeviceDetails {
        DeviceDetails {
            name: Some("flowerpot".to_string()),
            address: "AA:BB:CC:DD:EE:FF".to_string(),
            manufacturer: Some("Acme, Inc.".to_string()),
            rssi: Some(-55),
            characteristics: vec![CharacteristicInfo {
                service: FLOWERPOT_SERVICE,
                uuid: READINGS,
                read: true,
                write: false,
                write_without_response: false,
                notify: true,
                indicate: false,
            }],
        }
    }

    #[test]
    fn test_info_text() {
        let output = format_info_text(&details(), &plain());
        assert!(output.contains("Device Information"));
        assert!(output.contains("-55 dBm"));
        assert!(output.contains("read+notify"));
        assert!(output.contains(&READINGS.to_string()));
    }

    #[test]
    fn test_info_csv_escapes_manufacturer() {
        let csv = format_info_csv(&details(), &FormatOptions::default());
        assert_eq!(
            csv,
            "name,address,manufacturer,rssi,characteristics\n\
             flowerpot,AA:BB:CC:DD:EE:FF,\"Acme, Inc.\",-55,1\n"
        );
    }

    #[test]
    fn test_info_json() {
        let json = format_info_json(&details(), &FormatOptions::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["manufacturer"], "Acme, Inc.");
        assert_eq!(value["characteristics"][0]["notify"], true);
    }
}
