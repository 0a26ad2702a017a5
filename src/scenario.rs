use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    engine::{Region, RegionBuilder, RunSettings},
    layout::Layout,
};

fn default_refresh_interval() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_ticks must be greater than zero")]
    ZeroMaxTicks,
    #[error("refresh_interval must be greater than zero")]
    ZeroRefreshInterval,
    #[error("refresh_interval {refresh_interval} exceeds max_ticks {max_ticks}")]
    RefreshExceedsMaxTicks { refresh_interval: u64, max_ticks: u64 },
    #[error("configuration is missing the {0} line")]
    MissingLine(&'static str),
    #[error("{field} must be a whole number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// A run configuration: which layout to simulate and for how long.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub region_file: PathBuf,
    pub max_ticks: u64,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: u64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Scenario {
    /// Parses the plain three-line format: region file, tick limit, refresh
    /// interval. Each line may carry a `Label:` prefix.
    pub fn parse_legacy(text: &str) -> Result<Self, ConfigError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(strip_label);
        let region_file = lines.next().ok_or(ConfigError::MissingLine("region file"))?;
        let max_ticks = parse_count(lines.next(), "max_ticks")?;
        let refresh_interval = parse_count(lines.next(), "refresh_interval")?;
        Ok(Self {
            name: None,
            region_file: PathBuf::from(region_file),
            max_ticks,
            refresh_interval,
            logging: LoggingConfig::default(),
        })
    }

    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.region_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "region".to_string())
        })
    }

    /// Validated settings, with optional command-line overrides applied.
    pub fn settings(
        &self,
        ticks: Option<u64>,
        refresh_interval: Option<u64>,
    ) -> Result<RunSettings, ConfigError> {
        RunSettings::new(
            ticks.unwrap_or(self.max_ticks),
            refresh_interval.unwrap_or(self.refresh_interval),
        )
    }

    pub fn load_layout(&self) -> Result<Layout> {
        Layout::load(&self.region_file)
    }

    pub fn build_region(&self, settings: RunSettings) -> Result<Region> {
        let layout = self.load_layout()?;
        Ok(RegionBuilder::new(&layout, settings)
            .name(self.display_name())
            .with_standard_systems()
            .build())
    }
}

fn strip_label(line: &str) -> &str {
    match line.split_once(':') {
        // Single letters are left alone so drive-letter paths survive.
        Some((label, value))
            if label.len() > 1 && label.chars().all(|c| c.is_alphabetic() || c == ' ') =>
        {
            value.trim()
        }
        _ => line,
    }
}

fn parse_count(line: Option<&str>, field: &'static str) -> Result<u64, ConfigError> {
    let value = line.ok_or(ConfigError::MissingLine(field))?;
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Loads YAML (`.yaml`/`.yml`) or the legacy text format. The region file
    /// path is resolved against the configuration file's directory.
    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let mut scenario: Scenario = if is_yaml {
            serde_yaml::from_str(&data)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Scenario::parse_legacy(&data)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        };
        if scenario.region_file.is_relative() {
            let dir = path.parent().unwrap_or(Path::new("."));
            scenario.region_file = dir.join(&scenario.region_file);
        }
        Ok(scenario)
    }
}
