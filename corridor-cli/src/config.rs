//! Configuration loading and parsing

use anyhow::{Context, Result};
use corridor_engine::{Availability, EngineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from a TOML file)
///
/// Every section is optional; an empty file runs the built-in demo mission.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub route: RouteConfig,
    #[serde(default)]
    pub authority: AuthorityConfig,
    #[serde(default)]
    pub roster: RosterConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Absent: built-in demo route. Present but empty: no positioning.
    pub waypoints: Option<Vec<Waypoint>>,
    #[serde(default = "default_samples_per_leg")]
    pub samples_per_leg: usize,
    #[serde(default = "default_speed")]
    pub speed_kmh: f64,
    /// Sampling interval
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_samples_per_leg() -> usize {
    4
}

fn default_speed() -> f64 {
    40.0
}

fn default_tick_ms() -> u64 {
    3000
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            waypoints: None,
            samples_per_leg: default_samples_per_leg(),
            speed_kmh: default_speed(),
            tick_ms: default_tick_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthorityMode {
    #[default]
    Online,
    Offline,
    Flaky,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorityConfig {
    #[serde(default)]
    pub mode: AuthorityMode,
    /// In flaky mode, every n-th request fails
    #[serde(default = "default_fail_every")]
    pub fail_every: u32,
    /// Subscribe to the push feed
    #[serde(default = "default_true")]
    pub push: bool,
}

fn default_fail_every() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            mode: AuthorityMode::Online,
            fail_every: default_fail_every(),
            push: true,
        }
    }
}

impl AuthorityConfig {
    pub fn availability(&self) -> Availability {
        match self.mode {
            AuthorityMode::Online => Availability::Online,
            AuthorityMode::Offline => Availability::Offline,
            AuthorityMode::Flaky => Availability::FailEvery(self.fail_every),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RosterConfig {
    /// JSON roster served by the decision service (default: demo roster)
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Default: stdout
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .engine
        .validate()
        .with_context(|| format!("Invalid [engine] section in {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corridor_engine::EstimateKind;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [engine]
            proximity_threshold_m = 250.0
            time_saved = { kind = "rush_hour" }

            [route]
            waypoints = [
                { lat = 12.9700, lng = 77.5930 },
                { lat = 12.9800, lng = 77.6000 },
            ]
            samples_per_leg = 10
            tick_ms = 0

            [authority]
            mode = "flaky"
            fail_every = 2

            [output]
            format = "json"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.engine.proximity_threshold_m, 250.0);
        assert_eq!(config.engine.time_saved, EstimateKind::RushHour { base_delay_min: 2.0 });
        assert_eq!(config.route.waypoints.as_ref().map(|w| w.len()), Some(2));
        assert_eq!(config.route.speed_kmh, 40.0);
        assert_eq!(config.authority.availability(), Availability::FailEvery(2));
        assert!(config.authority.push);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.route.waypoints.is_none());
        assert_eq!(config.route.tick_ms, 3000);
        assert_eq!(config.authority.mode, AuthorityMode::Online);
        assert_eq!(config.engine.proximity_threshold_m, 300.0);
        assert_eq!(config.output.format, OutputFormat::Txt);
    }

    #[test]
    fn test_load_config_rejects_bad_threshold() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nproximity_threshold_m = -5.0").unwrap();
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/corridor.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
