use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use config::File;
use lp_affinity::AffinityPolicy;
use lp_affinity::CoreAllotment;
use lp_log::DEFAULT_POLL_INTERVAL;
use serde::Deserialize;

/// Config file read when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "loadpark.toml";

/// Environment knob overriding the resting core count
pub const RESTING_CORES_ENV: &str = "LOADPARK_RESTING_CORES";

/// Directory for the watcher's own log files
pub const LOG_DIR: &str = "./logs";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoadparkConfig {
    /// Executable names of the game client, matched case-insensitively
    pub process_names: Vec<String>,
    /// Explicit client log path, skips deriving it from the game's working directory
    pub log_file: Option<PathBuf>,
    /// Delay between read attempts at the end of the log
    pub poll_interval_ms: u64,
    pub policy: AffinityPolicy,
}

impl Default for LoadparkConfig {
    fn default() -> Self {
        Self {
            process_names: vec!["PathOfExileSteam.exe".to_string(), "PathOfExile.exe".to_string(), "PathOfExile_x64.exe".to_string()],
            log_file: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            policy: AffinityPolicy::default(),
        }
    }
}

impl LoadparkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<LoadparkConfig, ConfigError> {
    let config = Config::builder().add_source(File::from(path.as_ref())).build()?;

    config.try_deserialize()
}

/// Load config with fallback to default
pub fn load_config_or_default(path: &str) -> LoadparkConfig {
    if !Path::new(path).exists() {
        tracing::info!("No config file at {path}, using defaults");
        return LoadparkConfig::default();
    }

    match load_config(path) {
        Ok(config) => {
            tracing::info!("Loaded config from {path}");
            config
        }
        Err(err) => {
            tracing::warn!("Failed to load config from {}: {}. Using defaults.", path, err);
            LoadparkConfig::default()
        }
    }
}

/// Validate a raw resting core count against the usable cores
///
/// Absent values are silently ignored; anything that is not an integer in
/// `1..=usable_cores` is ignored with a warning.
pub fn resting_override(raw: Option<&str>, usable_cores: usize) -> Option<CoreAllotment> {
    let raw = raw?.trim();

    match raw.parse::<usize>() {
        Ok(count) if (1..=usable_cores).contains(&count) => Some(CoreAllotment::Count(count)),
        _ => {
            tracing::warn!("Ignoring {RESTING_CORES_ENV}={raw:?}: expected an integer between 1 and {usable_cores}");
            None
        }
    }
}

/// [`resting_override`] read from the environment
pub fn resting_override_from_env(usable_cores: usize) -> Option<CoreAllotment> {
    resting_override(std::env::var(RESTING_CORES_ENV).ok().as_deref(), usable_cores)
}

#[cfg(test)]
mod tests {
    use lp_affinity::ParkSide;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoadparkConfig::default();

        assert!(config.process_names.iter().any(|name| name == "PathOfExileSteam.exe"));
        assert_eq!(config.poll_interval(), DEFAULT_POLL_INTERVAL);
        assert_eq!(config.policy, AffinityPolicy::default());
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loadpark.toml");
        std::fs::write(
            &path,
            r#"
process_names = ["PathOfExile_KG.exe"]
poll_interval_ms = 50

[policy]
park_side = "leading"
resting = { mode = "all" }
loading = { mode = "reserve", value = 4 }
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.process_names, vec!["PathOfExile_KG.exe".to_string()]);
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
        assert_eq!(config.policy.park_side, ParkSide::Leading);
        assert_eq!(config.policy.resting, CoreAllotment::All);
        assert_eq!(config.policy.loading, CoreAllotment::Reserve(4));
    }

    #[test]
    fn test_partial_policy_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loadpark.toml");
        std::fs::write(&path, "[policy]\nresting = { mode = \"percent\", value = 90 }\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.policy.resting, CoreAllotment::Percent(90));
        assert_eq!(config.policy.loading, CoreAllotment::All);
        assert_eq!(config.process_names, LoadparkConfig::default().process_names);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config_or_default(path.to_str().unwrap());
        assert_eq!(config.poll_interval_ms, LoadparkConfig::default().poll_interval_ms);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "poll_interval_ms = \"soon\"\n").unwrap();

        let config = load_config_or_default(path.to_str().unwrap());
        assert_eq!(config.poll_interval_ms, LoadparkConfig::default().poll_interval_ms);
    }

    #[test]
    fn test_zero_poll_interval_is_bumped() {
        let config = LoadparkConfig { poll_interval_ms: 0, ..LoadparkConfig::default() };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_resting_override() {
        assert_eq!(resting_override(None, 8), None);
        assert_eq!(resting_override(Some("6"), 8), Some(CoreAllotment::Count(6)));
        assert_eq!(resting_override(Some(" 8 "), 8), Some(CoreAllotment::Count(8)));
        assert_eq!(resting_override(Some("9"), 8), None);
        assert_eq!(resting_override(Some("0"), 8), None);
        assert_eq!(resting_override(Some("-2"), 8), None);
        assert_eq!(resting_override(Some("six"), 8), None);
        assert_eq!(resting_override(Some(""), 8), None);
    }
}
