use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::sampling::{history, Target};
use crate::stream::{publisher, WireFormat};

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "blip";
/// `BLIP__SAMPLER__INTERVAL_MS=500` and friends
pub const ENV_PREFIX: &str = "BLIP";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub interval_ms: u64,
    pub history_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            history_capacity: history::DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    #[default]
    Http,
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub mode: ProbeMode,
    /// Upper bound for one probe; keep it below the interval
    pub timeout_ms: u64,
    /// Treat non-2xx responses as failures
    pub fail_on_http_error: bool,
    /// Simulated mode only
    pub seed: u64,
    pub failure_rate: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            mode: ProbeMode::Http,
            timeout_ms: 900,
            fail_on_http_error: false,
            seed: 42,
            failure_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub format: WireFormat,
    /// Frames a viewer may lag before it skips
    pub buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::Nested,
            buffer: publisher::DEFAULT_BUFFER,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub enabled: bool,
    /// Chart size in terminal cells
    pub width: u16,
    pub height: u16,
    pub refresh_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            width: 100,
            height: 30,
            refresh_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub save_logs: bool,
    pub log_file_path: String,
    pub rewrite_last_logs: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            save_logs: false,
            log_file_path: "logs/blip.log".into(),
            rewrite_last_logs: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sampler: SamplerConfig,
    pub probe: ProbeConfig,
    pub stream: StreamConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
    pub targets: Vec<Target>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            sampler: SamplerConfig::default(),
            probe: ProbeConfig::default(),
            stream: StreamConfig::default(),
            display: DisplayConfig::default(),
            logging: LoggingConfig::default(),
            targets: default_targets(),
        }
    }
}

fn default_targets() -> Vec<Target> {
    vec![
        Target::new("gstatic", "https://www.gstatic.com/generate_204"),
        Target::new("apenwarr", "https://apenwarr.ca"),
    ]
}

impl AppConfig {
    /// Defaults, then the TOML file (`path`, or an optional `blip.toml`),
    /// then `BLIP__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Reject settings the sampler cannot run with. Called once at
    /// startup, after CLI overrides are applied.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.id.trim().is_empty() {
                return Err(ConfigError::EmptyTargetId);
            }
            if !seen.insert(target.id.as_str()) {
                return Err(ConfigError::DuplicateTarget(target.id.clone()));
            }
            let url = reqwest::Url::parse(&target.url).map_err(|e| ConfigError::InvalidUrl {
                id: target.id.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidUrl {
                    id: target.id.clone(),
                    reason: format!("unsupported scheme \"{}\"", url.scheme()),
                });
            }
        }

        if self.sampler.interval_ms == 0 {
            return Err(invalid("sampler.interval_ms", "must be at least 1"));
        }
        if self.sampler.history_capacity == 0 {
            return Err(invalid("sampler.history_capacity", "must be at least 1"));
        }
        if self.sampler.history_capacity > history::MAX_CAPACITY {
            return Err(invalid("sampler.history_capacity", "must be at most 86400"));
        }
        if self.probe.timeout_ms == 0 {
            return Err(invalid("probe.timeout_ms", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.probe.failure_rate) {
            return Err(invalid("probe.failure_rate", "must be between 0 and 1"));
        }
        if self.stream.buffer == 0 {
            return Err(invalid("stream.buffer", "must be at least 1"));
        }
        if self.stream.buffer > publisher::MAX_BUFFER {
            return Err(invalid("stream.buffer", "must be at most 4096"));
        }
        if self.display.enabled
            && (self.display.width < crate::chart::terminal::MIN_WIDTH
                || self.display.height < crate::chart::terminal::MIN_HEIGHT)
        {
            return Err(invalid("display", "must be at least 20x8 cells"));
        }
        if self.display.refresh_ms == 0 {
            return Err(invalid("display.refresh_ms", "must be at least 1"));
        }
        Ok(())
    }

    /// True when a hung probe could stall a round past the next tick.
    pub fn timeout_exceeds_interval(&self) -> bool {
        self.probe.timeout_ms >= self.sampler.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sampler.interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe.timeout_ms)
    }

    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.display.refresh_ms)
    }
}

fn invalid(field: &'static str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.targets.len(), 2);
        assert_eq!(cfg.sampler.history_capacity, 60);
        assert_eq!(cfg.interval(), Duration::from_secs(1));
        assert!(!cfg.timeout_exceeds_interval());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[sampler]
interval_ms = 250

[stream]
format = "flat"

[[targets]]
id = "local"
url = "http://127.0.0.1:8080/health"
"#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.sampler.interval_ms, 250);
        assert_eq!(cfg.sampler.history_capacity, 60);
        assert_eq!(cfg.stream.format, WireFormat::Flat);
        assert_eq!(cfg.targets, vec![Target::new("local", "http://127.0.0.1:8080/health")]);
        cfg.validate().unwrap();
    }

    #[test]
    fn rejects_duplicate_ids() {
        let mut cfg = AppConfig::default();
        cfg.targets = vec![Target::new("a", "http://a"), Target::new("a", "http://b")];
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateTarget(id)) if id == "a"));
    }

    #[test]
    fn rejects_bad_urls_and_schemes() {
        let mut cfg = AppConfig::default();
        cfg.targets = vec![Target::new("a", "not a url")];
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidUrl { .. })));

        cfg.targets = vec![Target::new("a", "ftp://example.com")];
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn rejects_empty_targets_and_zero_capacity() {
        let mut cfg = AppConfig::default();
        cfg.targets.clear();
        assert!(matches!(cfg.validate(), Err(ConfigError::NoTargets)));

        let mut cfg = AppConfig::default();
        cfg.sampler.history_capacity = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "sampler.history_capacity", .. })
        ));
    }

    #[test]
    fn rejects_oversized_capacity_and_buffer() {
        let mut cfg = AppConfig::default();
        cfg.sampler.history_capacity = history::MAX_CAPACITY + 1;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "sampler.history_capacity", .. })
        ));

        let mut cfg = AppConfig::default();
        cfg.stream.buffer = usize::MAX;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "stream.buffer", .. })
        ));

        cfg.stream.buffer = publisher::MAX_BUFFER;
        cfg.validate().unwrap();
    }
}
