use std::path::PathBuf;

use clap::Parser;

use crate::config::{AppConfig, ProbeMode};

/// Measure round-trip latency to a few endpoints and stream it live.
#[derive(Debug, Parser)]
#[command(name = "blip", version, about)]
pub struct Cli {
    /// TOML configuration file (default: ./blip.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address for the HTTP / WebSocket server
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Show the live chart in this terminal
    #[arg(short, long)]
    pub display: bool,

    /// Use simulated latencies instead of real HTTP probes
    #[arg(long)]
    pub simulate: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Command-line flags win over file and environment settings.
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(bind) = &self.bind {
            cfg.server.bind = bind.clone();
        }
        if self.display {
            cfg.display.enabled = true;
        }
        if self.simulate {
            cfg.probe.mode = ProbeMode::Simulated;
        }
        if let Some(level) = &self.log_level {
            cfg.logging.level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from(["blip", "--bind", "127.0.0.1:9000", "--simulate", "-d"]);
        let mut cfg = AppConfig::default();
        cli.apply(&mut cfg);
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert_eq!(cfg.probe.mode, ProbeMode::Simulated);
        assert!(cfg.display.enabled);
        assert_eq!(cfg.logging.level, "info");
    }
}
