// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Layered configuration for the `sim-link` application.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use strobe_engine::types::SimError;
use strobe_link::pause::PauseSchedule;
use strobe_link::source::SourceConfig;
use strobe_track::builder::{TrackerConfig, TrackersConfig};

/// Prefix for environment variables that override settings.
pub const ENV_PREFIX: &str = "STROBE_";

/// What sits between the source and the sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dut {
    /// The source drives the sink directly.
    Direct,
    /// A two-entry skid buffer.
    Skid,
}

/// Command-line arguments.
///
/// Every setting is optional so that only those given override the other
/// configuration sources.
#[derive(Debug, Default, Parser, Serialize)]
#[command(about = "LocalLink source/sink evaluation application")]
pub struct Cli {
    /// Additional TOML configuration file.
    #[arg(long)]
    #[serde(skip)]
    pub conf_file: Option<PathBuf>,

    /// Number of frames to send.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frames: Option<usize>,

    /// Minimum frame length in bytes.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,

    /// Maximum frame length in bytes.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,

    /// Seed for the frame contents and pause patterns.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Device between the source and the sink.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dut: Option<Dut>,

    /// Start each frame on the edge the previous one ends.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zero_gap: Option<bool>,

    /// Probability of pausing the source on each edge.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_pause_probability: Option<f64>,

    /// Probability of pausing the sink on each edge.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink_pause_probability: Option<f64>,

    /// Number of edges reset is held for.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_ticks: Option<u64>,

    /// Edges to wait for each frame before giving up.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ticks: Option<u64>,

    /// Enable logging to the console.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<bool>,

    /// Level of log message to display.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout_level: Option<log::Level>,

    /// Set a regular expression for which entites should have logging level set
    /// to `--stdout-level`. Others will have level set to `Error`.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout_filter_regex: Option<String>,

    /// Write a text log to this file.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    /// Level of log message written to `--log-file`.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<log::Level>,
}

/// The merged configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    pub frames: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub seed: u64,
    pub dut: Dut,
    pub zero_gap: bool,
    pub source_pause_probability: f64,
    pub sink_pause_probability: f64,
    pub reset_ticks: u64,
    pub timeout_ticks: u64,
    pub stdout: bool,
    pub stdout_level: log::Level,
    pub stdout_filter_regex: String,
    pub log_file: Option<String>,
    pub log_level: log::Level,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frames: 100,
            min_len: 1,
            max_len: 64,
            seed: 1,
            dut: Dut::Direct,
            zero_gap: true,
            source_pause_probability: 0.0,
            sink_pause_probability: 0.0,
            reset_ticks: 2,
            timeout_ticks: 10_000,
            stdout: true,
            stdout_level: log::Level::Info,
            stdout_filter_regex: String::new(),
            log_file: None,
            log_level: log::Level::Debug,
        }
    }
}

impl SimConfig {
    /// Merge the defaults, the conf file, the environment and `cli`.
    #[must_use]
    pub fn figment(cli: &Cli) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(SimConfig::default()));
        if let Some(conf_file) = &cli.conf_file {
            figment = figment.merge(Toml::file(conf_file));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(cli))
    }

    pub fn load(cli: &Cli) -> Result<Self, SimError> {
        Self::figment(cli)
            .extract()
            .map_err(|e| SimError(format!("invalid configuration: {e}")))
    }

    #[must_use]
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig {
            zero_gap: self.zero_gap,
        }
    }

    #[must_use]
    pub fn source_pause(&self) -> PauseSchedule {
        pause_schedule(self.source_pause_probability, self.seed.wrapping_add(1))
    }

    #[must_use]
    pub fn sink_pause(&self) -> PauseSchedule {
        pause_schedule(self.sink_pause_probability, self.seed.wrapping_add(2))
    }

    #[must_use]
    pub fn trackers(&self) -> TrackersConfig<'_> {
        TrackersConfig {
            stdout: TrackerConfig {
                enable: self.stdout,
                level: self.stdout_level,
                filter_regex: &self.stdout_filter_regex,
                file: None,
            },
            log_file: TrackerConfig {
                enable: self.log_file.is_some(),
                level: self.log_level,
                filter_regex: "",
                file: self.log_file.as_deref(),
            },
        }
    }
}

fn pause_schedule(probability: f64, seed: u64) -> PauseSchedule {
    if probability > 0.0 {
        PauseSchedule::Random { probability, seed }
    } else {
        PauseSchedule::Never
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("sim-link").chain(args.iter().copied()))
    }

    #[test]
    fn defaults() {
        let config = SimConfig::load(&cli(&[])).unwrap();
        assert_eq!(config.frames, 100);
        assert_eq!(config.dut, Dut::Direct);
        assert_eq!(config.source_pause(), PauseSchedule::Never);
        assert!(config.source_config().zero_gap);
    }

    #[test]
    fn command_line_overrides() {
        let config = SimConfig::load(&cli(&[
            "--frames",
            "7",
            "--dut",
            "skid",
            "--sink-pause-probability",
            "0.5",
            "--zero-gap",
            "false",
        ]))
        .unwrap();
        assert_eq!(config.frames, 7);
        assert_eq!(config.dut, Dut::Skid);
        assert!(!config.zero_gap);
        assert_eq!(
            config.sink_pause(),
            PauseSchedule::Random {
                probability: 0.5,
                seed: 3
            }
        );
    }

    #[test]
    fn conf_file_below_command_line() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "frames = 12\nmax_len = 9\ndut = \"skid\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = SimConfig::load(&cli(&["--conf-file", &path, "--frames", "3"])).unwrap();
        assert_eq!(config.frames, 3);
        assert_eq!(config.max_len, 9);
        assert_eq!(config.dut, Dut::Skid);
        assert_eq!(config.min_len, 1);
    }

    #[test]
    fn bad_conf_value() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "dut = \"wire\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let result = SimConfig::load(&cli(&["--conf-file", &path]));
        assert!(result.is_err());
    }
}
