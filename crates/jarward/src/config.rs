use std::path::{Path, PathBuf};
use std::time::Duration;

use pidward::StopPolicy;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::flags::FlagsConfig;

/// Environment variable overriding the supervisor home directory.
pub const HOME_ENV: &str = "JARWARD_HOME";
pub const CONFIG_FILE: &str = "jarward.toml";

// ── <home>/jarward.toml ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub runtime: RuntimeConfig,
	#[serde(default)]
	pub timing: TimingConfig,
	#[serde(default)]
	pub logs: LogsConfig,
	#[serde(default)]
	pub flags: FlagsConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RuntimeConfig {
	/// Explicit java executable. Falls back to `$JAVA_HOME/bin/java`, then `PATH`.
	pub executable: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
	#[serde(default = "default_start_settle")]
	pub start_settle_ms: u64,
	#[serde(default = "default_restart_settle")]
	pub restart_settle_ms: u64,
	#[serde(default = "default_stop_attempts")]
	pub stop_attempts: u32,
	#[serde(default = "default_stop_interval")]
	pub stop_interval_ms: u64,
}

impl Default for TimingConfig {
	fn default() -> Self {
		Self {
			start_settle_ms: default_start_settle(),
			restart_settle_ms: default_restart_settle(),
			stop_attempts: default_stop_attempts(),
			stop_interval_ms: default_stop_interval(),
		}
	}
}

fn default_start_settle() -> u64 { 3000 }
fn default_restart_settle() -> u64 { 2000 }
fn default_stop_attempts() -> u32 { 30 }
fn default_stop_interval() -> u64 { 1000 }

impl TimingConfig {
	pub fn start_settle(&self) -> Duration {
		Duration::from_millis(self.start_settle_ms)
	}

	pub fn restart_settle(&self) -> Duration {
		Duration::from_millis(self.restart_settle_ms)
	}

	pub fn stop_policy(&self) -> StopPolicy {
		StopPolicy {
			attempts: self.stop_attempts,
			interval: Duration::from_millis(self.stop_interval_ms),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogsConfig {
	#[serde(default = "default_max_size")]
	pub max_size_bytes: u64,
	#[serde(default = "default_max_files")]
	pub max_files: u32,
}

impl Default for LogsConfig {
	fn default() -> Self {
		Self {
			max_size_bytes: default_max_size(),
			max_files: default_max_files(),
		}
	}
}

fn default_max_size() -> u64 { 100 * 1024 * 1024 }
fn default_max_files() -> u32 { 5 }

pub fn config_path(home: &Path) -> PathBuf {
	home.join(CONFIG_FILE)
}

/// Load `<home>/jarward.toml`. A missing file yields the defaults; a file that
/// exists but cannot be read or parsed is an error.
pub fn load(home: &Path) -> Result<Config> {
	let path = config_path(home);
	if !path.exists() {
		return Ok(Config::default());
	}
	let content = std::fs::read_to_string(&path).map_err(|e| Error::Config {
		path: path.clone(),
		message: e.to_string(),
	})?;
	parse(&content).map_err(|message| Error::Config { path, message })
}

pub fn parse(content: &str) -> std::result::Result<Config, String> {
	toml::from_str(content).map_err(|e| e.to_string())
}
