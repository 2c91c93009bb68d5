use std::path::PathBuf;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StartOutcome {
	Started {
		pid: u32,
		log_path: PathBuf,
		gc_log_path: PathBuf,
	},
	AlreadyRunning {
		pid: u32,
	},
}

impl StartOutcome {
	pub fn pid(&self) -> u32 {
		match self {
			StartOutcome::Started { pid, .. } | StartOutcome::AlreadyRunning { pid } => *pid,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StopReport {
	NotRunning,
	Stopped { pid: u32, forced: bool },
}

#[derive(Debug)]
pub struct RestartOutcome {
	/// The stop half. An error here does not prevent the start half.
	pub stop: Result<StopReport, String>,
	pub start: StartOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
	Running,
	NotRunning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessInfo {
	pub command: Vec<String>,
	pub memory_bytes: u64,
	pub virtual_memory_bytes: u64,
	pub cpu_percent: f32,
	pub uptime_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
	pub name: String,
	pub state: RunState,
	pub pid: Option<u32>,
	/// Advisory; `None` when the OS would not tell us.
	pub process: Option<ProcessInfo>,
	/// Advisory listening TCP ports of the process and its descendants.
	pub ports: Vec<u16>,
	pub log_path: PathBuf,
}

impl StatusReport {
	pub fn is_running(&self) -> bool {
		self.state == RunState::Running
	}
}
