use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("artifact not found: {}", .0.display())]
	ArtifactMissing(PathBuf),

	#[error("cannot derive an instance name from {}", .0.display())]
	InvalidArtifact(PathBuf),

	#[error("no java runtime found: {0}")]
	RuntimeNotFound(String),

	#[error("cannot create log directory {}: {source}", path.display())]
	LogDir {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("invalid config {}: {message}", path.display())]
	Config { path: PathBuf, message: String },

	#[error("cannot take instance lock {}: {source}", path.display())]
	Lock {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("failed to launch {}: {source}", program.display())]
	Spawn {
		program: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("{name} exited during startup (pid {pid})")]
	StartupFailed {
		name: String,
		pid: u32,
		log_path: PathBuf,
		log_tail: Vec<String>,
	},

	#[error(transparent)]
	Lifecycle(#[from] pidward::Error),

	#[error("io error: {0}")]
	Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
