use std::ffi::OsString;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};

const JAVA: &str = "java";

/// Locate the java executable: configured path, then `$JAVA_HOME/bin/java`,
/// then the first `java` on `PATH`.
pub fn find_executable(config: &RuntimeConfig) -> Result<PathBuf> {
	discover(
		config.executable.as_deref(),
		std::env::var_os("JAVA_HOME"),
		std::env::var_os("PATH"),
	)
}

pub fn discover(
	configured: Option<&Path>,
	java_home: Option<OsString>,
	path: Option<OsString>,
) -> Result<PathBuf> {
	if let Some(exe) = configured {
		return if is_executable(exe) {
			Ok(exe.to_path_buf())
		} else {
			Err(Error::RuntimeNotFound(format!(
				"configured executable {} is missing or not executable",
				exe.display()
			)))
		};
	}

	if let Some(home) = java_home.filter(|h| !h.is_empty()) {
		let candidate = PathBuf::from(home).join("bin").join(JAVA);
		if is_executable(&candidate) {
			return Ok(candidate);
		}
		tracing::warn!("JAVA_HOME set but {} is not executable", candidate.display());
	}

	if let Some(path) = path {
		if let Some(found) = std::env::split_paths(&path)
			.map(|dir| dir.join(JAVA))
			.find(|candidate| is_executable(candidate))
		{
			return Ok(found);
		}
	}

	Err(Error::RuntimeNotFound(
		"set runtime.executable, JAVA_HOME, or put java on PATH".to_string(),
	))
}

fn is_executable(path: &Path) -> bool {
	path.metadata()
		.map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
		.unwrap_or(false)
}
