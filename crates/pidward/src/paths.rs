use std::path::{Path, PathBuf};

/// Where everything belonging to one supervised instance lives on disk.
///
/// All paths hang off the supervisor's home directory so the marker, lock and
/// logs travel with the installation instead of the caller's working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePaths {
	pub home: PathBuf,
	pub name: String,
}

impl InstancePaths {
	pub fn new(home: impl Into<PathBuf>, name: impl Into<String>) -> Self {
		Self {
			home: home.into(),
			name: name.into(),
		}
	}

	/// Paths for the instance launched from `artifact`, named after its file stem.
	pub fn for_artifact(home: impl Into<PathBuf>, artifact: &Path) -> Option<Self> {
		let name = instance_name(artifact)?;
		Some(Self::new(home, name))
	}

	pub fn pid_path(&self) -> PathBuf {
		self.home.join(format!("{}.pid", self.name))
	}

	pub fn lock_path(&self) -> PathBuf {
		self.home.join(format!("{}.lock", self.name))
	}

	pub fn log_dir(&self) -> PathBuf {
		self.home.join("logs")
	}

	pub fn log_path(&self) -> PathBuf {
		self.log_dir().join("application.out")
	}

	pub fn gc_log_path(&self) -> PathBuf {
		self.log_dir().join("gc.log")
	}
}

/// Instance name for an artifact: base filename with the final extension stripped.
pub fn instance_name(artifact: &Path) -> Option<String> {
	artifact
		.file_stem()
		.map(|s| s.to_string_lossy().into_owned())
		.filter(|s| !s.is_empty())
}

pub fn resolve_against(home: &Path, raw: &Path) -> PathBuf {
	if raw.is_absolute() {
		raw.to_path_buf()
	} else {
		home.join(raw)
	}
}

/// Directory of the running executable, or `env_key` when it is set.
pub fn home_dir(env_key: &str) -> PathBuf {
	if let Some(dir) = std::env::var_os(env_key).filter(|v| !v.is_empty()) {
		return PathBuf::from(dir);
	}
	std::env::current_exe()
		.ok()
		.and_then(|exe| exe.parent().map(Path::to_path_buf))
		.unwrap_or_else(|| PathBuf::from("."))
}
