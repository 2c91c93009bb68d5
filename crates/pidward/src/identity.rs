use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// The recorded identity of the tracked process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
	pub pid: u32,
	/// OS start time of the process, seconds since the Unix epoch.
	/// Lets liveness reject a PID that has since been reused.
	pub started_at: Option<u64>,
}

impl Identity {
	pub fn new(pid: u32) -> Self {
		Self { pid, started_at: None }
	}

	pub fn with_start_time(pid: u32, started_at: Option<u64>) -> Self {
		Self { pid, started_at }
	}

	fn encode(&self) -> String {
		match self.started_at {
			Some(t) => format!("{}\n{}\n", self.pid, t),
			None => format!("{}\n", self.pid),
		}
	}

	fn decode(raw: &str) -> Option<Self> {
		let mut lines = raw.lines().map(str::trim).filter(|l| !l.is_empty());
		let pid: u32 = lines.next()?.parse().ok()?;
		if pid == 0 {
			return None;
		}
		let started_at = lines.next().and_then(|l| l.parse().ok());
		Some(Self { pid, started_at })
	}
}

/// Persistence for the single current-instance marker.
pub trait IdentityStore {
	/// Persist `identity`, replacing whatever was recorded before.
	fn write(&self, identity: &Identity) -> io::Result<()>;

	/// The recorded identity. Missing, unreadable or garbled markers read as `None`.
	fn read(&self) -> Option<Identity>;

	/// Remove the marker. Clearing an absent marker is not an error.
	fn clear(&self) -> io::Result<()>;
}

/// Identity store backed by a PID file.
#[derive(Debug, Clone)]
pub struct PidFile {
	path: PathBuf,
}

impl PidFile {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn staging_path(&self) -> PathBuf {
		let name = self
			.path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| "instance.pid".to_string());
		self.path.with_file_name(format!(".{}.tmp", name))
	}
}

impl IdentityStore for PidFile {
	fn write(&self, identity: &Identity) -> io::Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)?;
		}
		let staging = self.staging_path();
		{
			let mut file = fs::File::create(&staging)?;
			file.write_all(identity.encode().as_bytes())?;
			file.sync_all()?;
		}
		fs::rename(&staging, &self.path)
	}

	fn read(&self) -> Option<Identity> {
		fs::read_to_string(&self.path)
			.ok()
			.and_then(|s| Identity::decode(&s))
	}

	fn clear(&self) -> io::Result<()> {
		match fs::remove_file(&self.path) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(e),
		}
	}
}
