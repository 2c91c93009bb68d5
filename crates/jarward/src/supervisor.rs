use std::path::{Path, PathBuf};

use nix::sys::signal::Signal;
use pidward::liveness::{self, InstanceState};
use pidward::paths::resolve_against;
use pidward::terminate::{self, StopOutcome};
use pidward::{Identity, IdentityStore, InstanceLock, InstancePaths, PidFile};

use crate::config::Config;
use crate::diagnostics;
use crate::error::{Error, Result};
use crate::launcher::{self, LaunchSpec};
use crate::logs;
use crate::runtime;
use crate::types::*;

/// Lines of `application.out` attached to a startup failure.
const FAILURE_TAIL_LINES: usize = 20;

/// Lifecycle operations for the one instance launched from an artifact.
pub struct Supervisor {
	pub paths: InstancePaths,
	pub artifact: PathBuf,
	pub config: Config,
	store: Box<dyn IdentityStore>,
}

impl Supervisor {
	/// `artifact` may be relative; it resolves against `home`, never the
	/// caller's working directory.
	pub fn new(home: &Path, artifact: &Path, config: Config) -> Result<Self> {
		let artifact = resolve_against(home, artifact);
		let paths = InstancePaths::for_artifact(home, &artifact)
			.ok_or_else(|| Error::InvalidArtifact(artifact.clone()))?;
		let store = Box::new(PidFile::new(paths.pid_path()));
		Ok(Self {
			paths,
			artifact,
			config,
			store,
		})
	}

	/// Replace the identity store, e.g. to keep markers somewhere else.
	pub fn with_store(mut self, store: Box<dyn IdentityStore>) -> Self {
		self.store = store;
		self
	}

	pub fn name(&self) -> &str {
		&self.paths.name
	}

	pub fn store(&self) -> &dyn IdentityStore {
		self.store.as_ref()
	}

	/// Self-healing liveness read.
	pub fn state(&self) -> InstanceState {
		liveness::check_instance(self.store.as_ref())
	}

	pub async fn start(&self) -> Result<StartOutcome> {
		if !self.artifact.is_file() {
			return Err(Error::ArtifactMissing(self.artifact.clone()));
		}

		let _lock = self.lock().await?;

		if let InstanceState::Running(identity) = self.state() {
			tracing::info!(pid = identity.pid, "{}: already running", self.name());
			return Ok(StartOutcome::AlreadyRunning { pid: identity.pid });
		}

		let program = runtime::find_executable(&self.config.runtime)?;
		logs::ensure_log_dir(&self.paths.log_dir())?;
		logs::rotate_if_oversized(
			&self.paths.log_path(),
			self.config.logs.max_size_bytes,
			self.config.logs.max_files,
		);

		let spec = LaunchSpec::build(&self.paths, &self.artifact, program, &self.config.flags);
		let pid = launcher::spawn(&spec)?;

		let identity = Identity::with_start_time(pid, liveness::start_time(pid));
		if let Err(e) = self.store.write(&identity) {
			// An untracked instance would defeat the next start's check.
			tracing::error!(pid, "cannot record pid, killing the new process: {}", e);
			let _ = terminate::signal_tree(pid, Signal::SIGKILL);
			return Err(e.into());
		}

		tokio::time::sleep(self.config.timing.start_settle()).await;

		if liveness::is_alive(pid) {
			tracing::info!(pid, "{}: started", self.name());
			return Ok(StartOutcome::Started {
				pid,
				log_path: self.paths.log_path(),
				gc_log_path: self.paths.gc_log_path(),
			});
		}

		self.store.clear()?;
		let log_path = self.paths.log_path();
		Err(Error::StartupFailed {
			name: self.name().to_string(),
			pid,
			log_tail: logs::tail(&log_path, FAILURE_TAIL_LINES),
			log_path,
		})
	}

	pub async fn stop(&self) -> Result<StopReport> {
		let _lock = self.lock().await?;
		let policy = self.config.timing.stop_policy();
		let report = match terminate::stop_instance(self.store.as_ref(), &policy).await? {
			StopOutcome::NotRunning => StopReport::NotRunning,
			StopOutcome::Stopped { pid, termination } => StopReport::Stopped {
				pid,
				forced: termination.is_forced(),
			},
		};
		Ok(report)
	}

	/// Stop, settle, start. A failed stop is reported but never skips the start;
	/// if something survived, the start reports it as already running.
	pub async fn restart(&self) -> Result<RestartOutcome> {
		let stop = match self.stop().await {
			Ok(report) => Ok(report),
			Err(e) => {
				tracing::warn!("{}: stop failed during restart: {}", self.name(), e);
				Err(e.to_string())
			}
		};

		tokio::time::sleep(self.config.timing.restart_settle()).await;

		let start = self.start().await?;
		Ok(RestartOutcome { stop, start })
	}

	pub async fn status(&self) -> StatusReport {
		let log_path = self.paths.log_path();
		match self.observed_state() {
			InstanceState::NotRunning => StatusReport {
				name: self.name().to_string(),
				state: RunState::NotRunning,
				pid: None,
				process: None,
				ports: Vec::new(),
				log_path,
			},
			InstanceState::Running(identity) => {
				let process = diagnostics::process_info(identity.pid).await;
				if process.is_none() {
					tracing::warn!(pid = identity.pid, "process metadata unavailable");
				}
				StatusReport {
					name: self.name().to_string(),
					state: RunState::Running,
					pid: Some(identity.pid),
					process,
					ports: diagnostics::listening_ports(identity.pid),
					log_path,
				}
			}
		}
	}

	/// Liveness for read-only callers. A stale marker is only reclaimed while
	/// no start or stop holds the instance lock.
	fn observed_state(&self) -> InstanceState {
		let Some(identity) = self.store.read() else {
			return InstanceState::NotRunning;
		};
		if liveness::is_same_process(&identity) {
			return InstanceState::Running(identity);
		}

		match InstanceLock::try_acquire(&self.paths.lock_path()) {
			Ok(Some(_lock)) => self.state(),
			Ok(None) => {
				tracing::debug!(pid = identity.pid, "lifecycle operation in flight, leaving stale marker");
				InstanceState::NotRunning
			}
			Err(e) => {
				tracing::warn!("cannot take instance lock: {}", e);
				InstanceState::NotRunning
			}
		}
	}

	async fn lock(&self) -> Result<InstanceLock> {
		let path = self.paths.lock_path();
		InstanceLock::acquire_async(&path)
			.await
			.map_err(|source| Error::Lock { path, source })
	}
}
