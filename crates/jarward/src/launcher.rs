use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use pidward::InstancePaths;
use tokio::process::Command;

use crate::error::{Error, Result};
use crate::flags::{FlagContext, FlagsConfig};
use crate::logs;

/// Everything needed to spawn the server process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
	pub program: PathBuf,
	pub args: Vec<String>,
	pub working_dir: PathBuf,
	pub log_path: PathBuf,
}

impl LaunchSpec {
	/// Tuning flags in catalog order, then `-jar <artifact>`.
	pub fn build(paths: &InstancePaths, artifact: &Path, program: PathBuf, flags: &FlagsConfig) -> Self {
		let log_dir = paths.log_dir();
		let gc_log = paths.gc_log_path();
		let mut args = flags.assemble(&FlagContext {
			name: &paths.name,
			log_dir: &log_dir,
			gc_log: &gc_log,
		});
		args.push("-jar".to_string());
		args.push(artifact.to_string_lossy().into_owned());

		Self {
			program,
			args,
			working_dir: paths.home.clone(),
			log_path: paths.log_path(),
		}
	}
}

/// Spawn the process in its own session with both output streams appended to
/// the log sink. Returns its pid.
///
/// The child is reaped in the background for as long as this runtime lives;
/// once the caller exits it is re-parented and keeps running.
pub fn spawn(spec: &LaunchSpec) -> Result<u32> {
	let spawn_err = |source: io::Error| Error::Spawn {
		program: spec.program.clone(),
		source,
	};

	let stdout = logs::open_sink(&spec.log_path).map_err(spawn_err)?;
	let stderr = stdout.try_clone().map_err(spawn_err)?;

	let mut cmd = Command::new(&spec.program);
	cmd.args(&spec.args)
		.current_dir(&spec.working_dir)
		.stdin(Stdio::null())
		.stdout(Stdio::from(stdout))
		.stderr(Stdio::from(stderr))
		.kill_on_drop(false);

	// SAFETY: setsid is async-signal-safe and touches no memory shared with
	// the parent.
	unsafe {
		cmd.pre_exec(|| {
			nix::unistd::setsid().map(|_| ()).map_err(io::Error::from)
		});
	}

	tracing::debug!(program = %spec.program.display(), args = ?spec.args, "spawning");
	let mut child = cmd.spawn().map_err(spawn_err)?;
	let Some(pid) = child.id() else {
		return Err(spawn_err(io::Error::other("process exited before its pid was read")));
	};

	tokio::spawn(async move {
		let _ = child.wait().await;
	});

	tracing::info!(pid, "spawned {}", spec.program.display());
	Ok(pid)
}
