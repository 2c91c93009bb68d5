use std::time::Duration;

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;

use crate::error::{Error, Result};
use crate::identity::{Identity, IdentityStore};
use crate::liveness::{self, InstanceState};

const KILL_CONFIRM_INTERVAL: Duration = Duration::from_millis(50);
const KILL_CONFIRM_ATTEMPTS: u32 = 20;

/// How long a graceful stop may take before it is escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopPolicy {
	pub attempts: u32,
	pub interval: Duration,
}

impl Default for StopPolicy {
	fn default() -> Self {
		Self {
			attempts: 30,
			interval: Duration::from_secs(1),
		}
	}
}

/// How a running process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
	/// Exited after the graceful signal, observed on poll number `polls`.
	Graceful { polls: u32 },
	/// Ignored the graceful signal for the whole window and was killed.
	Forced,
}

impl Termination {
	pub fn is_forced(&self) -> bool {
		matches!(self, Termination::Forced)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
	NotRunning,
	Stopped { pid: u32, termination: Termination },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	GracefulWait { remaining: u32 },
	Terminated,
	ForceKill,
}

/// Stop whatever `store` tracks: check, terminate, clear.
pub async fn stop_instance(store: &dyn IdentityStore, policy: &StopPolicy) -> Result<StopOutcome> {
	let identity = match liveness::check_instance(store) {
		InstanceState::Running(identity) => identity,
		InstanceState::NotRunning => return Ok(StopOutcome::NotRunning),
	};

	let termination = terminate(&identity, policy).await?;
	store.clear()?;

	Ok(StopOutcome::Stopped {
		pid: identity.pid,
		termination,
	})
}

/// Graceful signal, bounded wait, then forced signal.
///
/// Always ends with the process gone from the caller's point of view; the only
/// error is being unable to signal it at all.
pub async fn terminate(identity: &Identity, policy: &StopPolicy) -> Result<Termination> {
	let pid = identity.pid;

	tracing::info!(pid, "sending SIGTERM");
	let mut phase = if signal_tree(pid, Signal::SIGTERM)? {
		Phase::GracefulWait {
			remaining: policy.attempts,
		}
	} else {
		Phase::Terminated
	};
	let mut polls = 0;

	loop {
		phase = match phase {
			Phase::GracefulWait { remaining: 0 } => Phase::ForceKill,
			Phase::GracefulWait { remaining } => {
				tokio::time::sleep(policy.interval).await;
				polls += 1;
				if liveness::is_alive(pid) {
					Phase::GracefulWait {
						remaining: remaining - 1,
					}
				} else {
					Phase::Terminated
				}
			}
			Phase::Terminated => {
				tracing::info!(pid, polls, "stopped gracefully");
				return Ok(Termination::Graceful { polls });
			}
			Phase::ForceKill => {
				tracing::warn!(pid, attempts = policy.attempts, "graceful stop timed out, sending SIGKILL");
				signal_tree(pid, Signal::SIGKILL)?;
				await_exit(pid).await;
				return Ok(Termination::Forced);
			}
		};
	}
}

/// Signal the process group led by `pid`, or just `pid` when it leads none.
///
/// Returns `false` when nothing was there to receive the signal.
pub fn signal_tree(pid: u32, signal: Signal) -> Result<bool> {
	let raw = i32::try_from(pid)
		.ok()
		.filter(|p| *p > 0)
		.ok_or(Error::InvalidPid(pid))?;
	let target = Pid::from_raw(raw);

	match killpg(target, signal) {
		Ok(()) => return Ok(true),
		Err(Errno::ESRCH) => {}
		Err(source) => return Err(Error::Signal { pid, source }),
	}
	match kill(target, signal) {
		Ok(()) => Ok(true),
		Err(Errno::ESRCH) => Ok(false),
		Err(source) => Err(Error::Signal { pid, source }),
	}
}

async fn await_exit(pid: u32) {
	for _ in 0..KILL_CONFIRM_ATTEMPTS {
		if !liveness::is_alive(pid) {
			return;
		}
		tokio::time::sleep(KILL_CONFIRM_INTERVAL).await;
	}
	tracing::warn!(pid, "process still present after SIGKILL");
}
