use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use sysinfo::{ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};

use crate::identity::{Identity, IdentityStore};

/// Start times are reported with one-second granularity and derived from the
/// boot clock, so allow a little drift between two reads of the same process.
const START_TIME_TOLERANCE_SECS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
	Running(Identity),
	NotRunning,
}

impl InstanceState {
	pub fn is_running(&self) -> bool {
		matches!(self, InstanceState::Running(_))
	}

	pub fn pid(&self) -> Option<u32> {
		match self {
			InstanceState::Running(id) => Some(id.pid),
			InstanceState::NotRunning => None,
		}
	}
}

/// True iff a process with `pid` is in the process table and has not exited.
///
/// Zombies count as dead: they have exited and only wait to be reaped.
pub fn is_alive(pid: u32) -> bool {
	let Some(raw) = to_raw_pid(pid) else {
		return false;
	};
	match kill(Pid::from_raw(raw), None) {
		// EPERM: the process exists but belongs to someone else.
		Ok(()) | Err(Errno::EPERM) => !matches!(probe(pid), Some((ProcessStatus::Zombie, _))),
		Err(_) => false,
	}
}

/// OS start time of `pid` in seconds since the Unix epoch.
pub fn start_time(pid: u32) -> Option<u64> {
	probe(pid).map(|(_, started)| started)
}

/// `is_alive`, plus a start-time match when the identity recorded one.
pub fn is_same_process(identity: &Identity) -> bool {
	if !is_alive(identity.pid) {
		return false;
	}
	match (identity.started_at, start_time(identity.pid)) {
		(Some(recorded), Some(current)) => recorded.abs_diff(current) <= START_TIME_TOLERANCE_SECS,
		_ => true,
	}
}

/// The self-healing read every operation consults first.
///
/// A marker whose process is gone is stale: it is cleared here so no caller
/// ever acts on it.
pub fn check_instance(store: &dyn IdentityStore) -> InstanceState {
	let Some(identity) = store.read() else {
		return InstanceState::NotRunning;
	};

	if is_same_process(&identity) {
		return InstanceState::Running(identity);
	}

	reclaim(store, identity)
}

/// Clear the stale marker, unless it was rewritten since `stale` was read.
fn reclaim(store: &dyn IdentityStore, stale: Identity) -> InstanceState {
	match store.read() {
		None => return InstanceState::NotRunning,
		Some(current) if current != stale => {
			tracing::debug!(stale = stale.pid, current = current.pid, "pid marker rewritten concurrently, leaving it");
			return if is_same_process(&current) {
				InstanceState::Running(current)
			} else {
				InstanceState::NotRunning
			};
		}
		Some(_) => {}
	}

	tracing::info!(pid = stale.pid, "reclaiming stale pid marker");
	if let Err(e) = store.clear() {
		tracing::warn!(pid = stale.pid, "failed to clear stale pid marker: {}", e);
	}
	InstanceState::NotRunning
}

fn to_raw_pid(pid: u32) -> Option<i32> {
	// 0 and negative values address process groups, never a single process.
	i32::try_from(pid).ok().filter(|p| *p > 0)
}

fn probe(pid: u32) -> Option<(ProcessStatus, u64)> {
	let target = sysinfo::Pid::from_u32(pid);
	let mut system = System::new();
	system.refresh_processes_specifics(
		ProcessesToUpdate::Some(&[target]),
		true,
		ProcessRefreshKind::new(),
	);
	system
		.process(target)
		.map(|process| (process.status(), process.start_time()))
}
