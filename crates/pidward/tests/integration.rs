use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use pidward::identity::{Identity, IdentityStore, PidFile};
use pidward::liveness::{self, InstanceState};
use pidward::paths::InstancePaths;
use pidward::terminate::{self, StopOutcome, StopPolicy, Termination};

fn quick_policy(attempts: u32) -> StopPolicy {
	StopPolicy {
		attempts,
		interval: Duration::from_millis(100),
	}
}

/// Spawn `sh -c script`, reaping it on a background thread so a dead child
/// never lingers as a zombie. Returns the pid.
fn spawn_sh(script: &str, own_group: bool) -> u32 {
	let mut cmd = Command::new("sh");
	cmd.args(["-c", script])
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null());
	if own_group {
		cmd.process_group(0);
	}
	let mut child = cmd.spawn().unwrap();
	let pid = child.id();
	std::thread::spawn(move || {
		let _ = child.wait();
	});
	pid
}

fn tracked(dir: &Path, pid: u32) -> PidFile {
	let store = PidFile::new(dir.join("svc.pid"));
	store
		.write(&Identity::with_start_time(pid, liveness::start_time(pid)))
		.unwrap();
	store
}

// --- Paths ---

#[test]
fn paths_derive_from_artifact_name() {
	let paths = InstancePaths::for_artifact("/srv/sup", Path::new("/opt/apps/order-service.jar")).unwrap();
	assert_eq!(paths.name, "order-service");
	assert_eq!(paths.pid_path(), Path::new("/srv/sup/order-service.pid"));
	assert_eq!(paths.lock_path(), Path::new("/srv/sup/order-service.lock"));
	assert_eq!(paths.log_dir(), Path::new("/srv/sup/logs"));
	assert_eq!(paths.log_path(), Path::new("/srv/sup/logs/application.out"));
	assert_eq!(paths.gc_log_path(), Path::new("/srv/sup/logs/gc.log"));
}

#[test]
fn home_dir_honours_override() {
	let dir = tempfile::tempdir().unwrap();
	std::env::set_var("PIDWARD_TEST_HOME", dir.path());
	assert_eq!(pidward::paths::home_dir("PIDWARD_TEST_HOME"), dir.path());
}

// --- PidFile ---

#[test]
fn pid_file_read_none_when_missing() {
	let dir = tempfile::tempdir().unwrap();
	let store = PidFile::new(dir.path().join("missing.pid"));
	assert_eq!(store.read(), None);
}

#[test]
fn pid_file_write_then_read() {
	let dir = tempfile::tempdir().unwrap();
	let store = PidFile::new(dir.path().join("nested").join("svc.pid"));
	store.write(&Identity::new(12345)).unwrap();
	assert_eq!(store.read(), Some(Identity::new(12345)));

	store.write(&Identity::with_start_time(54321, Some(99))).unwrap();
	assert_eq!(store.read(), Some(Identity::with_start_time(54321, Some(99))));
	assert_eq!(std::fs::read_to_string(store.path()).unwrap(), "54321\n99\n");
}

#[test]
fn pid_file_reads_garbage_as_none() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("svc.pid");
	std::fs::write(&path, "not-a-number").unwrap();
	assert_eq!(PidFile::new(&path).read(), None);
}

#[test]
fn pid_file_clear_is_idempotent() {
	let dir = tempfile::tempdir().unwrap();
	let store = PidFile::new(dir.path().join("svc.pid"));
	store.write(&Identity::new(1)).unwrap();
	store.clear().unwrap();
	store.clear().unwrap();
	assert!(!store.path().exists());
	assert_eq!(store.read(), None);
}

// --- Liveness against real processes ---

#[test]
fn killed_process_marker_self_heals() {
	let dir = tempfile::tempdir().unwrap();
	let pid = spawn_sh("exec sleep 30", false);
	let store = tracked(dir.path(), pid);

	assert!(matches!(liveness::check_instance(&store), InstanceState::Running(id) if id.pid == pid));

	terminate::signal_tree(pid, nix::sys::signal::Signal::SIGKILL).unwrap();
	std::thread::sleep(Duration::from_millis(300));

	assert_eq!(liveness::check_instance(&store), InstanceState::NotRunning);
	assert!(!store.path().exists());
	assert_eq!(liveness::check_instance(&store), InstanceState::NotRunning);
	assert_eq!(store.read(), None);
}

// --- Stop ---

#[tokio::test]
async fn stop_when_nothing_tracked_is_a_no_op() {
	let dir = tempfile::tempdir().unwrap();
	let store = PidFile::new(dir.path().join("svc.pid"));
	let outcome = terminate::stop_instance(&store, &quick_policy(5)).await.unwrap();
	assert_eq!(outcome, StopOutcome::NotRunning);
	assert!(!store.path().exists());
}

#[tokio::test]
async fn stop_graceful_clears_marker() {
	let dir = tempfile::tempdir().unwrap();
	let pid = spawn_sh("exec sleep 30", true);
	let store = tracked(dir.path(), pid);

	let outcome = terminate::stop_instance(&store, &quick_policy(20)).await.unwrap();
	match outcome {
		StopOutcome::Stopped { pid: stopped, termination: Termination::Graceful { .. } } => {
			assert_eq!(stopped, pid)
		}
		other => panic!("unexpected outcome: {:?}", other),
	}
	assert_eq!(store.read(), None);
	assert!(!liveness::is_alive(pid));
}

#[tokio::test]
async fn stop_escalates_when_sigterm_is_ignored() {
	let dir = tempfile::tempdir().unwrap();
	let pid = spawn_sh("trap '' TERM; exec sleep 30", true);
	// Let the shell install its trap before we signal it.
	tokio::time::sleep(Duration::from_millis(300)).await;
	let store = tracked(dir.path(), pid);

	let outcome = terminate::stop_instance(&store, &quick_policy(5)).await.unwrap();
	assert_eq!(
		outcome,
		StopOutcome::Stopped {
			pid,
			termination: Termination::Forced
		}
	);
	assert_eq!(store.read(), None);
	assert!(!liveness::is_alive(pid));
}

#[tokio::test]
async fn stop_reaches_processes_outside_a_group() {
	let dir = tempfile::tempdir().unwrap();
	let pid = spawn_sh("exec sleep 30", false);
	let store = tracked(dir.path(), pid);

	let outcome = terminate::stop_instance(&store, &quick_policy(20)).await.unwrap();
	assert!(matches!(outcome, StopOutcome::Stopped { termination: Termination::Graceful { .. }, .. }));
	assert!(!liveness::is_alive(pid));
}
