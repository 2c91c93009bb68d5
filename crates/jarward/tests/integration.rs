use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use jarward::launcher::LaunchSpec;
use jarward::{Config, Error, RunState, StartOutcome, StopReport, Supervisor};
use pidward::liveness;
use pidward::{Identity, IdentityStore, InstanceLock, PidFile};
use tempfile::TempDir;

/// Marker left behind by a process that no longer exists.
const DEAD_PID: u32 = 2_000_000_000;

/// A stand-in runtime: prints its argument vector, then runs `body`.
fn fake_runtime(dir: &Path, body: &str) -> PathBuf {
	let path = dir.join("bin").join("java");
	std::fs::create_dir_all(path.parent().unwrap()).unwrap();
	std::fs::write(&path, format!("#!/bin/sh\necho \"$@\"\n{}\n", body)).unwrap();
	std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
	path
}

fn quick_config(runtime: PathBuf) -> Config {
	let mut config = Config::default();
	config.runtime.executable = Some(runtime);
	config.timing.start_settle_ms = 300;
	config.timing.restart_settle_ms = 50;
	config.timing.stop_attempts = 10;
	config.timing.stop_interval_ms = 100;
	config
}

/// Home directory with `app.jar` and a runtime running `body`.
fn test_home(body: &str) -> (TempDir, Config) {
	let home = tempfile::tempdir().unwrap();
	std::fs::write(home.path().join("app.jar"), b"PK").unwrap();
	let config = quick_config(fake_runtime(home.path(), body));
	(home, config)
}

fn supervisor(home: &TempDir, config: Config) -> Supervisor {
	Supervisor::new(home.path(), Path::new("app.jar"), config).unwrap()
}

/// A PID file that can be written but never removed.
struct StuckMarker(PidFile);

impl IdentityStore for StuckMarker {
	fn write(&self, identity: &Identity) -> io::Result<()> {
		self.0.write(identity)
	}

	fn read(&self) -> Option<Identity> {
		self.0.read()
	}

	fn clear(&self) -> io::Result<()> {
		Err(io::Error::new(io::ErrorKind::PermissionDenied, "marker is read-only"))
	}
}

fn tracked_pid(sup: &Supervisor) -> Option<u32> {
	sup.store().read().map(|id| id.pid)
}

// --- Paths ---

#[test]
fn relative_artifact_resolves_against_home() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);
	assert_eq!(sup.artifact, home.path().join("app.jar"));
	assert_eq!(sup.name(), "app");
	assert_eq!(sup.paths.pid_path(), home.path().join("app.pid"));
	assert_eq!(sup.paths.log_path(), home.path().join("logs").join("application.out"));
}

#[test]
fn artifact_without_a_name_is_rejected() {
	let home = tempfile::tempdir().unwrap();
	let result = Supervisor::new(home.path(), Path::new("/"), Config::default());
	assert!(matches!(result, Err(Error::InvalidArtifact(_))));
}

// --- Start / stop ---

#[tokio::test]
async fn start_then_stop() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);

	let started = sup.start().await.unwrap();
	let pid = match &started {
		StartOutcome::Started { pid, log_path, .. } => {
			assert!(log_path.exists());
			*pid
		}
		other => panic!("unexpected {:?}", other),
	};
	assert_eq!(tracked_pid(&sup), Some(pid));
	assert!(liveness::is_alive(pid));

	let stopped = sup.stop().await.unwrap();
	assert_eq!(stopped, StopReport::Stopped { pid, forced: false });
	assert_eq!(sup.store().read(), None);
	assert!(!liveness::is_alive(pid));
}

#[tokio::test]
async fn second_start_reports_already_running() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);

	let first = sup.start().await.unwrap();
	let second = sup.start().await.unwrap();
	assert_eq!(second, StartOutcome::AlreadyRunning { pid: first.pid() });
	assert_eq!(tracked_pid(&sup), Some(first.pid()));

	sup.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_starts_launch_one_process() {
	let (home, config) = test_home("exec sleep 30");
	let a = supervisor(&home, config.clone());
	let b = supervisor(&home, config);

	let (ra, rb) = tokio::join!(a.start(), b.start());
	let (ra, rb) = (ra.unwrap(), rb.unwrap());
	assert_eq!(ra.pid(), rb.pid());

	let started = [&ra, &rb]
		.iter()
		.filter(|o| matches!(o, StartOutcome::Started { .. }))
		.count();
	assert_eq!(started, 1);

	a.stop().await.unwrap();
}

#[tokio::test]
async fn start_with_missing_artifact_creates_no_marker() {
	let (home, config) = test_home("exec sleep 30");
	let sup = Supervisor::new(home.path(), Path::new("missing.jar"), config).unwrap();

	let err = sup.start().await.unwrap_err();
	assert!(matches!(err, Error::ArtifactMissing(_)));
	assert!(!sup.paths.pid_path().exists());
	assert!(!sup.paths.lock_path().exists());
}

#[tokio::test]
async fn start_with_missing_runtime_fails() {
	let (home, mut config) = test_home("exec sleep 30");
	config.runtime.executable = Some(home.path().join("no-such-java"));
	let sup = supervisor(&home, config);

	let err = sup.start().await.unwrap_err();
	assert!(matches!(err, Error::RuntimeNotFound(_)));
	assert!(!sup.paths.pid_path().exists());
}

#[tokio::test]
async fn startup_failure_leaves_no_marker() {
	let (home, config) = test_home("echo 'port already in use'\nexit 1");
	let sup = supervisor(&home, config);

	match sup.start().await {
		Err(Error::StartupFailed { log_tail, .. }) => {
			assert!(log_tail.iter().any(|l| l == "port already in use"));
		}
		other => panic!("unexpected {:?}", other),
	}
	assert_eq!(sup.store().read(), None);
	assert!(!sup.paths.pid_path().exists());
}

#[tokio::test]
async fn arguments_reach_the_runtime_in_catalog_order() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);
	let expected = LaunchSpec::build(
		&sup.paths,
		&sup.artifact,
		PathBuf::from("java"),
		&sup.config.flags,
	)
	.args
	.join(" ");

	sup.start().await.unwrap();
	sup.stop().await.unwrap();

	let logged = std::fs::read_to_string(sup.paths.log_path()).unwrap();
	assert_eq!(logged.lines().next(), Some(expected.as_str()));
	assert!(expected.ends_with(&format!("-jar {}", home.path().join("app.jar").display())));
}

#[tokio::test]
async fn stop_forces_a_process_ignoring_sigterm() {
	let (home, mut config) = test_home("trap '' TERM\nexec sleep 30");
	config.timing.stop_attempts = 5;
	let sup = supervisor(&home, config);

	let pid = sup.start().await.unwrap().pid();
	let report = sup.stop().await.unwrap();
	assert_eq!(report, StopReport::Stopped { pid, forced: true });
	assert_eq!(sup.store().read(), None);
	assert!(!liveness::is_alive(pid));
}

#[tokio::test]
async fn stop_when_not_running_is_a_no_op() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);
	assert_eq!(sup.stop().await.unwrap(), StopReport::NotRunning);
	assert_eq!(sup.stop().await.unwrap(), StopReport::NotRunning);
}

// --- Stale state ---

#[tokio::test]
async fn out_of_band_kill_is_observed_as_not_running() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);

	let pid = sup.start().await.unwrap().pid();
	pidward::terminate::signal_tree(pid, nix::sys::signal::Signal::SIGKILL).unwrap();
	tokio::time::sleep(Duration::from_millis(300)).await;

	let report = sup.status().await;
	assert_eq!(report.state, RunState::NotRunning);
	assert!(!sup.paths.pid_path().exists());
	assert_eq!(sup.stop().await.unwrap(), StopReport::NotRunning);
	assert_eq!(sup.store().read(), None);
}

#[tokio::test]
async fn stale_marker_does_not_block_start() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);
	sup.store().write(&Identity::new(DEAD_PID)).unwrap();

	let started = sup.start().await.unwrap();
	assert!(matches!(started, StartOutcome::Started { .. }));
	assert_ne!(started.pid(), DEAD_PID);

	sup.stop().await.unwrap();
}

// --- Restart ---

#[tokio::test]
async fn restart_from_running_replaces_the_process() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);

	let old = sup.start().await.unwrap().pid();
	let outcome = sup.restart().await.unwrap();
	assert_eq!(outcome.stop, Ok(StopReport::Stopped { pid: old, forced: false }));
	assert!(matches!(outcome.start, StartOutcome::Started { .. }));

	let new = outcome.start.pid();
	assert_ne!(new, old);
	assert!(!liveness::is_alive(old));
	assert!(liveness::is_alive(new));
	assert_eq!(tracked_pid(&sup), Some(new));

	sup.stop().await.unwrap();
}

#[tokio::test]
async fn restart_from_stale_or_absent_starts_one_process() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);

	let outcome = sup.restart().await.unwrap();
	assert_eq!(outcome.stop, Ok(StopReport::NotRunning));
	let first = outcome.start.pid();
	sup.stop().await.unwrap();

	sup.store().write(&Identity::new(DEAD_PID)).unwrap();
	let outcome = sup.restart().await.unwrap();
	assert_eq!(outcome.stop, Ok(StopReport::NotRunning));
	let second = outcome.start.pid();
	assert_ne!(second, first);
	assert!(liveness::is_alive(second));
	assert_eq!(tracked_pid(&sup), Some(second));

	sup.stop().await.unwrap();
}

#[tokio::test]
async fn restart_still_starts_after_a_failed_stop() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);
	let store = StuckMarker(PidFile::new(sup.paths.pid_path()));
	let sup = sup.with_store(Box::new(store));

	let old = sup.start().await.unwrap().pid();
	let outcome = sup.restart().await.unwrap();

	assert!(outcome.stop.is_err());
	assert!(!liveness::is_alive(old));
	let new = match outcome.start {
		StartOutcome::Started { pid, .. } => pid,
		other => panic!("unexpected {:?}", other),
	};
	assert_ne!(new, old);
	assert!(liveness::is_alive(new));
	assert_eq!(tracked_pid(&sup), Some(new));

	pidward::terminate::signal_tree(new, nix::sys::signal::Signal::SIGKILL).unwrap();
}

// --- Status ---

#[tokio::test]
async fn status_reports_running_instance() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);

	let pid = sup.start().await.unwrap().pid();
	let report = sup.status().await;
	assert!(report.is_running());
	assert_eq!(report.name, "app");
	assert_eq!(report.pid, Some(pid));
	assert_eq!(report.log_path, sup.paths.log_path());

	let json = serde_json::to_value(&report).unwrap();
	assert_eq!(json["state"], "running");
	assert_eq!(json["pid"], pid);

	sup.stop().await.unwrap();
	let report = sup.status().await;
	assert!(!report.is_running());
	assert_eq!(report.pid, None);
}

#[tokio::test]
async fn status_leaves_stale_marker_while_locked() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);
	sup.store().write(&Identity::new(DEAD_PID)).unwrap();

	let held = InstanceLock::acquire(&sup.paths.lock_path()).unwrap();
	assert_eq!(sup.status().await.state, RunState::NotRunning);
	assert_eq!(tracked_pid(&sup), Some(DEAD_PID));

	drop(held);
	assert_eq!(sup.status().await.state, RunState::NotRunning);
	assert_eq!(sup.store().read(), None);
}

#[tokio::test]
async fn status_never_creates_state() {
	let (home, config) = test_home("exec sleep 30");
	let sup = supervisor(&home, config);
	let report = sup.status().await;
	assert_eq!(report.state, RunState::NotRunning);
	assert!(!sup.paths.pid_path().exists());
	assert!(!sup.paths.log_dir().exists());
}
