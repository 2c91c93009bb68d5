//! # pidward
//!
//! Single-instance lifecycle toolkit for Rust CLIs.
//!
//! Track one long-running process through a PID marker, read its liveness
//! with automatic stale-marker reclamation, and stop it with a graceful signal
//! that escalates to `SIGKILL` after a bounded wait.
//!
//! ```rust,no_run
//! use pidward::{InstancePaths, PidFile, StopPolicy, check_instance, stop_instance};
//!
//! # #[tokio::main]
//! # async fn main() -> pidward::Result<()> {
//! let paths = InstancePaths::new("/srv/apps", "order-service");
//! let store = PidFile::new(paths.pid_path());
//!
//! if check_instance(&store).is_running() {
//!     stop_instance(&store, &StopPolicy::default()).await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod identity;
pub mod liveness;
pub mod lock;
pub mod paths;
pub mod terminate;

pub use error::{Error, Result};
pub use identity::{Identity, IdentityStore, PidFile};
pub use liveness::{check_instance, is_alive, is_same_process, start_time, InstanceState};
pub use lock::InstanceLock;
pub use paths::InstancePaths;
pub use terminate::{stop_instance, terminate, StopOutcome, StopPolicy, Termination};
