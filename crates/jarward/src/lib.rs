//! # jarward
//!
//! Supervisor for one long-running JVM server launched from a packaged jar.
//!
//! Starts the server detached with a fixed catalog of tuning flags, tracks it
//! through a PID marker (see [`pidward`]), stops it with `SIGTERM` escalating
//! to `SIGKILL`, and reports liveness with best-effort diagnostics.
//!
//! ```rust,no_run
//! use jarward::{config, Supervisor};
//! use std::path::Path;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> jarward::Result<()> {
//! let home = Path::new("/srv/apps");
//! let sup = Supervisor::new(home, Path::new("order-service.jar"), config::load(home)?)?;
//!
//! let started = sup.start().await?;
//! println!("running as pid {}", started.pid());
//! sup.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod flags;
pub mod launcher;
pub mod logs;
pub mod runtime;
pub mod supervisor;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use supervisor::Supervisor;
pub use types::*;
