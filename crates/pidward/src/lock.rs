use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;

use fs2::FileExt;

/// Exclusive advisory lock serialising check-then-act sequences across
/// supervisor invocations. Released on drop.
///
/// The lock file itself is left on disk: removing it would let a waiter and a
/// newcomer each lock a different inode.
#[derive(Debug)]
pub struct InstanceLock {
	file: File,
}

impl InstanceLock {
	/// Block until the lock is held.
	pub fn acquire(path: &Path) -> io::Result<Self> {
		let file = open_lock_file(path)?;
		file.lock_exclusive()?;
		Ok(Self { file })
	}

	/// `None` when another holder has it.
	pub fn try_acquire(path: &Path) -> io::Result<Option<Self>> {
		let file = open_lock_file(path)?;
		match file.try_lock_exclusive() {
			Ok(()) => Ok(Some(Self { file })),
			Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// `acquire` without stalling the async runtime.
	pub async fn acquire_async(path: &Path) -> io::Result<Self> {
		let path = path.to_path_buf();
		tokio::task::spawn_blocking(move || Self::acquire(&path))
			.await
			.map_err(io::Error::other)?
	}
}

impl Drop for InstanceLock {
	fn drop(&mut self) {
		let _ = FileExt::unlock(&self.file);
	}
}

fn open_lock_file(path: &Path) -> io::Result<File> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	OpenOptions::new()
		.read(true)
		.write(true)
		.create(true)
		.truncate(false)
		.open(path)
}
