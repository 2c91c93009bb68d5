use std::io;

use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error("io error: {0}")]
	Io(#[from] io::Error),

	#[error("cannot signal pid {pid}: {source}")]
	Signal {
		pid: u32,
		#[source]
		source: Errno,
	},

	#[error("pid {0} is out of range")]
	InvalidPid(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
