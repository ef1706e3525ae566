//! Stop requests for a launched process.
//!
//! Teardown asks a process to stop twice at most: a cooperative request
//! first, then an unconditional one if the process is still producing output
//! after a short wait. What "cooperative" means depends on the platform, so
//! both requests go through [`ProcessControl`] and a per-platform backend.

use std::io;
use std::process::ExitStatus;

use async_trait::async_trait;

use crate::launcher::ProcessHandle;

/// Capability to stop and reap a child process.
#[async_trait]
pub trait ProcessControl: Send {
	/// Asks the process to stop. On Unix this delivers `SIGINT`.
	fn request_graceful_stop(&mut self) -> io::Result<()>;

	/// Stops the process unconditionally. On Unix this delivers `SIGKILL`.
	fn request_forced_stop(&mut self) -> io::Result<()>;

	/// Waits for the process to exit and reaps it.
	async fn wait(&mut self) -> io::Result<ExitStatus>;
}

#[async_trait]
impl ProcessControl for ProcessHandle {
	fn request_graceful_stop(&mut self) -> io::Result<()> {
		backend::graceful(self)
	}

	fn request_forced_stop(&mut self) -> io::Result<()> {
		backend::forced(self)
	}

	async fn wait(&mut self) -> io::Result<ExitStatus> {
		self.reap().await
	}
}

#[cfg(unix)]
mod backend {
	use std::io;

	use nix::sys::signal::{Signal, kill};
	use nix::unistd::Pid;

	use crate::launcher::ProcessHandle;

	pub(super) fn graceful(handle: &mut ProcessHandle) -> io::Result<()> {
		send(handle, Signal::SIGINT)
	}

	pub(super) fn forced(handle: &mut ProcessHandle) -> io::Result<()> {
		send(handle, Signal::SIGKILL)
	}

	// The pid stays valid until the child is reaped, which only happens after
	// both requests have had their chance.
	fn send(handle: &ProcessHandle, signal: Signal) -> io::Result<()> {
		let pid = handle
			.pid
			.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "process has no pid"))?;
		let pid = i32::try_from(pid)
			.map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
		kill(Pid::from_raw(pid), signal).map_err(io::Error::from)
	}
}

#[cfg(not(unix))]
mod backend {
	use std::io;

	use tracing::debug;

	use crate::launcher::ProcessHandle;

	pub(super) fn graceful(handle: &mut ProcessHandle) -> io::Result<()> {
		debug!(
			target = "stdiows",
			pid = handle.pid,
			"graceful stop has no equivalent on this platform"
		);
		Ok(())
	}

	pub(super) fn forced(handle: &mut ProcessHandle) -> io::Result<()> {
		handle.child.start_kill()
	}
}
