//! Process launcher
//!
//! Spawns the authorized command with two unidirectional pipes: one the bridge
//! writes the peer's bytes into, and one carrying the child's stdout and stderr
//! merged. Every pipe end is an owned handle, so an early return on any path
//! closes whatever was opened so far.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::process::ExitStatus;

use stdiows_protocol::CommandDescriptor;
use tokio::process::{Child, Command};
use tracing::info;

use crate::error::{Error, Result};

/// Bridge end of the child's standard input.
#[cfg(unix)]
pub type ProcessInput = tokio::net::unix::pipe::Sender;
/// Bridge end of the child's merged standard output and error.
#[cfg(unix)]
pub type ProcessOutput = tokio::net::unix::pipe::Receiver;

/// Bridge end of the child's standard input.
#[cfg(not(unix))]
pub type ProcessInput = tokio::process::ChildStdin;
/// Bridge end of the child's standard output.
#[cfg(not(unix))]
pub type ProcessOutput = tokio::process::ChildStdout;

/// A running child process and the bridge ends of its pipes.
///
/// The input and output ends can be taken out to hand them to the pumps; the
/// handle keeps the child itself until it has been reaped through
/// [`ProcessControl::wait`](crate::ProcessControl::wait). The child is spawned
/// with kill-on-drop, so dropping an unreaped handle still terminates it.
pub struct ProcessHandle {
	pub(crate) child: Child,
	pub(crate) pid: Option<u32>,
	command: String,
	input: Option<ProcessInput>,
	output: Option<ProcessOutput>,
}

impl ProcessHandle {
	/// OS process id captured at spawn time.
	pub fn pid(&self) -> Option<u32> {
		self.pid
	}

	/// Program this handle was launched from.
	pub fn command(&self) -> &str {
		&self.command
	}

	/// Takes the write end of the child's input pipe.
	pub fn take_input(&mut self) -> Option<ProcessInput> {
		self.input.take()
	}

	/// Takes the read end of the child's output pipe.
	pub fn take_output(&mut self) -> Option<ProcessOutput> {
		self.output.take()
	}

	pub(crate) async fn reap(&mut self) -> std::io::Result<ExitStatus> {
		self.input.take();
		self.output.take();
		self.child.wait().await
	}
}

impl fmt::Debug for ProcessHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ProcessHandle")
			.field("pid", &self.pid)
			.field("command", &self.command)
			.field("input_open", &self.input.is_some())
			.field("output_open", &self.output.is_some())
			.finish()
	}
}

/// Resolves the program to start without consulting `PATH`.
///
/// A bare name such as `echo` is taken relative to the working directory
/// (`./echo`), like any other relative path; only the path the authority
/// named can be executed.
pub(crate) fn program_path(command: &str) -> PathBuf {
	let path = Path::new(command);
	let mut components = path.components();
	match (components.next(), components.next()) {
		(Some(Component::Normal(_)), None) => Path::new(".").join(path),
		_ => path.to_path_buf(),
	}
}

/// Launches `descriptor` with piped input and merged output.
///
/// The program is resolved by [`program_path`], never through `PATH`. Must be
/// called from within a Tokio runtime; the bridge ends of the pipes are
/// registered with its reactor.
///
/// # Errors
///
/// Returns [`Error::Pipe`] if a pipe cannot be allocated or registered, and
/// [`Error::Launch`] if the program cannot be started. In both cases every
/// pipe end opened so far is closed before returning.
#[cfg(unix)]
pub fn launch(descriptor: &CommandDescriptor) -> Result<ProcessHandle> {
	use std::os::fd::OwnedFd;

	use tokio::net::unix::pipe;

	let (input_reader, input_writer) = std::io::pipe().map_err(Error::Pipe)?;
	let (output_reader, output_writer) = std::io::pipe().map_err(Error::Pipe)?;
	let error_writer = output_writer.try_clone().map_err(Error::Pipe)?;

	let mut cmd = Command::new(program_path(&descriptor.command));
	cmd.args(&descriptor.args)
		.stdin(input_reader)
		.stdout(output_writer)
		.stderr(error_writer)
		.kill_on_drop(true);

	let child = cmd.spawn().map_err(|source| Error::Launch {
		command: descriptor.command.clone(),
		source,
	})?;

	// The command still holds the child's pipe ends. Output EOF is only seen
	// once the parent copies are gone.
	drop(cmd);

	let input = pipe::Sender::from_owned_fd(OwnedFd::from(input_writer)).map_err(Error::Pipe)?;
	let output =
		pipe::Receiver::from_owned_fd(OwnedFd::from(output_reader)).map_err(Error::Pipe)?;

	Ok(ProcessHandle::started(descriptor, child, input, output))
}

/// Launches `descriptor` with piped input and output.
///
/// Merged output pipes are not available on this platform, so the child's
/// standard error is inherited from the bridge.
#[cfg(not(unix))]
pub fn launch(descriptor: &CommandDescriptor) -> Result<ProcessHandle> {
	use std::process::Stdio;

	let mut cmd = Command::new(program_path(&descriptor.command));
	cmd.args(&descriptor.args)
		.stdin(Stdio::piped())
		.stdout(Stdio::piped())
		.stderr(Stdio::inherit())
		.kill_on_drop(true);

	let mut child = cmd.spawn().map_err(|source| Error::Launch {
		command: descriptor.command.clone(),
		source,
	})?;
	drop(cmd);

	let input = child
		.stdin
		.take()
		.ok_or_else(|| Error::Pipe(std::io::Error::other("child stdin was not piped")))?;
	let output = child
		.stdout
		.take()
		.ok_or_else(|| Error::Pipe(std::io::Error::other("child stdout was not piped")))?;

	Ok(ProcessHandle::started(descriptor, child, input, output))
}

impl ProcessHandle {
	fn started(
		descriptor: &CommandDescriptor,
		child: Child,
		input: ProcessInput,
		output: ProcessOutput,
	) -> Self {
		let pid = child.id();
		info!(
			target = "stdiows",
			command = %descriptor.command,
			args = ?descriptor.args,
			pid,
			"process launched"
		);

		Self {
			child,
			pid,
			command: descriptor.command.clone(),
			input: Some(input),
			output: Some(output),
		}
	}
}
