//! Session teardown with escalation.
//!
//! Once the inbound pump stops, the process is wound down in a fixed order:
//!
//! ```text
//! Running → InboundClosed → GracefulSignalSent → [ForcedSignalSent] → Reaped
//! ```
//!
//! The forced step is only taken when the process output is still open
//! `kill_timeout` after the graceful request. States never move backwards.

use std::process::ExitStatus;

use stdiows_runtime::ProcessControl;
use tracing::{debug, warn};

use crate::completion::Completion;
use crate::config::SessionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShutdownState {
	Running,
	InboundClosed,
	GracefulSignalSent,
	ForcedSignalSent,
	Reaped,
}

/// Records the states a teardown has passed through.
#[derive(Debug, Clone)]
pub struct ShutdownTracker {
	trail: Vec<ShutdownState>,
}

impl ShutdownTracker {
	pub fn new() -> Self {
		Self {
			trail: vec![ShutdownState::Running],
		}
	}

	pub fn current(&self) -> ShutdownState {
		self.trail
			.last()
			.copied()
			.unwrap_or(ShutdownState::Running)
	}

	/// Moves to `next`. Returns `false` and stays put if `next` is not ahead
	/// of the current state.
	pub fn advance(&mut self, next: ShutdownState) -> bool {
		if next <= self.current() {
			return false;
		}
		self.trail.push(next);
		true
	}

	pub fn trail(&self) -> &[ShutdownState] {
		&self.trail
	}
}

impl Default for ShutdownTracker {
	fn default() -> Self {
		Self::new()
	}
}

/// Outcome of one teardown.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
	pub trail: Vec<ShutdownState>,
	/// `None` if waiting for the process failed.
	pub exit_status: Option<ExitStatus>,
}

impl ShutdownReport {
	/// Whether the process had to be stopped forcibly.
	pub fn escalated(&self) -> bool {
		self.trail.contains(&ShutdownState::ForcedSignalSent)
	}
}

/// Winds the process down after the inbound pump has stopped.
///
/// Closes the process input, asks the process to stop, and gives it
/// `kill_timeout` to finish its output (observed through `outbound_done`).
/// If the output is still open after that, the process is stopped forcibly
/// and the output is awaited again. Finally the process is reaped so no
/// zombie remains. Signal failures are logged and never abort the sequence.
pub async fn coordinate<P, I>(
	process: &mut P,
	input: I,
	outbound_done: &Completion,
	config: &SessionConfig,
) -> ShutdownReport
where
	P: ProcessControl + ?Sized,
{
	let mut tracker = ShutdownTracker::new();

	drop(input);
	tracker.advance(ShutdownState::InboundClosed);

	if let Err(error) = process.request_graceful_stop() {
		debug!(target = "stdiows", %error, "graceful stop request failed");
	}
	tracker.advance(ShutdownState::GracefulSignalSent);

	if tokio::time::timeout(config.kill_timeout, outbound_done.wait())
		.await
		.is_err()
	{
		debug!(
			target = "stdiows",
			timeout = ?config.kill_timeout,
			"process still running, stopping it forcibly"
		);
		if let Err(error) = process.request_forced_stop() {
			warn!(target = "stdiows", %error, "forced stop request failed");
		}
		tracker.advance(ShutdownState::ForcedSignalSent);
		outbound_done.wait().await;
	}

	let exit_status = match process.wait().await {
		Ok(status) => Some(status),
		Err(error) => {
			warn!(target = "stdiows", %error, "waiting for process failed");
			None
		}
	};
	tracker.advance(ShutdownState::Reaped);

	ShutdownReport {
		trail: tracker.trail,
		exit_status,
	}
}

#[cfg(all(test, unix))]
mod tests {
	use std::io;
	use std::sync::{Arc, Mutex};
	use std::time::Duration;

	use async_trait::async_trait;
	use tokio::time::Instant;

	use super::*;

	fn exited(code: i32) -> ExitStatus {
		use std::os::unix::process::ExitStatusExt;
		ExitStatus::from_raw(code << 8)
	}

	#[derive(Debug, Clone, Copy, PartialEq, Eq)]
	enum Behavior {
		/// Output closes as soon as the graceful request arrives.
		Cooperative,
		/// Ignores the graceful request; output closes on the forced one.
		Stubborn,
		/// Both requests fail, output closes on its own after a delay.
		Unreachable(Duration),
	}

	struct MockProcess {
		behavior: Behavior,
		output: Completion,
		calls: Arc<Mutex<Vec<&'static str>>>,
	}

	impl MockProcess {
		fn new(behavior: Behavior, output: Completion) -> Self {
			Self {
				behavior,
				output,
				calls: Arc::default(),
			}
		}

		fn calls(&self) -> Vec<&'static str> {
			self.calls.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl ProcessControl for MockProcess {
		fn request_graceful_stop(&mut self) -> io::Result<()> {
			self.calls.lock().unwrap().push("graceful");
			match self.behavior {
				Behavior::Cooperative => {
					self.output.complete();
					Ok(())
				}
				Behavior::Stubborn => Ok(()),
				Behavior::Unreachable(delay) => {
					let output = self.output.clone();
					tokio::spawn(async move {
						tokio::time::sleep(delay).await;
						output.complete();
					});
					Err(io::Error::new(io::ErrorKind::NotFound, "no such process"))
				}
			}
		}

		fn request_forced_stop(&mut self) -> io::Result<()> {
			self.calls.lock().unwrap().push("forced");
			match self.behavior {
				Behavior::Unreachable(_) => {
					Err(io::Error::new(io::ErrorKind::NotFound, "no such process"))
				}
				_ => {
					self.output.complete();
					Ok(())
				}
			}
		}

		async fn wait(&mut self) -> io::Result<ExitStatus> {
			self.calls.lock().unwrap().push("wait");
			Ok(exited(0))
		}
	}

	/// Stand-in for the process input; records when it is dropped.
	struct Input(Arc<Mutex<Vec<&'static str>>>);

	impl Drop for Input {
		fn drop(&mut self) {
			self.0.lock().unwrap().push("input closed");
		}
	}

	#[test]
	fn test_tracker_refuses_backward_moves() {
		let mut tracker = ShutdownTracker::new();
		assert_eq!(tracker.current(), ShutdownState::Running);
		assert!(tracker.advance(ShutdownState::InboundClosed));
		assert!(tracker.advance(ShutdownState::Reaped));
		assert!(!tracker.advance(ShutdownState::GracefulSignalSent));
		assert!(!tracker.advance(ShutdownState::Reaped));
		assert_eq!(
			tracker.trail(),
			&[ShutdownState::Running, ShutdownState::InboundClosed, ShutdownState::Reaped]
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cooperative_process_is_not_escalated() {
		let output = Completion::new();
		let mut process = MockProcess::new(Behavior::Cooperative, output.clone());
		let input = Input(process.calls.clone());
		let started = Instant::now();

		let report = coordinate(&mut process, input, &output, &SessionConfig::default()).await;

		assert!(!report.escalated());
		assert_eq!(started.elapsed(), Duration::ZERO);
		assert_eq!(
			report.trail,
			vec![
				ShutdownState::Running,
				ShutdownState::InboundClosed,
				ShutdownState::GracefulSignalSent,
				ShutdownState::Reaped,
			]
		);
		assert_eq!(process.calls(), vec!["input closed", "graceful", "wait"]);
		assert!(report.exit_status.unwrap().success());
	}

	#[tokio::test(start_paused = true)]
	async fn test_stubborn_process_is_killed_after_timeout() {
		let config = SessionConfig::default();
		let output = Completion::new();
		let mut process = MockProcess::new(Behavior::Stubborn, output.clone());
		let input = Input(process.calls.clone());
		let started = Instant::now();

		let report = coordinate(&mut process, input, &output, &config).await;

		assert!(report.escalated());
		assert_eq!(started.elapsed(), config.kill_timeout);
		assert_eq!(
			process.calls(),
			vec!["input closed", "graceful", "forced", "wait"]
		);
		assert_eq!(report.trail.last(), Some(&ShutdownState::Reaped));
	}

	#[tokio::test(start_paused = true)]
	async fn test_output_already_done_skips_escalation() {
		let output = Completion::new();
		output.complete();
		let mut process = MockProcess::new(Behavior::Stubborn, output.clone());

		let report = coordinate(&mut process, (), &output, &SessionConfig::default()).await;

		assert!(!report.escalated());
		assert_eq!(process.calls(), vec!["graceful", "wait"]);
	}

	#[tokio::test(start_paused = true)]
	async fn test_signal_failures_do_not_abort_teardown() {
		let config = SessionConfig::default();
		let output = Completion::new();
		let mut process = MockProcess::new(
			Behavior::Unreachable(Duration::from_secs(3)),
			output.clone(),
		);
		let started = Instant::now();

		let report = coordinate(&mut process, (), &output, &config).await;

		assert!(report.escalated());
		assert_eq!(started.elapsed(), Duration::from_secs(3));
		assert_eq!(process.calls(), vec!["graceful", "forced", "wait"]);
		assert_eq!(report.trail.last(), Some(&ShutdownState::Reaped));
	}
}
