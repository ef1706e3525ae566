//! One bridge session.
//!
//! A session owns exactly one upgraded connection and one child process. It
//! wires them together with four tasks:
//!
//! ```text
//!                ┌──────────────┐  input pipe  ┌─────────┐
//!   stream ────▶ │ inbound pump │ ───────────▶ │         │
//!                └──────────────┘              │ process │
//!   sink ◀── writer ◀── outbound pump ◀─────── │         │
//!               ▲                 output pipe  └─────────┘
//!               └──── keepalive
//! ```
//!
//! The inbound pump runs on the session task itself; when it returns the
//! connection is closed at once, which unblocks any pending write, and the
//! process is shut down (see [`shutdown::coordinate`]). Both the connection and
//! the process are always released, on every path.

use std::fmt;
use std::io;

use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, Stream, StreamExt};
use stdiows_protocol::{CommandDescriptor, INTERNAL_ERROR_NOTICE};
use stdiows_runtime::{ProcessHandle, ProcessInput, ProcessOutput};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::completion::Completion;
use crate::config::SessionConfig;
use crate::inbound::pump_inbound;
use crate::keepalive;
use crate::outbound::pump_outbound;
use crate::shutdown::{self, ShutdownReport};
use crate::writer::FrameWriter;

/// Runs a session over an upgraded axum socket.
pub async fn run(socket: WebSocket, descriptor: CommandDescriptor, config: SessionConfig) {
	let (sink, stream) = socket.split();
	bridge(sink, stream, &descriptor, config).await;
}

/// Bridges `sink`/`stream` to a freshly launched `descriptor` process.
///
/// Returns `None` if the process could not be started; the peer then gets a
/// single text frame with a generic notice before the connection is closed.
/// Otherwise returns once the process has been reaped.
pub async fn bridge<Si, St, E>(
	sink: Si,
	stream: St,
	descriptor: &CommandDescriptor,
	config: SessionConfig,
) -> Option<ShutdownReport>
where
	Si: Sink<Message> + Send + Unpin + 'static,
	Si::Error: fmt::Display + Send,
	St: Stream<Item = Result<Message, E>> + Unpin,
	E: fmt::Display,
{
	let closed = Completion::new();
	let (writer, writer_task) = FrameWriter::spawn(sink, closed.clone(), &config);

	let (mut process, mut input, output) = match start(descriptor) {
		Ok(parts) => parts,
		Err(err) => {
			error!(
				target = "stdiows",
				command = %descriptor.command,
				resource = err.is_resource_error(),
				error = %err,
				"failed to start process"
			);
			if writer
				.send_text(INTERNAL_ERROR_NOTICE, config.write_wait)
				.await
				.is_err()
			{
				debug!(target = "stdiows", "connection gone before the error notice");
			}
			drop(writer);
			join("writer", writer_task).await;
			return None;
		}
	};

	let pid = process.pid();
	info!(target = "stdiows", pid, command = %descriptor.command, "session started");

	let done = Completion::new();
	let outbound = tokio::spawn(pump_outbound(
		output,
		writer.clone(),
		done.clone(),
		closed.clone(),
		config,
	));
	let pings = tokio::spawn(keepalive::run(writer, done.clone(), config));

	let end = pump_inbound(stream, &mut input, &closed, &config).await;
	debug!(target = "stdiows", pid, ?end, "inbound pump stopped");
	closed.complete();

	let report = shutdown::coordinate(&mut process, input, &done, &config).await;

	join("outbound", outbound).await;
	join("keepalive", pings).await;
	join("writer", writer_task).await;

	info!(
		target = "stdiows",
		pid,
		exit_status = ?report.exit_status,
		escalated = report.escalated(),
		"session closed"
	);
	Some(report)
}

fn start(
	descriptor: &CommandDescriptor,
) -> stdiows_runtime::Result<(ProcessHandle, ProcessInput, ProcessOutput)> {
	let mut process = stdiows_runtime::launch(descriptor)?;
	let input = process.take_input().ok_or_else(|| missing_pipe("input"))?;
	let output = process.take_output().ok_or_else(|| missing_pipe("output"))?;
	Ok((process, input, output))
}

fn missing_pipe(which: &str) -> stdiows_runtime::Error {
	stdiows_runtime::Error::Pipe(io::Error::other(format!("process {which} pipe unavailable")))
}

async fn join(task: &'static str, handle: JoinHandle<()>) {
	if let Err(err) = handle.await {
		warn!(target = "stdiows", task, error = %err, "session task failed");
	}
}
