//! Single writer for the connection sink.
//!
//! Data frames from the outbound pump and pings from the keepalive both end
//! up on one WebSocket. Only the writer task owns the sink; everyone else
//! holds a [`FrameWriter`] and queues frames through a bounded channel, so two
//! frames can never be written concurrently.

use std::fmt;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes};
use futures::{Sink, SinkExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::completion::Completion;
use crate::config::SessionConfig;

/// The writer task has stopped; the connection is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("connection writer has shut down")]
pub struct WriterClosed;

#[derive(Debug)]
struct Outgoing {
	message: Message,
	timeout: Option<Duration>,
}

/// Cloneable handle that queues frames for the writer task.
#[derive(Debug, Clone)]
pub struct FrameWriter {
	tx: mpsc::Sender<Outgoing>,
}

impl FrameWriter {
	/// Spawns the writer task that owns `sink`.
	///
	/// The task stops when every handle is dropped (closing the sink
	/// politely), when `closed` completes, or when a non-ping frame cannot be
	/// written, in which case it completes `closed` itself.
	pub fn spawn<Si>(sink: Si, closed: Completion, config: &SessionConfig) -> (Self, JoinHandle<()>)
	where
		Si: Sink<Message> + Send + Unpin + 'static,
		Si::Error: fmt::Display + Send,
	{
		let (tx, rx) = mpsc::channel(config.write_queue);
		let task = tokio::spawn(run_writer(sink, rx, closed, config.write_wait));
		(Self { tx }, task)
	}

	/// Queues a binary frame. Data frames are written without a deadline.
	pub async fn send_binary(&self, data: Bytes) -> Result<(), WriterClosed> {
		self.enqueue(Message::Binary(data), None).await
	}

	pub async fn send_text(&self, text: &'static str, timeout: Duration) -> Result<(), WriterClosed> {
		self.enqueue(Message::Text(Utf8Bytes::from_static(text)), Some(timeout))
			.await
	}

	pub async fn send_ping(&self, timeout: Duration) -> Result<(), WriterClosed> {
		self.enqueue(Message::Ping(Bytes::new()), Some(timeout)).await
	}

	pub async fn send_close(&self, code: u16, timeout: Duration) -> Result<(), WriterClosed> {
		let frame = CloseFrame {
			code,
			reason: Utf8Bytes::from_static(""),
		};
		self.enqueue(Message::Close(Some(frame)), Some(timeout)).await
	}

	async fn enqueue(&self, message: Message, timeout: Option<Duration>) -> Result<(), WriterClosed> {
		self.tx
			.send(Outgoing { message, timeout })
			.await
			.map_err(|_| WriterClosed)
	}
}

fn frame_kind(message: &Message) -> &'static str {
	match message {
		Message::Binary(_) => "binary",
		Message::Text(_) => "text",
		Message::Ping(_) => "ping",
		Message::Pong(_) => "pong",
		Message::Close(_) => "close",
	}
}

async fn run_writer<Si>(
	mut sink: Si,
	mut rx: mpsc::Receiver<Outgoing>,
	closed: Completion,
	write_wait: Duration,
) where
	Si: Sink<Message> + Unpin,
	Si::Error: fmt::Display,
{
	loop {
		let outgoing = tokio::select! {
			biased;
			_ = closed.wait() => {
				debug!(target = "stdiows", "connection closed, writer stopping");
				return;
			}
			next = rx.recv() => match next {
				Some(outgoing) => outgoing,
				None => break,
			},
		};

		let Outgoing { message, timeout } = outgoing;
		let kind = frame_kind(&message);
		let is_ping = matches!(message, Message::Ping(_));
		let write = async {
			match timeout {
				Some(limit) => match tokio::time::timeout(limit, sink.send(message)).await {
					Ok(result) => result.map_err(|e| e.to_string()),
					Err(_) => Err(format!("write timed out after {limit:?}")),
				},
				None => sink.send(message).await.map_err(|e| e.to_string()),
			}
		};

		let result = tokio::select! {
			biased;
			_ = closed.wait() => {
				debug!(target = "stdiows", kind, "connection closed during write");
				return;
			}
			result = write => result,
		};

		if let Err(error) = result {
			if is_ping {
				warn!(target = "stdiows", %error, "liveness ping failed");
				continue;
			}
			debug!(target = "stdiows", kind, %error, "frame write failed, closing connection");
			closed.complete();
			return;
		}
	}

	match tokio::time::timeout(write_wait, sink.close()).await {
		Ok(Ok(())) => {}
		Ok(Err(error)) => debug!(target = "stdiows", %error, "closing sink failed"),
		Err(_) => debug!(target = "stdiows", "closing sink timed out"),
	}
}
