//! Peer → process relay.

use std::fmt;

use axum::extract::ws::Message;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::completion::Completion;
use crate::config::SessionConfig;

/// Why the inbound pump stopped. None of these is an error; each one starts
/// the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundEnd {
	/// The peer sent a close frame or the stream ended.
	PeerClosed,
	/// Reading from the connection failed.
	ReadError,
	/// No pong arrived within the liveness deadline.
	DeadlineExpired,
	/// The peer sent a frame above the size limit.
	FrameTooLarge,
	/// The connection was closed from this side.
	ConnectionClosed,
}

/// Relays frame payloads from `stream` into the process `input` until the
/// peer goes away.
///
/// Binary and text payloads are written in receive order. Pongs move the
/// liveness deadline to `now + pong_wait`; nothing else does. If the process
/// stops accepting input, the failure is logged and later payloads are
/// discarded while the pump keeps watching the connection.
pub async fn pump_inbound<St, E, W>(
	mut stream: St,
	input: &mut W,
	closed: &Completion,
	config: &SessionConfig,
) -> InboundEnd
where
	St: Stream<Item = Result<Message, E>> + Unpin,
	E: fmt::Display,
	W: AsyncWrite + Unpin + ?Sized,
{
	let mut deadline = Instant::now() + config.pong_wait;
	let mut input_open = true;

	loop {
		let next = tokio::select! {
			biased;
			_ = closed.wait() => return InboundEnd::ConnectionClosed,
			next = tokio::time::timeout_at(deadline, stream.next()) => next,
		};

		let message = match next {
			Err(_) => {
				debug!(target = "stdiows", "peer missed the liveness deadline");
				return InboundEnd::DeadlineExpired;
			}
			Ok(None) => return InboundEnd::PeerClosed,
			Ok(Some(Err(error))) => {
				debug!(target = "stdiows", %error, "connection read failed");
				return InboundEnd::ReadError;
			}
			Ok(Some(Ok(message))) => message,
		};

		let payload: &[u8] = match &message {
			Message::Binary(data) => &data[..],
			Message::Text(text) => text.as_str().as_bytes(),
			Message::Pong(_) => {
				trace!(target = "stdiows", "pong received");
				deadline = Instant::now() + config.pong_wait;
				continue;
			}
			Message::Ping(_) => continue,
			Message::Close(frame) => {
				debug!(
					target = "stdiows",
					code = frame.as_ref().map(|f| f.code),
					"peer closed the connection"
				);
				return InboundEnd::PeerClosed;
			}
		};

		if payload.len() > config.max_message_size {
			warn!(
				target = "stdiows",
				size = payload.len(),
				limit = config.max_message_size,
				"frame exceeds size limit"
			);
			return InboundEnd::FrameTooLarge;
		}

		if !input_open || payload.is_empty() {
			continue;
		}

		let written = tokio::select! {
			biased;
			_ = closed.wait() => return InboundEnd::ConnectionClosed,
			written = write_payload(input, payload) => written,
		};

		if let Err(error) = written {
			debug!(target = "stdiows", %error, "process input closed, discarding further input");
			input_open = false;
		}
	}
}

async fn write_payload<W>(input: &mut W, payload: &[u8]) -> std::io::Result<()>
where
	W: AsyncWrite + Unpin + ?Sized,
{
	input.write_all(payload).await?;
	input.flush().await
}

#[cfg(test)]
mod tests {
	use std::convert::Infallible;
	use std::time::Duration;

	use axum::body::Bytes;
	use axum::extract::ws::{CloseFrame, Utf8Bytes};
	use futures::channel::mpsc as fmpsc;
	use tokio::io::AsyncReadExt;

	use super::*;

	type Frames = fmpsc::UnboundedSender<Result<Message, Infallible>>;

	fn connection() -> (Frames, fmpsc::UnboundedReceiver<Result<Message, Infallible>>) {
		fmpsc::unbounded()
	}

	fn binary(data: &'static [u8]) -> Result<Message, Infallible> {
		Ok(Message::Binary(Bytes::from_static(data)))
	}

	#[tokio::test]
	async fn test_payloads_arrive_in_order() {
		let (peer, stream) = connection();
		peer.unbounded_send(binary(b"ab")).unwrap();
		peer.unbounded_send(Ok(Message::Text(Utf8Bytes::from_static("cd")))).unwrap();
		peer.unbounded_send(Ok(Message::Ping(Bytes::new()))).unwrap();
		peer.unbounded_send(binary(b"")).unwrap();
		peer.unbounded_send(binary(b"ef")).unwrap();
		peer.unbounded_send(Ok(Message::Close(Some(CloseFrame {
			code: 1000,
			reason: Utf8Bytes::from_static(""),
		}))))
		.unwrap();
		peer.unbounded_send(binary(b"never")).unwrap();

		let (mut input, mut process_side) = tokio::io::duplex(1024);
		let end = pump_inbound(stream, &mut input, &Completion::new(), &SessionConfig::default()).await;
		assert_eq!(end, InboundEnd::PeerClosed);
		drop(input);

		let mut received = Vec::new();
		process_side.read_to_end(&mut received).await.unwrap();
		assert_eq!(received, b"abcdef");
	}

	#[tokio::test]
	async fn test_end_of_stream_is_peer_close() {
		let (peer, stream) = connection();
		peer.unbounded_send(binary(b"last")).unwrap();
		drop(peer);

		let mut input = Vec::new();
		let end = pump_inbound(stream, &mut input, &Completion::new(), &SessionConfig::default()).await;
		assert_eq!(end, InboundEnd::PeerClosed);
		assert_eq!(input, b"last");
	}

	#[tokio::test]
	async fn test_read_error_stops_pump() {
		let (peer, stream) = fmpsc::unbounded::<Result<Message, String>>();
		peer.unbounded_send(Err("connection reset".to_string())).unwrap();

		let mut input = Vec::new();
		let end = pump_inbound(stream, &mut input, &Completion::new(), &SessionConfig::default()).await;
		assert_eq!(end, InboundEnd::ReadError);
	}

	#[tokio::test]
	async fn test_oversized_frame_stops_pump() {
		let (peer, stream) = connection();
		let mut config = SessionConfig::default();
		config.max_message_size = 4;
		peer.unbounded_send(binary(b"1234")).unwrap();
		peer.unbounded_send(binary(b"12345")).unwrap();

		let mut input = Vec::new();
		let end = pump_inbound(stream, &mut input, &Completion::new(), &config).await;
		assert_eq!(end, InboundEnd::FrameTooLarge);
		assert_eq!(input, b"1234");
	}

	#[tokio::test(start_paused = true)]
	async fn test_silence_expires_the_deadline() {
		let (_peer, stream) = connection();
		let config = SessionConfig::default();
		let started = Instant::now();

		let mut input = Vec::new();
		let end = pump_inbound(stream, &mut input, &Completion::new(), &config).await;
		assert_eq!(end, InboundEnd::DeadlineExpired);
		assert_eq!(started.elapsed(), config.pong_wait);
	}

	#[tokio::test(start_paused = true)]
	async fn test_pong_extends_deadline_but_data_does_not() {
		let (peer, stream) = connection();
		let config = SessionConfig::default();
		let started = Instant::now();

		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_secs(30)).await;
			peer.unbounded_send(Ok(Message::Pong(Bytes::new()))).unwrap();
			tokio::time::sleep(Duration::from_secs(50)).await;
			peer.unbounded_send(binary(b"data")).unwrap();
			// Keep the stream open past the deadline.
			tokio::time::sleep(Duration::from_secs(3600)).await;
			drop(peer);
		});

		let mut input = Vec::new();
		let end = pump_inbound(stream, &mut input, &Completion::new(), &config).await;
		assert_eq!(end, InboundEnd::DeadlineExpired);
		assert_eq!(started.elapsed(), Duration::from_secs(30) + config.pong_wait);
		assert_eq!(input, b"data");
	}

	#[tokio::test]
	async fn test_close_latch_unblocks_read() {
		let (_peer, stream) = connection();
		let closed = Completion::new();
		let trigger = closed.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			trigger.complete();
		});

		let mut input = Vec::new();
		let end = pump_inbound(stream, &mut input, &closed, &SessionConfig::default()).await;
		assert_eq!(end, InboundEnd::ConnectionClosed);
	}

	#[tokio::test]
	async fn test_broken_input_keeps_draining() {
		let (peer, stream) = connection();
		let (mut input, process_side) = tokio::io::duplex(16);
		drop(process_side);

		peer.unbounded_send(binary(b"first")).unwrap();
		peer.unbounded_send(binary(b"second")).unwrap();
		peer.unbounded_send(Ok(Message::Close(None))).unwrap();

		let end = pump_inbound(stream, &mut input, &Completion::new(), &SessionConfig::default()).await;
		assert_eq!(end, InboundEnd::PeerClosed);
	}
}
