//! Process → peer relay.

use axum::body::Bytes;
use stdiows_protocol::CLOSE_NORMAL;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::completion::Completion;
use crate::config::SessionConfig;
use crate::writer::FrameWriter;

/// Forwards process output to the peer, one binary frame per read.
///
/// Reads up to `read_chunk_size` bytes at a time and sends exactly what was
/// read, without waiting to fill a chunk. If the connection goes away, the
/// rest of the output is read and discarded so `done` still marks the end of
/// the output. Once the output is exhausted (or unreadable) it completes
/// `done`, queues a normal close frame and holds the connection open for
/// `close_grace` or until `closed` fires, whichever comes first. It always
/// completes `closed` on the way out.
pub async fn pump_outbound<R>(
	mut output: R,
	writer: FrameWriter,
	done: Completion,
	closed: Completion,
	config: SessionConfig,
) where
	R: AsyncRead + Unpin,
{
	let mut buf = vec![0u8; config.read_chunk_size];
	let mut connected = true;

	loop {
		let n = match output.read(&mut buf).await {
			Ok(0) => {
				debug!(target = "stdiows", "process output reached end of file");
				break;
			}
			Ok(n) => n,
			Err(error) => {
				debug!(target = "stdiows", %error, "reading process output failed");
				break;
			}
		};

		if !connected {
			continue;
		}

		trace!(target = "stdiows", bytes = n, "forwarding process output");
		if writer.send_binary(Bytes::copy_from_slice(&buf[..n])).await.is_err() {
			debug!(target = "stdiows", "connection writer gone, discarding process output");
			closed.complete();
			connected = false;
		}
	}

	drop(output);
	done.complete();

	if connected && writer.send_close(CLOSE_NORMAL, config.write_wait).await.is_ok() {
		tokio::select! {
			_ = tokio::time::sleep(config.close_grace) => {
				debug!(target = "stdiows", "close grace period elapsed");
			}
			_ = closed.wait() => {}
		}
	}

	closed.complete();
}
