//! Liveness pings.

use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::completion::Completion;
use crate::config::SessionConfig;
use crate::writer::FrameWriter;

/// Sends a ping every `ping_period` until `done` completes.
///
/// The first ping goes out one full period after the session starts. A ping
/// that cannot be written does not stop the probing; the inbound deadline is
/// what ends a dead session.
pub async fn run(writer: FrameWriter, done: Completion, config: SessionConfig) {
	let mut ticker = tokio::time::interval_at(Instant::now() + config.ping_period, config.ping_period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			biased;
			_ = done.wait() => break,
			_ = ticker.tick() => {
				trace!(target = "stdiows", "sending ping");
				if writer.send_ping(config.write_wait).await.is_err() {
					debug!(target = "stdiows", "connection writer gone, ping not sent");
				}
			}
		}
	}
}
