//! Startup configuration.
//!
//! A [`BridgeConfig`] is built once from the command line and shared read-only
//! by every session. Timing and size limits live in [`SessionConfig`].

use std::net::SocketAddr;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Authority consulted when no `--controller-url` is given.
pub const DEFAULT_AUTHORITY_URL: &str = "http://127.0.0.1/ws-controller";

/// Listen address used when no `--listen` is given.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8866";

/// Per-session timing and size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
	/// Time allowed for a control frame (ping, close, error notice) to be written.
	pub write_wait: Duration,
	/// Time allowed between pongs before the peer is considered gone.
	pub pong_wait: Duration,
	/// Interval between pings. Must be shorter than `pong_wait`.
	pub ping_period: Duration,
	/// Time the connection stays open after the close frame was queued.
	pub close_grace: Duration,
	/// Time a process gets to finish its output after the graceful stop request.
	pub kill_timeout: Duration,
	/// Largest frame accepted from the peer, in bytes.
	pub max_message_size: usize,
	/// Size of each read from the process output, and so the largest outbound frame.
	pub read_chunk_size: usize,
	/// Frames that may wait for the writer before producers block.
	pub write_queue: usize,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self::with_pong_wait(Duration::from_secs(60))
	}
}

impl SessionConfig {
	/// Default limits with `pong_wait` replaced and the ping period derived
	/// from it (nine tenths of the wait).
	pub fn with_pong_wait(pong_wait: Duration) -> Self {
		Self {
			write_wait: Duration::from_secs(10),
			pong_wait,
			ping_period: pong_wait * 9 / 10,
			close_grace: Duration::from_secs(10),
			kill_timeout: Duration::from_secs(1),
			max_message_size: 8192,
			read_chunk_size: 1024,
			write_queue: 32,
		}
	}

	/// Checks the invariants the pumps rely on.
	pub fn validate(&self) -> Result<()> {
		if self.ping_period.is_zero() {
			return Err(Error::Config("ping period must be non-zero".into()));
		}
		if self.ping_period >= self.pong_wait {
			return Err(Error::Config(format!(
				"ping period {:?} must be shorter than pong wait {:?}",
				self.ping_period, self.pong_wait
			)));
		}
		if self.max_message_size == 0 || self.read_chunk_size == 0 || self.write_queue == 0 {
			return Err(Error::Config(
				"message size, read chunk size and write queue must be non-zero".into(),
			));
		}
		Ok(())
	}
}

/// Process-wide configuration, immutable after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
	/// Endpoint that maps a token to a command.
	pub authority_url: Url,
	/// Address the upgrade endpoint listens on.
	pub listen: SocketAddr,
	pub session: SessionConfig,
}

impl BridgeConfig {
	pub fn new(authority_url: Url, listen: SocketAddr) -> Self {
		Self {
			authority_url,
			listen,
			session: SessionConfig::default(),
		}
	}

	pub fn validate(&self) -> Result<()> {
		match self.authority_url.scheme() {
			"http" | "https" => {}
			other => {
				return Err(Error::Config(format!(
					"authority URL must be http or https, got `{other}`"
				)));
			}
		}
		self.session.validate()
	}
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self::new(
			Url::parse(DEFAULT_AUTHORITY_URL).expect("default authority URL is valid"),
			DEFAULT_LISTEN_ADDR
				.parse()
				.expect("default listen address is valid"),
		)
	}
}
