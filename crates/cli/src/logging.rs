use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Filter used when `RUST_LOG` is not set.
///
/// 0 = session lifecycle and failures, 1 (-v) = pump endings, teardown steps
/// and rejected requests, 2+ (-vv) = every frame and ping.
pub fn default_directive(verbosity: u8) -> &'static str {
	match verbosity {
		0 => "info",
		1 => "debug",
		_ => "trace",
	}
}

/// Installs the global subscriber. Everything goes to stderr; stdout stays
/// unused.
pub fn init_logging(verbosity: u8) {
	let env_filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_ansi(std::io::stderr().is_terminal())
		.with_target(true)
		.with_level(true)
		.compact()
		.init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_verbosity_raises_detail() {
		assert_eq!(default_directive(0), "info");
		assert_eq!(default_directive(1), "debug");
		assert_eq!(default_directive(2), "trace");
		assert_eq!(default_directive(7), "trace");
	}

	#[test]
	fn test_directives_parse() {
		for verbosity in 0..3 {
			assert!(EnvFilter::try_new(default_directive(verbosity)).is_ok());
		}
	}
}
