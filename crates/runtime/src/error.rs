//! Error types for the stdiows runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while bringing up a session's process.
#[derive(Debug, Error)]
pub enum Error {
	/// A pipe could not be created or registered with the reactor.
	///
	/// Any child spawned before the failure has already been killed.
	#[error("failed to set up process pipes: {0}")]
	Pipe(#[source] std::io::Error),

	/// The operating system refused to start the program.
	#[error("failed to start `{command}`: {source}")]
	Launch {
		command: String,
		#[source]
		source: std::io::Error,
	},
}

impl Error {
	/// Returns true for pipe failures as opposed to the program failing to start.
	pub fn is_resource_error(&self) -> bool {
		matches!(self, Error::Pipe(_))
	}
}
