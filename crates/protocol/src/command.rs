//! The command an authorized session runs.

use serde::{Deserialize, Serialize};

/// Program and argument list returned by the authority for a token.
///
/// The descriptor is the only input that decides what gets executed; nothing
/// supplied by the connecting client besides the token flows into it.
///
/// ```json
/// { "command": "/bin/echo", "args": ["hi"] }
/// ```
///
/// `args` may be omitted and defaults to an empty list. Unknown fields are
/// ignored so the authority can grow its response without breaking bridges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDescriptor {
	/// Program to execute.
	pub command: String,
	/// Arguments passed after the program name, in order.
	#[serde(default)]
	pub args: Vec<String>,
}

impl CommandDescriptor {
	pub fn new(command: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
		Self {
			command: command.into(),
			args: args.into_iter().map(Into::into).collect(),
		}
	}

	/// Parses a descriptor from an authority response body.
	pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
		serde_json::from_slice(body)
	}
}
