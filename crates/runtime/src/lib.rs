//! stdiows runtime - child process ownership
//!
//! This crate owns everything that touches the operating system on behalf of
//! a bridge session:
//!
//! - **Launcher**: spawning the authorized command with an input pipe and a
//!   merged stdout/stderr pipe ([`launch`])
//! - **Handle**: the scoped [`ProcessHandle`] that keeps the bridge ends of both
//!   pipes and the child for reaping
//! - **Control**: the [`ProcessControl`] capability used to stop the child,
//!   graceful first and forced second, with a backend per platform
//!
//! Nothing here knows about WebSockets; the core crate wires the pipes to the
//! connection.

pub mod control;
pub mod error;
pub mod launcher;

pub use control::ProcessControl;
pub use error::{Error, Result};
pub use launcher::{ProcessHandle, ProcessInput, ProcessOutput, launch};
