//! Wire types for the stdiows bridge.
//!
//! This crate holds the shapes that cross a process or network boundary:
//!
//! - [`CommandDescriptor`]: the authority's answer to a token lookup
//! - [`frame`]: constants for the upgraded WebSocket connection
//!
//! Nothing here performs I/O.

pub mod command;
pub mod frame;

pub use command::CommandDescriptor;
pub use frame::{CLOSE_NORMAL, INTERNAL_ERROR_NOTICE, TOKEN_PARAM};
