//! stdiows - process stdio over WebSocket
//!
//! Exposes a program's standard input and output to a WebSocket peer. Each
//! upgrade request carries a token; an external authority maps the token to
//! the command the session may run. The bridge then launches that command
//! and relays bytes both ways until either side goes away.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │ server    GET /ws?token=...   │  token check, upgrade
//! │   └─ authorizer ──────────────┼──▶ external authority
//! ├───────────────────────────────┤
//! │ session   one per connection  │
//! │  ┌─────────┐  ┌──────────┐    │
//! │  │ inbound │  │ outbound │    │  pumps
//! │  └─────────┘  └──────────┘    │
//! │  ┌─────────┐  ┌──────────┐    │
//! │  │ writer  │  │keepalive │    │  single sink owner, pings
//! │  └─────────┘  └──────────┘    │
//! │  ┌─────────────────────────┐  │
//! │  │ shutdown                │  │  graceful, then forced stop
//! │  └─────────────────────────┘  │
//! ├───────────────────────────────┤
//! │ stdiows-runtime               │  launch, pipes, signals
//! └───────────────────────────────┘
//! ```

pub mod authorizer;
pub mod completion;
pub mod config;
pub mod error;
pub mod inbound;
pub mod keepalive;
pub mod outbound;
pub mod server;
pub mod session;
pub mod shutdown;
pub mod writer;

pub use authorizer::{Authorize, HttpAuthorizer};
pub use completion::Completion;
pub use config::{BridgeConfig, DEFAULT_AUTHORITY_URL, DEFAULT_LISTEN_ADDR, SessionConfig};
pub use error::{AuthorizationError, Error, Rejection, Result};
pub use inbound::InboundEnd;
pub use server::{BridgeState, router, serve, serve_on};
pub use shutdown::{ShutdownReport, ShutdownState};
pub use stdiows_protocol::CommandDescriptor;
pub use writer::{FrameWriter, WriterClosed};
