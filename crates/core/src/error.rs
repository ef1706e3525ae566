use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Startup and server errors.
#[derive(Debug, Error)]
pub enum Error {
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("failed to build authority client: {0}")]
	Http(#[from] reqwest::Error),

	#[error("failed to bind {addr}: {source}")]
	Bind {
		addr: SocketAddr,
		#[source]
		source: std::io::Error,
	},

	#[error("server error: {0}")]
	Serve(#[source] std::io::Error),
}

/// Why the authority did not hand out a command.
#[derive(Debug, Error)]
pub enum AuthorizationError {
	#[error("authority unreachable: {0}")]
	Unreachable(#[source] reqwest::Error),

	#[error("authority answered {0}")]
	Status(reqwest::StatusCode),

	#[error("authority response is not a command descriptor: {0}")]
	MalformedBody(#[source] serde_json::Error),
}

/// Plain HTTP answer for an upgrade request that is turned away.
///
/// Every rejection happens before a connection or process exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
	#[error("Token missing")]
	MissingToken,

	#[error("Invalid token")]
	Unauthorized,

	#[error("Upgrade failed")]
	UpgradeFailed,
}

impl Rejection {
	pub fn status(&self) -> StatusCode {
		match self {
			Rejection::MissingToken | Rejection::UpgradeFailed => StatusCode::BAD_REQUEST,
			Rejection::Unauthorized => StatusCode::FORBIDDEN,
		}
	}
}

impl IntoResponse for Rejection {
	fn into_response(self) -> Response {
		(self.status(), self.to_string()).into_response()
	}
}
