//! Token lookup against the external authority.

use std::time::Duration;

use async_trait::async_trait;
use stdiows_protocol::{CommandDescriptor, TOKEN_PARAM};
use tracing::debug;
use url::Url;

use crate::error::{AuthorizationError, Result};

/// Upper bound for one authority round trip.
const AUTHORITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Maps a session token to the command that session may run.
///
/// Called once per upgrade request, never retried.
#[async_trait]
pub trait Authorize: Send + Sync {
	async fn authorize(&self, token: &str) -> std::result::Result<CommandDescriptor, AuthorizationError>;
}

/// [`Authorize`] implementation backed by an HTTP authority.
///
/// Sends `GET <authority>?token=<token>` and expects `200 OK` with a JSON
/// [`CommandDescriptor`] body. Any other status, 2xx included, is a refusal.
/// Query parameters already present on the authority URL are kept.
#[derive(Debug, Clone)]
pub struct HttpAuthorizer {
	client: reqwest::Client,
	authority: Url,
}

impl HttpAuthorizer {
	/// Builds the shared HTTP client once; every request reuses it.
	pub fn new(authority: Url) -> Result<Self> {
		let client = reqwest::Client::builder()
			.timeout(AUTHORITY_TIMEOUT)
			.build()?;
		Ok(Self::with_client(client, authority))
	}

	pub fn with_client(client: reqwest::Client, authority: Url) -> Self {
		Self { client, authority }
	}
}

#[async_trait]
impl Authorize for HttpAuthorizer {
	async fn authorize(&self, token: &str) -> std::result::Result<CommandDescriptor, AuthorizationError> {
		debug!(target = "stdiows", authority = %self.authority, "authorizing session");

		let response = self
			.client
			.get(self.authority.clone())
			.query(&[(TOKEN_PARAM, token)])
			.send()
			.await
			.map_err(AuthorizationError::Unreachable)?;

		let status = response.status();
		if status != reqwest::StatusCode::OK {
			return Err(AuthorizationError::Status(status));
		}

		let body = response
			.bytes()
			.await
			.map_err(AuthorizationError::Unreachable)?;
		CommandDescriptor::from_slice(&body).map_err(AuthorizationError::MalformedBody)
	}
}
