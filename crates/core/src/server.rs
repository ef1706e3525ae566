//! HTTP front door: authorizes upgrade requests and hands sockets to sessions.

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::authorizer::{Authorize, HttpAuthorizer};
use crate::config::BridgeConfig;
use crate::error::{Error, Rejection, Result};
use crate::session;

/// Shared, read-only state of the upgrade endpoint.
#[derive(Clone)]
pub struct BridgeState {
	config: Arc<BridgeConfig>,
	authorizer: Arc<dyn Authorize>,
}

impl BridgeState {
	pub fn new(config: BridgeConfig, authorizer: Arc<dyn Authorize>) -> Self {
		Self {
			config: Arc::new(config),
			authorizer,
		}
	}

	/// State backed by an [`HttpAuthorizer`] for `config.authority_url`.
	pub fn from_config(config: BridgeConfig) -> Result<Self> {
		let authorizer = HttpAuthorizer::new(config.authority_url.clone())?;
		Ok(Self::new(config, Arc::new(authorizer)))
	}
}

/// Router with the `/ws` upgrade endpoint.
pub fn router(state: BridgeState) -> Router {
	Router::new().route("/ws", get(upgrade)).with_state(state)
}

/// Validates `config`, binds the listen address and serves until the
/// listener fails.
pub async fn serve(config: BridgeConfig) -> Result<()> {
	config.validate()?;
	let addr = config.listen;
	let state = BridgeState::from_config(config)?;

	let listener = TcpListener::bind(addr)
		.await
		.map_err(|source| Error::Bind { addr, source })?;

	serve_on(listener, state).await
}

/// Serves the upgrade endpoint on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: BridgeState) -> Result<()> {
	let addr = listener.local_addr().map_err(Error::Serve)?;
	info!(
		target = "stdiows",
		%addr,
		authority = %state.config.authority_url,
		"listening for upgrade requests"
	);

	axum::serve(listener, router(state).into_make_service())
		.await
		.map_err(Error::Serve)
}

#[derive(Debug, Deserialize)]
struct UpgradeQuery {
	token: Option<String>,
}

async fn upgrade(
	State(state): State<BridgeState>,
	query: std::result::Result<Query<UpgradeQuery>, QueryRejection>,
	ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
	let token = match query {
		Ok(Query(UpgradeQuery { token: Some(token) })) if !token.is_empty() => token,
		Ok(_) => return Rejection::MissingToken.into_response(),
		Err(rejection) => {
			debug!(target = "stdiows", error = %rejection, "unparseable upgrade query");
			return Rejection::MissingToken.into_response();
		}
	};

	let descriptor = match state.authorizer.authorize(&token).await {
		Ok(descriptor) => descriptor,
		Err(err) => {
			warn!(target = "stdiows", error = %err, "authorization failed");
			return Rejection::Unauthorized.into_response();
		}
	};

	let ws = match ws {
		Ok(ws) => ws,
		Err(rejection) => {
			debug!(target = "stdiows", error = %rejection, "request is not a websocket upgrade");
			return Rejection::UpgradeFailed.into_response();
		}
	};

	let limits = state.config.session;
	debug!(target = "stdiows", command = %descriptor.command, "upgrading connection");
	ws.max_message_size(limits.max_message_size)
		.max_frame_size(limits.max_message_size)
		.on_failed_upgrade(|error| {
			warn!(target = "stdiows", %error, "websocket handshake failed");
		})
		.on_upgrade(move |socket| session::run(socket, descriptor, limits))
}
