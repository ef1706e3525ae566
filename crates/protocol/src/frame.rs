//! Constants describing the upgraded connection.

/// Query parameter carrying the session token, both on the upgrade endpoint
/// and on the outbound authority request.
pub const TOKEN_PARAM: &str = "token";

/// Body of the single text frame sent when the process cannot be started
/// after the connection was already upgraded.
pub const INTERNAL_ERROR_NOTICE: &str = "Internal server error.";

/// WebSocket close code for a normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
