use std::time::Duration;

pub const OK_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n";
pub const BAD_REQUEST: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: application/json\r\n\r\n";
pub const UNAUTHORIZED: &str = "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\n\r\n";
pub const FORBIDDEN: &str = "HTTP/1.1 403 Forbidden\r\nContent-Type: application/json\r\n\r\n";
pub const NOT_FOUND: &str = "HTTP/1.1 404 NOT FOUND\r\nContent-Type: application/json\r\n\r\n";
pub const REQUEST_TIMEOUT: &str =
    "HTTP/1.1 408 Request Timeout\r\nContent-Type: application/json\r\n\r\n";
pub const CONFLICT: &str = "HTTP/1.1 409 Conflict\r\nContent-Type: application/json\r\n\r\n";
pub const INTERNAL_ERROR: &str =
    "HTTP/1.1 500 INTERNAL ERROR\r\nContent-Type: application/json\r\n\r\n";

/// How long a client may take to send a complete request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest request body the server accepts.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

pub const REFERENCE_LEN: usize = 15;
pub const WALLET_ADDRESS_LEN: usize = 34;
pub const MIN_PASSWORD_LEN: usize = 6;
