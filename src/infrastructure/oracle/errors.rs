use reqwest::StatusCode;

use crate::domain::ports::OracleError;

/// Classify a non-success API status.
pub fn from_status(status: StatusCode, body: String) -> OracleError {
    match status.as_u16() {
        400 => OracleError::InvalidRequest(body),
        401 | 403 => OracleError::Authentication(body),
        429 => OracleError::RateLimited,
        408 => OracleError::Timeout,
        500..=599 => OracleError::Server(status.as_u16(), body),
        _ => OracleError::Other(format!("HTTP {status}: {body}")),
    }
}

/// Classify a transport-level failure.
pub fn from_reqwest(err: &reqwest::Error) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout
    } else if err.is_decode() {
        OracleError::Malformed(err.to_string())
    } else {
        OracleError::Network(err.to_string())
    }
}
