//! Blocking HTTP clients for Pivotal Tracker and Trello.
//!
//! Both clients turn every failure into a [`RemoteError`] with a kind the
//! retry executor understands; neither retries on its own.

pub mod pivotal;
pub mod trello;

use std::io::{self, Read};
use std::time::Duration;

use pivotrello_core::error::{RemoteError, RemoteErrorKind};
use serde::de::DeserializeOwned;

const TIMEOUT: Duration = Duration::from_secs(60);

/// Longest slice of an error body kept in messages.
const BODY_EXCERPT: usize = 200;

pub fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(TIMEOUT)
        .user_agent(concat!("pivotrello/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Failure kind for an HTTP error status.
pub const fn status_kind(status: u16) -> RemoteErrorKind {
    match status {
        408 => RemoteErrorKind::Timeout,
        429 => RemoteErrorKind::RateLimited,
        401 | 403 => RemoteErrorKind::Unauthorized,
        404 => RemoteErrorKind::NotFound,
        500..=599 => RemoteErrorKind::Server,
        _ => RemoteErrorKind::Rejected,
    }
}

pub fn classify(service: &str, err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            let excerpt: String = body.trim().chars().take(BODY_EXCERPT).collect();
            RemoteError::new(
                status_kind(status),
                format!("{service} returned HTTP {status}: {excerpt}"),
            )
        }
        ureq::Error::Transport(transport) => RemoteError::new(
            RemoteErrorKind::Network,
            format!("{service} unreachable: {transport}"),
        ),
    }
}

/// Failure kind for an error raised while reading a response body.
pub fn body_error_kind(err: &io::Error) -> RemoteErrorKind {
    match err.kind() {
        io::ErrorKind::InvalidData => RemoteErrorKind::Decode,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => RemoteErrorKind::Timeout,
        _ => RemoteErrorKind::Network,
    }
}

/// Read the whole body, then decode it.
///
/// `into_json` reports a dropped connection as invalid data, so the body is
/// read first to keep transport failures retryable.
pub fn read_json<T: DeserializeOwned>(
    service: &str,
    response: ureq::Response,
) -> Result<T, RemoteError> {
    let mut body = String::new();
    response
        .into_reader()
        .read_to_string(&mut body)
        .map_err(|err| {
            RemoteError::new(
                body_error_kind(&err),
                format!("{service} response was cut off: {err}"),
            )
        })?;
    serde_json::from_str(&body).map_err(|err| {
        RemoteError::new(
            RemoteErrorKind::Decode,
            format!("{service} sent an unreadable response: {err}"),
        )
    })
}
