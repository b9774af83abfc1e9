use std::fmt;

use serde::Serialize;

use crate::order::OrderError;

/// Machine-readable error codes for operator-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingCredentials,
    BrokenOrderChain,
    DuplicateCards,
    RemoteUnavailable,
    RemoteRejected,
    Unauthorized,
    OperatorAbort,
    InteractionFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::MissingCredentials => "E1002",
            Self::BrokenOrderChain => "E2001",
            Self::DuplicateCards => "E2002",
            Self::RemoteUnavailable => "E3001",
            Self::RemoteRejected => "E3002",
            Self::Unauthorized => "E3003",
            Self::OperatorAbort => "E4001",
            Self::InteractionFailed => "E4002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MissingCredentials => "Missing API credentials",
            Self::BrokenOrderChain => "Story ordering chain is broken",
            Self::DuplicateCards => "Duplicate cards on board",
            Self::RemoteUnavailable => "Remote API unavailable",
            Self::RemoteRejected => "Remote API rejected the request",
            Self::Unauthorized => "Remote API refused the credentials",
            Self::OperatorAbort => "Aborted by operator",
            Self::InteractionFailed => "Interactive prompt failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the pivotrello config.toml and retry."),
            Self::MissingCredentials => Some(
                "Pass --pivotal-token/--trello-key/--trello-token or set PIVOTAL_TOKEN, TRELLO_KEY, TRELLO_TOKEN.",
            ),
            Self::BrokenOrderChain => {
                Some("Reorder one story in Pivotal to rebuild its before/after links, then rerun.")
            }
            Self::DuplicateCards => {
                Some("Run `pivotrello duplicates --board <id>` and delete the extra cards.")
            }
            Self::RemoteUnavailable => {
                Some("Rerun later; use --resume-after <story id> to skip finished stories.")
            }
            Self::RemoteRejected => None,
            Self::Unauthorized => Some("Check that the API token is valid and has board access."),
            Self::OperatorAbort => None,
            Self::InteractionFailed => Some("Run from an interactive terminal."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure category reported by a remote collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Connection refused, DNS failure, reset socket.
    Network,
    /// Request or connect timeout.
    Timeout,
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx or an otherwise generic remote failure.
    Server,
    /// HTTP 401/403.
    Unauthorized,
    /// HTTP 404.
    NotFound,
    /// Any other 4xx.
    Rejected,
    /// Response body did not decode.
    Decode,
}

impl RemoteErrorKind {
    /// Whether a failure of this kind is worth retrying.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Server
        )
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Server => "server",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call against Pivotal or Trello.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Errors that stop a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A remote call failed for good: retries exhausted or not retryable.
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Remote {
        operation: String,
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    /// Stories could not be put in a total order.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The operator chose to stop.
    #[error("aborted: {0}")]
    Aborted(String),

    /// Prompting the operator failed (no TTY, closed stdin).
    #[error("operator interaction failed: {0}")]
    Interaction(String),
}

impl SyncError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Remote { source, .. } => match source.kind {
                RemoteErrorKind::Unauthorized => ErrorCode::Unauthorized,
                RemoteErrorKind::NotFound
                | RemoteErrorKind::Rejected
                | RemoteErrorKind::Decode => ErrorCode::RemoteRejected,
                RemoteErrorKind::Network
                | RemoteErrorKind::Timeout
                | RemoteErrorKind::RateLimited
                | RemoteErrorKind::Server => ErrorCode::RemoteUnavailable,
            },
            Self::Order(_) => ErrorCode::BrokenOrderChain,
            Self::Aborted(_) => ErrorCode::OperatorAbort,
            Self::Interaction(_) => ErrorCode::InteractionFailed,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::MissingCredentials,
            ErrorCode::BrokenOrderChain,
            ErrorCode::DuplicateCards,
            ErrorCode::RemoteUnavailable,
            ErrorCode::RemoteRejected,
            ErrorCode::Unauthorized,
            ErrorCode::OperatorAbort,
            ErrorCode::InteractionFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::BrokenOrderChain.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn transient_kinds() {
        assert!(RemoteErrorKind::Network.is_transient());
        assert!(RemoteErrorKind::Timeout.is_transient());
        assert!(RemoteErrorKind::RateLimited.is_transient());
        assert!(RemoteErrorKind::Server.is_transient());
        assert!(!RemoteErrorKind::Unauthorized.is_transient());
        assert!(!RemoteErrorKind::NotFound.is_transient());
        assert!(!RemoteErrorKind::Rejected.is_transient());
        assert!(!RemoteErrorKind::Decode.is_transient());
    }

    #[test]
    fn remote_error_maps_to_code() {
        let err = SyncError::Remote {
            operation: "create card".to_string(),
            attempts: 8,
            source: RemoteError::new(RemoteErrorKind::RateLimited, "slow down"),
        };
        assert_eq!(err.code(), ErrorCode::RemoteUnavailable);
        assert_eq!(
            err.to_string(),
            "create card failed after 8 attempt(s): rate_limited: slow down"
        );

        let err = SyncError::Remote {
            operation: "list boards".to_string(),
            attempts: 1,
            source: RemoteError::new(RemoteErrorKind::Unauthorized, "invalid token"),
        };
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert!(err.hint().is_some());
    }
}
