//! Error types for the analysis engine.
//!
//! Lookup failures are ordinary values that checkers fold into their report
//! fragments; only [`EngineError`] ever crosses the engine boundary, and only
//! for invalid input or an unusable configuration.

use serde::Serialize;
use thiserror::Error;

/// Errors returned by the engine entry point.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum EngineError {
    /// The supplied domain name failed syntax validation.
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    /// The TLD registry could not be loaded or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Classified DNS lookup failure.
///
/// Checkers branch on the kind (an NXDOMAIN means something different from a
/// timeout) and surface the message to the user as an issue string.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct LookupError {
    pub kind: LookupErrorKind,
    pub message: String,
}

impl LookupError {
    pub fn new(kind: LookupErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// True when the failure means "the name does not exist at all".
    pub fn is_nxdomain(&self) -> bool {
        self.kind == LookupErrorKind::NxDomain
    }

    /// True when the name exists but carries no records of the queried type.
    pub fn is_nodata(&self) -> bool {
        self.kind == LookupErrorKind::NoData
    }

    /// True for NXDOMAIN and NODATA, the two "nothing there" outcomes.
    pub fn is_absent(&self) -> bool {
        self.is_nxdomain() || self.is_nodata()
    }
}

/// The failure classes a DNS exchange can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupErrorKind {
    /// The queried name does not exist (RCODE 3).
    NxDomain,
    /// The name exists but has no records of the requested type.
    NoData,
    /// No response within the query deadline.
    Timeout,
    /// The server answered SERVFAIL (RCODE 2).
    ServFail,
    /// The server refused the query (RCODE 5).
    Refused,
    /// Socket-level failure (unreachable, connection reset, ...).
    Network,
    /// The response could not be decoded.
    Parse,
}

impl std::fmt::Display for LookupErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NxDomain => write!(f, "NXDOMAIN"),
            Self::NoData => write!(f, "no data"),
            Self::Timeout => write!(f, "timeout"),
            Self::ServFail => write!(f, "SERVFAIL"),
            Self::Refused => write!(f, "refused"),
            Self::Network => write!(f, "network error"),
            Self::Parse => write!(f, "parse error"),
        }
    }
}

/// Alias for fallible lookups through the resolver facade.
pub type LookupResult<T> = std::result::Result<T, LookupError>;
