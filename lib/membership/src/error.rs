//! Membership error types.

use std::fmt;

/// Errors from a single membership-check call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipCheckError {
    /// More group ids were passed than one call accepts.
    TooManyGroups {
        /// Number of ids passed.
        count: usize,
        /// Maximum accepted per call.
        max: usize,
    },
    /// The request could not be sent or the response not received.
    RequestFailed {
        /// Error details.
        details: String,
    },
    /// The provider answered with a non-success status.
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },
    /// The response body could not be interpreted.
    InvalidResponse {
        /// Error details.
        details: String,
    },
}

impl fmt::Display for MembershipCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyGroups { count, max } => {
                write!(f, "{count} group ids exceed the per-call limit of {max}")
            }
            Self::RequestFailed { details } => {
                write!(f, "membership check request failed: {details}")
            }
            Self::UnexpectedStatus { status, body } => {
                write!(f, "membership check returned status {status}: {body}")
            }
            Self::InvalidResponse { details } => {
                write!(f, "invalid membership check response: {details}")
            }
        }
    }
}

impl std::error::Error for MembershipCheckError {}

/// Errors from resolving a user's membership across all watched groups.
///
/// Any of these means the resolution produced no result at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// One of the chunked membership-check calls failed.
    CheckFailed {
        /// 1-based index of the failed chunk.
        chunk: usize,
        /// Total number of chunks.
        chunks: usize,
        /// Error details.
        details: String,
    },
    /// Resolution did not finish within the configured limit.
    TimedOut {
        /// The limit, in milliseconds.
        after_ms: u128,
    },
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CheckFailed {
                chunk,
                chunks,
                details,
            } => {
                write!(
                    f,
                    "membership check for chunk {chunk} of {chunks} failed: {details}"
                )
            }
            Self::TimedOut { after_ms } => {
                write!(f, "membership resolution timed out after {after_ms}ms")
            }
        }
    }
}

impl std::error::Error for ResolutionError {}
