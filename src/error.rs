use std::error::Error as StdError;
use std::fmt;

/// Failures of the bundle claim flow and its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum ClaimError {
    Network(String),
    Api(String),
    Parse(String),
    Abi(String),
    /// Neither a picked asset nor a typed bundle id was available.
    MissingBundle,
    Execution(String),
    /// The relay accepted the write but its response lacks the tx hash or Transfer event.
    MalformedResponse(String),
    /// The picker is open or another claim is still in flight.
    Busy,
}

impl ClaimError {
    /// Only transport failures are worth retrying; API and parse errors repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClaimError::Network(_))
    }
}

impl fmt::Display for ClaimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimError::Network(msg) => write!(f, "Network error: {}", msg),
            ClaimError::Api(msg) => write!(f, "API error: {}", msg),
            ClaimError::Parse(msg) => write!(f, "Parsing error: {}", msg),
            ClaimError::Abi(msg) => write!(f, "ABI error: {}", msg),
            ClaimError::MissingBundle => write!(f, "No bundle selected or entered"),
            ClaimError::Execution(msg) => write!(f, "Transaction failed: {}", msg),
            ClaimError::MalformedResponse(msg) => {
                write!(f, "Malformed transaction response: {}", msg)
            }
            ClaimError::Busy => write!(f, "Another claim interaction is in progress"),
        }
    }
}

impl StdError for ClaimError {}
