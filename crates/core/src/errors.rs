use std::fmt;

use thiserror::Error;

/// The only text a chat user ever sees for a failed lookup.
pub const USER_FACING_LOOKUP_ERROR: &str = "Error retrieving item price.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LookupErrorKind {
    Transport,
    InvalidResponseFormat,
    NoItemsFound,
    NoTraderPrices,
    MalformedEntry,
}

impl LookupErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::InvalidResponseFormat => "invalid_response_format",
            Self::NoItemsFound => "no_items_found",
            Self::NoTraderPrices => "no_trader_prices",
            Self::MalformedEntry => "malformed_entry",
        }
    }
}

impl fmt::Display for LookupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct LookupFailure {
    pub kind: LookupErrorKind,
    pub detail: String,
}

impl LookupFailure {
    pub fn new(kind: LookupErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into() }
    }

    pub fn invalid_response_format() -> Self {
        Self::new(LookupErrorKind::InvalidResponseFormat, "Invalid response format")
    }

    pub fn no_items_found() -> Self {
        Self::new(LookupErrorKind::NoItemsFound, "No items found")
    }

    pub fn no_trader_prices() -> Self {
        Self::new(LookupErrorKind::NoTraderPrices, "No trader prices found")
    }

    pub fn malformed_entry(index: usize, reason: impl fmt::Display) -> Self {
        Self::new(
            LookupErrorKind::MalformedEntry,
            format!("trader price entry {index} is malformed: {reason}"),
        )
    }

    /// Every kind maps to the same reply; `detail` is for operator logs.
    pub fn user_message(&self) -> &'static str {
        USER_FACING_LOOKUP_ERROR
    }
}

/// Failures talking to the upstream price API before a body is available.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
    #[error("price api request failed: {0}")]
    Request(String),
    #[error("failed to read price api response body: {0}")]
    ReadBody(String),
}

impl From<UpstreamError> for LookupFailure {
    fn from(value: UpstreamError) -> Self {
        Self::new(LookupErrorKind::Transport, value.to_string())
    }
}
