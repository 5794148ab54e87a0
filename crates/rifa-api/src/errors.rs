// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};

/// Closed set of machine-readable error kinds exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorCode {
    NotFound,
    InvalidInput,
    NotSellable,
    Conflict,
    UpstreamUnavailable,
    Internal,
}

impl ApiErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::NotSellable => "not_sellable",
            Self::Conflict => "conflict",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl Display for ApiErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{what} not found"),
            json!({}),
        )
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidInput, message, json!({}))
    }

    #[must_use]
    pub fn not_sellable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NotSellable, message, json!({}))
    }

    /// Reservation conflicts always name the exact pair so the client can
    /// deselect just that number and resubmit the rest.
    #[must_use]
    pub fn conflict(number: u32, page_number: u32) -> Self {
        Self::new(
            ApiErrorCode::Conflict,
            format!("number {number} on page {page_number} is already selected"),
            json!({"conflict": {"number": number, "page_number": page_number}}),
        )
    }

    #[must_use]
    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::UpstreamUnavailable, message, json!({}))
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, message, json!({}))
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_snake_case() {
        let err = ApiError::conflict(5, 1);
        let value = serde_json::to_value(&err).expect("serialize");
        assert_eq!(value["code"], "conflict");
        assert_eq!(value["details"]["conflict"]["number"], 5);
        assert_eq!(value["details"]["conflict"]["page_number"], 1);
    }

    #[test]
    fn error_round_trips_through_json() {
        let err = ApiError::not_found("receipt");
        let text = serde_json::to_string(&err).expect("serialize");
        let back: ApiError = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, err);
    }
}
