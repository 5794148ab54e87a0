// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const ID_MAX_LEN: usize = 64;

fn parse_opaque_id(input: &str, what: &str) -> Result<String, ValidationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ValidationError(format!("{what} must not be empty")));
    }
    if s.len() > ID_MAX_LEN {
        return Err(ValidationError(format!(
            "{what} exceeds max length {ID_MAX_LEN}"
        )));
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError(format!(
            "{what} must match [A-Za-z0-9-]+"
        )));
    }
    Ok(s.to_string())
}

/// Opaque raffle identity. Assigned by the store at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RaffleId(String);

impl RaffleId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_opaque_id(input, "raffle id").map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for RaffleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receipt identity: human-transcribable, globally unique. Usually 13 chars
/// from the unambiguous alphabet, but a UUID fallback is also legal, so the
/// shape is only loosely constrained here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_opaque_id(input, "receipt id").map(Self)
    }

    /// Internal constructor for ids produced by the generator, which only
    /// emits alphabet symbols.
    pub(crate) fn from_generated(raw: String) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for ReceiptId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
