// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactChannel {
    X,
    Instagram,
    Whatsapp,
}

impl ContactChannel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Instagram => "instagram",
            Self::Whatsapp => "whatsapp",
        }
    }

    pub fn parse(input: &str) -> Result<Self, crate::ValidationError> {
        match input {
            "x" => Ok(Self::X),
            "instagram" => Ok(Self::Instagram),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(crate::ValidationError(format!(
                "unknown contact channel: {other}"
            ))),
        }
    }
}

impl Display for ContactChannel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Buyer contact snapshot captured at reservation time. At least one of the
/// three handles must be present; `preferred_contact` marks which channel the
/// organizer should use first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuyerContact {
    #[serde(default)]
    pub x_handle: Option<String>,
    #[serde(default)]
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    pub preferred_contact: ContactChannel,
}

fn filled(handle: Option<&str>) -> bool {
    handle.is_some_and(|h| !h.trim().is_empty())
}

impl BuyerContact {
    #[must_use]
    pub fn has_contact_channel(&self) -> bool {
        filled(self.x_handle.as_deref())
            || filled(self.instagram_handle.as_deref())
            || filled(self.whatsapp.as_deref())
    }

    /// First non-empty handle, used when addressing the buyer in messages.
    #[must_use]
    pub fn display_handle(&self) -> Option<&str> {
        [
            self.x_handle.as_deref(),
            self.instagram_handle.as_deref(),
            self.whatsapp.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|h| !h.is_empty())
    }
}
