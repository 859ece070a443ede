//! Provider identifiers and families.

use super::{ParseProviderFamilyError, ProviderDomainError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a registered generation provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a validated provider identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderDomainError::InvalidProviderId`] when the value is
    /// empty or contains whitespace.
    pub fn new(value: impl Into<String>) -> Result<Self, ProviderDomainError> {
        let raw = value.into();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(ProviderDomainError::InvalidProviderId(raw));
        }
        Ok(Self(raw))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProviderId {
    type Error = ProviderDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProviderId> for String {
    fn from(value: ProviderId) -> Self {
        value.0
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Group of providers sharing one upstream rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// Still-image generation; quick calls, tight per-minute quotas.
    Image,
    /// Video generation; long-running create-then-poll operations.
    Video,
    /// Model fine-tuning jobs; long-running and expensive.
    Training,
}

impl ProviderFamily {
    /// All families, in declaration order.
    pub const ALL: [Self; 3] = [Self::Image, Self::Video, Self::Training];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Training => "training",
        }
    }

    /// Widest batch the family tolerates without bursting its quota.
    #[must_use]
    pub const fn max_batch_width(self) -> usize {
        match self {
            Self::Image => 5,
            Self::Video => 2,
            Self::Training => 1,
        }
    }

    /// Queue length above which batches are halved to spread load across
    /// refill intervals.
    #[must_use]
    pub const fn burst_threshold(self) -> usize {
        match self {
            Self::Image => 20,
            Self::Video => 6,
            Self::Training => 1,
        }
    }
}

impl TryFrom<&str> for ProviderFamily {
    type Error = ParseProviderFamilyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            "training" => Ok(Self::Training),
            _ => Err(ParseProviderFamilyError(value.to_owned())),
        }
    }
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
