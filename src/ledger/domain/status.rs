//! Pending request status and its allowed transitions.

use super::ParseRequestStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a long-running operation.
///
/// ```text
/// queued ──> in_progress ──> polling ──> completed
///   │             │            │  ↺
///   └─────────────┴────────────┴─────> failed
/// ```
///
/// `in_progress` may also complete directly when the provider answers the
/// create call synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Recorded; the create call has not been issued.
    Queued,
    /// The create call is in flight.
    InProgress,
    /// The provider accepted the operation and it is being polled.
    Polling,
    /// The operation produced a result.
    Completed,
    /// The operation failed, timed out, or was cancelled.
    Failed,
}

impl RequestStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` for `completed` and `failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns `true` when moving to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::InProgress | Self::Failed)
                | (
                    Self::InProgress,
                    Self::Polling | Self::Completed | Self::Failed
                )
                | (
                    Self::Polling,
                    Self::Polling | Self::Completed | Self::Failed
                )
        )
    }
}

impl TryFrom<&str> for RequestStatus {
    type Error = ParseRequestStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "in_progress" => Ok(Self::InProgress),
            "polling" => Ok(Self::Polling),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(ParseRequestStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
