//! Lifecycle states of a long-running operation.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a long-running operation.
///
/// States are ordered: `NotStarted < Running < {Succeeded, Failed, Canceled}`.
/// A handle only ever moves forward along this order, see
/// [`OperationState::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationState {
    /// No poll has been observed yet.
    NotStarted,
    /// The operation is in progress on the service.
    Running,
    /// The operation completed successfully.
    Succeeded,
    /// The operation failed on the service.
    Failed,
    /// The operation was canceled on the service.
    Canceled,
}

impl OperationState {
    /// Map a service status string to a state.
    ///
    /// Matching is case-insensitive. Unknown values (`InProgress`,
    /// `Accepted`, `Creating`, `Updating`, `Deleting`, ...) are treated as
    /// still running.
    pub fn from_status(status: &str) -> Self {
        let status = status.trim();
        if status.eq_ignore_ascii_case("succeeded") {
            Self::Succeeded
        } else if status.eq_ignore_ascii_case("failed") {
            Self::Failed
        } else if status.eq_ignore_ascii_case("canceled") || status.eq_ignore_ascii_case("cancelled")
        {
            Self::Canceled
        } else if status.eq_ignore_ascii_case("notstarted") {
            Self::NotStarted
        } else {
            Self::Running
        }
    }

    /// Returns `true` for `Succeeded`, `Failed` and `Canceled`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Running => 1,
            Self::Succeeded | Self::Failed | Self::Canceled => 2,
        }
    }

    /// The state after observing `observed`.
    ///
    /// Terminal states are absorbing and observations never move a handle
    /// backwards, so a `NotStarted` report while `Running` keeps `Running`.
    pub fn advance(self, observed: Self) -> Self {
        if self.is_terminal() || observed.rank() < self.rank() {
            self
        } else {
            observed
        }
    }
}

impl std::fmt::Display for OperationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "NotStarted",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}
