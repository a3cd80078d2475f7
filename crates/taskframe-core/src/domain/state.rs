//! Session status of the embedded task.

use serde::{Deserialize, Serialize};

/// Status of the current run.
///
/// State transitions:
/// - Initializing -> Ready (INIT received)
/// - Ready -> Completed | Cancelled | Error
/// - any -> Ready (a fresh INIT supersedes the previous run)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Waiting for INIT. No timeout.
    #[default]
    Initializing,

    Ready,

    Completed,

    Cancelled,

    Error,
}

impl SessionStatus {
    /// Is this a terminal state for the current run?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Cancelled | SessionStatus::Error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_outcomes_are_terminal() {
        assert!(!SessionStatus::Initializing.is_terminal());
        assert!(!SessionStatus::Ready.is_terminal());
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
    }

    #[test]
    fn serializes_lowercase() {
        let s = serde_json::to_string(&SessionStatus::Initializing).unwrap();
        assert_eq!(s, "\"initializing\"");
    }
}
