//! Session states.

use std::fmt;

use serde::Serialize;

use crate::error::FailureReason;

/// The five working stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetching,
    Verifying,
    Extracting,
    Building,
    Testing,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Fetching,
        Stage::Verifying,
        Stage::Extracting,
        Stage::Building,
        Stage::Testing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetching => "fetching",
            Stage::Verifying => "verifying",
            Stage::Extracting => "extracting",
            Stage::Building => "building",
            Stage::Testing => "testing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum SessionState {
    Fetching,
    Verifying,
    Extracting,
    Building,
    Testing,
    Succeeded,
    Failed(FailureReason),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed(_))
    }

    /// The working stage this state corresponds to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            SessionState::Fetching => Some(Stage::Fetching),
            SessionState::Verifying => Some(Stage::Verifying),
            SessionState::Extracting => Some(Stage::Extracting),
            SessionState::Building => Some(Stage::Building),
            SessionState::Testing => Some(Stage::Testing),
            SessionState::Succeeded | SessionState::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            SessionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Succeeded => "succeeded",
            SessionState::Failed(_) => "failed",
            other => other.stage().map_or("unknown", |s| s.as_str()),
        }
    }
}

impl From<Stage> for SessionState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Fetching => SessionState::Fetching,
            Stage::Verifying => SessionState::Verifying,
            Stage::Extracting => SessionState::Extracting,
            Stage::Building => SessionState::Building,
            Stage::Testing => SessionState::Testing,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Failed(reason) => write!(f, "failed({})", reason.kind()),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stage_round_trips_through_state() {
        for stage in Stage::ALL {
            let state = SessionState::from(stage);
            assert_eq!(state.stage(), Some(stage));
            assert_eq!(state.name(), stage.as_str());
            assert!(!state.is_terminal());
        }
    }

    #[test]
    fn terminal_states() {
        assert!(SessionState::Succeeded.is_terminal());
        let failed = SessionState::Failed(FailureReason::Interrupted);
        assert!(failed.is_terminal());
        assert_eq!(failed.to_string(), "failed(interrupted)");
        assert_eq!(failed.failure(), Some(&FailureReason::Interrupted));
    }
}
