use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::order::NewOrder;

/// Where a capture session is in its lifecycle.
///
/// `Committed` and `Aborted` are terminal and immediately fall back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Capturing,
    Extracting,
    ReviewPending,
    Reconciling,
    Committed,
    Aborted,
}

impl CaptureState {
    /// States during which a new capture is refused.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            CaptureState::Capturing | CaptureState::Extracting | CaptureState::Reconciling
        )
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Idle => "idle",
            CaptureState::Capturing => "capturing",
            CaptureState::Extracting => "extracting",
            CaptureState::ReviewPending => "review pending",
            CaptureState::Reconciling => "reconciling",
            CaptureState::Committed => "committed",
            CaptureState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// The single in-flight capture, owned by the pipeline.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub token: Uuid,
    pub state: CaptureState,
    /// Label of the source image; `None` for the example record.
    pub image_ref: Option<String>,
    /// Guaranteed `Some` once the session reaches `ReviewPending`.
    pub candidate: Option<NewOrder>,
}

impl CaptureSession {
    pub fn new(image_ref: Option<String>) -> Self {
        Self {
            token: Uuid::new_v4(),
            state: CaptureState::Capturing,
            image_ref,
            candidate: None,
        }
    }
}

/// A candidate waiting for the user to review, edit and save or discard.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub token: Uuid,
    pub candidate: NewOrder,
}

/// How a save ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Inserted { id: i64 },
    Replaced { id: i64, removed: Vec<i64> },
    /// Duplicate declined; storage untouched.
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_states() {
        assert!(CaptureState::Capturing.is_busy());
        assert!(CaptureState::Extracting.is_busy());
        assert!(CaptureState::Reconciling.is_busy());
        assert!(!CaptureState::Idle.is_busy());
        assert!(!CaptureState::ReviewPending.is_busy());
    }

    #[test]
    fn test_new_sessions_get_distinct_tokens() {
        let a = CaptureSession::new(None);
        let b = CaptureSession::new(Some("x.jpg".to_string()));
        assert_ne!(a.token, b.token);
        assert_eq!(a.state, CaptureState::Capturing);
    }
}
