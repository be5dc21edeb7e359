//! Turn lifecycle and settle policy.
//!
//! A turn is one user submission plus the assistant reply it triggers.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Shown in place of the reply when the request fails before any text arrived.
pub const REQUEST_FAILURE_NOTICE: &str =
    "Sorry, I couldn't reach the assistant. Please try again.";

/// Appended after partial text when the stream breaks part-way through.
pub const MID_STREAM_FAILURE_NOTICE: &str =
    "[The reply was interrupted. The text above may be incomplete.]";

/// Phase of the turn the store is tracking.
///
/// ```text
/// Idle ──▶ Submitting ──▶ Streaming ⟲
///  ▲           │              │
///  └───────────┴──────────────┘  settle
/// ```
///
/// The store refuses amends and settles that are not legal edges from the
/// current phase, so a settled turn cannot be amended or settled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    /// No turn in flight.
    #[default]
    Idle,
    /// User message and placeholder appended, no text received yet.
    Submitting,
    /// Text is folding into the placeholder.
    Streaming,
}

impl StateMachine for TurnPhase {
    fn valid_transitions(&self) -> Vec<Self> {
        use TurnPhase::*;
        match self {
            Idle => vec![Submitting],
            Submitting => vec![Streaming, Idle],
            Streaming => vec![Streaming, Idle],
        }
    }
}

/// Content a failed turn leaves in the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureContent {
    /// Text to write into the placeholder.
    pub content: String,
    /// True if streamed text was kept ahead of the notice.
    pub partial_retained: bool,
}

/// Builds the settled content for a failed turn.
///
/// Partial text that already reached the user is kept and the interruption
/// notice is appended; with nothing streamed the request notice stands alone.
pub fn failure_content(partial: &str) -> FailureContent {
    if partial.is_empty() {
        FailureContent {
            content: REQUEST_FAILURE_NOTICE.to_string(),
            partial_retained: false,
        }
    } else {
        FailureContent {
            content: format!("{}\n\n{}", partial, MID_STREAM_FAILURE_NOTICE),
            partial_retained: true,
        }
    }
}
