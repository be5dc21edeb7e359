//! State machine trait for lifecycle enums.
//!
//! Used by the per-turn phase so that every phase change goes through one
//! validated path.

use super::ValidationError;

/// Trait for enums whose values form a transition graph.
///
/// Implementors list the legal edges; `transition_to` is the checked way to
/// move along one.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for TurnPhase {
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Idle => vec![Submitting],
///             Submitting => vec![Streaming],
///             // ...
///         }
///     }
/// }
///
/// let phase = TurnPhase::Idle.transition_to(TurnPhase::Submitting)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns all valid target states from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if moving from self to target is a legal edge.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs the transition, returning an error for an illegal edge.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }
}
