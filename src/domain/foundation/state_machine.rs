//! Transition checking for small lifecycle enums.

use super::ValidationError;

/// A status enum with an explicit transition table.
///
/// Implementors list their legal moves; `transition_to` then refuses
/// anything outside that table.
///
/// ```ignore
/// let next = TurnState::AwaitingChoice.transition_to(TurnState::Validated)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if moving from `self` to `target` is legal.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// All states reachable in one step from `self`.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Moves to `target`, or reports the illegal move.
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

    /// A state with no outgoing transitions.
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
