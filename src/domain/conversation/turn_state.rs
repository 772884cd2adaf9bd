//! Speaker selection lifecycle.

use crate::domain::foundation::StateMachine;

/// States of one speaker selection.
///
/// ```text
/// AwaitingChoice -> Validated -> Chosen
///       ^    \
///       |     -> Rejected
///       +---------/
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// Waiting for a candidate from the chooser.
    AwaitingChoice,
    /// Candidate passed roster validation.
    Validated,
    /// Speaker is fixed for this turn.
    Chosen,
    /// Candidate output was structurally unusable; may retry.
    Rejected,
}

impl StateMachine for TurnState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use TurnState::*;
        matches!(
            (self, target),
            (AwaitingChoice, Validated)
                | (AwaitingChoice, Rejected)
                | (Validated, Chosen)
                | (Rejected, AwaitingChoice)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use TurnState::*;
        match self {
            AwaitingChoice => vec![Validated, Rejected],
            Validated => vec![Chosen],
            Rejected => vec![AwaitingChoice],
            Chosen => vec![],
        }
    }
}
