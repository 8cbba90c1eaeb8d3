use serde::{Deserialize, Serialize};

/// A state's outgoing edge: either `Next` names a sibling state, or `End`
/// marks the state machine as finished. Choice, Succeed, and Fail states
/// carry neither (enforced by the validator, not by this type, so that
/// deserialization of malformed documents can still be reported as a
/// `Violation` rather than a hard parse failure).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    Next(String),
    End,
}

impl Transition {
    pub fn next_state(&self) -> Option<&str> {
        match self {
            Transition::Next(name) => Some(name),
            Transition::End => None,
        }
    }
}
