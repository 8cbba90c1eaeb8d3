//! Construct, validate, serialize, and evaluate Amazon States Language
//! workflow documents.
//!
//! This crate sits on top of `asl-core`'s data model and adds everything
//! that needs a choice of algorithm rather than a choice of shape: the
//! Reference Path / JSONPath read-side resolver, the `Condition` evaluator
//! a `Choice` state dispatches through, the `States.Name(args)` intrinsic
//! function language, the `InputPath`/`Parameters`/`ResultSelector`/
//! `ResultPath`/`OutputPath` I/O processor pipeline, the structural
//! validator, and a fluent builder API for assembling machines in code.

pub mod builder;
pub mod condition_eval;
pub mod intrinsics;
pub mod io;
pub mod jsonpath;
pub mod validator;

pub use asl_core::{
    Catcher, ChoiceRule, ChoiceState, Condition, CommonIo, ConditionErrorKind, FailState,
    JitterStrategy, LeafCondition, LeafOperator, MapState, Operand, ParallelState, PassState,
    PathToken, RawTransition, RawWaitFor, ReferencePath, Result, Retrier, State, StateMachine,
    StatesLanguageError, SubStateMachine, SucceedState, TaskState, Transition, TriState,
    Violation, WaitFor, WaitState,
};

pub use builder::{
    ChoiceStateBuilder, FailStateBuilder, MapStateBuilder, ParallelStateBuilder, PassStateBuilder,
    StateMachineBuilder, SubStateMachineBuilder, SucceedStateBuilder, TaskStateBuilder,
    WaitStateBuilder,
};
pub use intrinsics::{IntrinsicArg, IntrinsicCall, IntrinsicRegistry};

/// Parses and validates an ASL document from its JSON text, in one call.
pub fn parse_and_validate(document: &str) -> Result<StateMachine> {
    let machine: StateMachine =
        serde_json::from_str(document).map_err(|e| StatesLanguageError::Serialization {
            message: e.to_string(),
            cause: Some(e),
        })?;
    let violations = validator::validate(&machine);
    if violations.is_empty() {
        Ok(machine)
    } else {
        Err(StatesLanguageError::Validation { violations })
    }
}

/// Serializes a validated state machine back to its canonical JSON form.
pub fn to_json(machine: &StateMachine) -> Result<String> {
    serde_json::to_string_pretty(machine).map_err(|e| StatesLanguageError::Serialization {
        message: e.to_string(),
        cause: Some(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_document() {
        let doc = r#"{
            "StartAt": "Hello",
            "States": {
                "Hello": {"Type": "Pass", "End": true}
            }
        }"#;
        let machine = parse_and_validate(doc).unwrap();
        assert_eq!(machine.start_at, "Hello");
    }

    #[test]
    fn rejects_document_with_missing_start_at_target() {
        let doc = r#"{
            "StartAt": "Missing",
            "States": {
                "Hello": {"Type": "Pass", "End": true}
            }
        }"#;
        assert!(parse_and_validate(doc).is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let doc = r#"{
            "Comment": "demo",
            "StartAt": "Hello",
            "States": {
                "Hello": {"Type": "Succeed"}
            }
        }"#;
        let machine = parse_and_validate(doc).unwrap();
        let serialized = to_json(&machine).unwrap();
        let reparsed = parse_and_validate(&serialized).unwrap();
        assert_eq!(machine, reparsed);
    }
}
