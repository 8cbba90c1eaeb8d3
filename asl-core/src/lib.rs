//! Data model and error types for Amazon States Language (ASL) documents.
//!
//! This crate owns the tagged algebraic model of a state machine (seven
//! state variants, transitions, conditions, retriers, catchers), the
//! restricted Reference Path parser, and the structured error taxonomy.
//! It does not validate, evaluate, or execute anything — see the `asl`
//! crate for the validator, condition evaluator, and I/O processor built
//! on top of these types.

pub mod condition;
pub mod error;
pub mod path;
pub mod retry_catch;
pub mod state;
pub mod transition;
pub mod tristate;

pub use condition::{Condition, LeafCondition, LeafOperator, Operand};
pub use error::{ConditionErrorKind, Result, StatesLanguageError, Violation};
pub use path::{PathToken, ReferencePath};
pub use retry_catch::{Catcher, JitterStrategy, Retrier, check_all_is_last_and_sole};
pub use state::{
    ChoiceRule, ChoiceState, CommonIo, FailState, MapState, ParallelState, PassState,
    RawTransition, RawWaitFor, State, StateMachine, SubStateMachine, SucceedState, TaskState,
    WaitFor, WaitState,
};
pub use transition::Transition;
pub use tristate::TriState;
