//! Fluent builders for assembling a state machine in code, mirroring the
//! shape `serde` reconstructs from JSON. `StateMachineBuilder::build` is
//! the single validation gate: it runs the full structural validator and
//! only returns a `StateMachine` once every invariant holds.

use indexmap::IndexMap;

use asl_core::{
    Catcher, ChoiceRule, ChoiceState, Condition, CommonIo, FailState, MapState, ParallelState,
    PassState, RawTransition, RawWaitFor, Retrier, State, StateMachine, StatesLanguageError,
    SubStateMachine, SucceedState, TaskState, TriState, WaitState, Violation,
};
use serde_json::Value;

use crate::validator;

/// Top-level builder. Accumulates named states and calls the validator on
/// `build`.
#[derive(Debug, Clone, Default)]
pub struct StateMachineBuilder {
    comment: Option<String>,
    start_at: Option<String>,
    timeout_seconds: Option<u64>,
    states: IndexMap<String, State>,
}

impl StateMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn start_at(mut self, name: impl Into<String>) -> Self {
        self.start_at = Some(name.into());
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn state(mut self, name: impl Into<String>, state: State) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    pub fn build(self) -> Result<StateMachine, StatesLanguageError> {
        let start_at = self.start_at.ok_or_else(|| StatesLanguageError::Validation {
            violations: vec![Violation::new("StartAt", "is required")],
        })?;
        let machine = StateMachine {
            comment: self.comment,
            start_at,
            timeout_seconds: self.timeout_seconds,
            states: self.states,
        };
        let violations = validator::validate(&machine);
        if violations.is_empty() {
            Ok(machine)
        } else {
            Err(StatesLanguageError::Validation { violations })
        }
    }
}

/// Same shape as [`StateMachineBuilder`] but for a `Parallel` branch or
/// `Map` `ItemProcessor`, which carry no `TimeoutSeconds` and are not
/// independently validated (the parent's `build()` validates everything).
#[derive(Debug, Clone, Default)]
pub struct SubStateMachineBuilder {
    comment: Option<String>,
    start_at: Option<String>,
    states: IndexMap<String, State>,
}

impl SubStateMachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn start_at(mut self, name: impl Into<String>) -> Self {
        self.start_at = Some(name.into());
        self
    }

    pub fn state(mut self, name: impl Into<String>, state: State) -> Self {
        self.states.insert(name.into(), state);
        self
    }

    pub fn build(self) -> SubStateMachine {
        SubStateMachine {
            comment: self.comment,
            start_at: self.start_at.unwrap_or_default(),
            states: self.states,
        }
    }
}

macro_rules! io_setters {
    () => {
        pub fn comment(mut self, comment: impl Into<String>) -> Self {
            self.io.comment = Some(comment.into());
            self
        }

        pub fn input_path(mut self, path: impl Into<String>) -> Self {
            self.io.input_path = TriState::Value(path.into());
            self
        }

        pub fn null_input(mut self) -> Self {
            self.io.input_path = TriState::Null;
            self
        }

        pub fn output_path(mut self, path: impl Into<String>) -> Self {
            self.io.output_path = TriState::Value(path.into());
            self
        }

        pub fn null_output(mut self) -> Self {
            self.io.output_path = TriState::Null;
            self
        }
    };
}

macro_rules! transition_setters {
    () => {
        pub fn next(mut self, name: impl Into<String>) -> Self {
            self.transition.next = Some(name.into());
            self
        }

        pub fn end(mut self) -> Self {
            self.transition.end = Some(true);
            self
        }
    };
}

#[derive(Debug, Clone, Default)]
pub struct PassStateBuilder {
    io: CommonIo,
    result_path: TriState<String>,
    result: Option<Value>,
    parameters: Option<Value>,
    transition: RawTransition,
}

impl PassStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    io_setters!();
    transition_setters!();

    pub fn result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = TriState::Value(path.into());
        self
    }

    pub fn result(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn build(self) -> State {
        State::Pass(PassState {
            io: self.io,
            result_path: self.result_path,
            result: self.result,
            parameters: self.parameters,
            transition: self.transition,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TaskStateBuilder {
    io: CommonIo,
    result_path: TriState<String>,
    resource: String,
    timeout_seconds: Option<u64>,
    timeout_seconds_path: Option<String>,
    heartbeat_seconds: Option<u64>,
    heartbeat_seconds_path: Option<String>,
    retry: Vec<Retrier>,
    catch: Vec<Catcher>,
    parameters: Option<Value>,
    result_selector: Option<Value>,
    transition: RawTransition,
}

impl TaskStateBuilder {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            io: CommonIo::default(),
            result_path: TriState::Unset,
            resource: resource.into(),
            timeout_seconds: None,
            timeout_seconds_path: None,
            heartbeat_seconds: None,
            heartbeat_seconds_path: None,
            retry: Vec::new(),
            catch: Vec::new(),
            parameters: None,
            result_selector: None,
            transition: RawTransition::default(),
        }
    }

    io_setters!();
    transition_setters!();

    pub fn result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = TriState::Value(path.into());
        self
    }

    pub fn timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn heartbeat_seconds(mut self, seconds: u64) -> Self {
        self.heartbeat_seconds = Some(seconds);
        self
    }

    pub fn retry(mut self, retrier: Retrier) -> Self {
        self.retry.push(retrier);
        self
    }

    pub fn catch(mut self, catcher: Catcher) -> Self {
        self.catch.push(catcher);
        self
    }

    pub fn parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn result_selector(mut self, selector: Value) -> Self {
        self.result_selector = Some(selector);
        self
    }

    pub fn build(self) -> State {
        State::Task(TaskState {
            io: self.io,
            result_path: self.result_path,
            resource: self.resource,
            timeout_seconds: self.timeout_seconds,
            timeout_seconds_path: self.timeout_seconds_path,
            heartbeat_seconds: self.heartbeat_seconds,
            heartbeat_seconds_path: self.heartbeat_seconds_path,
            retry: self.retry,
            catch: self.catch,
            parameters: self.parameters,
            result_selector: self.result_selector,
            transition: self.transition,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChoiceStateBuilder {
    io: CommonIo,
    choices: Vec<ChoiceRule>,
    default: Option<String>,
}

impl ChoiceStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    io_setters!();

    pub fn choice(mut self, condition: Condition, next: impl Into<String>) -> Self {
        self.choices.push(ChoiceRule {
            condition,
            next: next.into(),
        });
        self
    }

    pub fn default_next(mut self, name: impl Into<String>) -> Self {
        self.default = Some(name.into());
        self
    }

    pub fn build(self) -> State {
        State::Choice(ChoiceState {
            io: self.io,
            choices: self.choices,
            default: self.default,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct WaitStateBuilder {
    io: CommonIo,
    wait_for: RawWaitFor,
    transition: RawTransition,
}

impl WaitStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    io_setters!();
    transition_setters!();

    pub fn seconds(mut self, seconds: u64) -> Self {
        self.wait_for.seconds = Some(seconds);
        self
    }

    pub fn seconds_path(mut self, path: impl Into<String>) -> Self {
        self.wait_for.seconds_path = Some(path.into());
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.wait_for.timestamp = Some(timestamp.into());
        self
    }

    pub fn timestamp_path(mut self, path: impl Into<String>) -> Self {
        self.wait_for.timestamp_path = Some(path.into());
        self
    }

    pub fn build(self) -> State {
        State::Wait(WaitState {
            io: self.io,
            wait_for: self.wait_for,
            transition: self.transition,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SucceedStateBuilder {
    io: CommonIo,
}

impl SucceedStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    io_setters!();

    pub fn build(self) -> State {
        State::Succeed(SucceedState { io: self.io })
    }
}

#[derive(Debug, Clone, Default)]
pub struct FailStateBuilder {
    comment: Option<String>,
    error: Option<String>,
    error_path: Option<String>,
    cause: Option<String>,
    cause_path: Option<String>,
}

impl FailStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn error_path(mut self, path: impl Into<String>) -> Self {
        self.error_path = Some(path.into());
        self
    }

    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn cause_path(mut self, path: impl Into<String>) -> Self {
        self.cause_path = Some(path.into());
        self
    }

    pub fn build(self) -> State {
        State::Fail(FailState {
            comment: self.comment,
            error: self.error,
            error_path: self.error_path,
            cause: self.cause,
            cause_path: self.cause_path,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParallelStateBuilder {
    io: CommonIo,
    result_path: TriState<String>,
    branches: Vec<SubStateMachine>,
    retry: Vec<Retrier>,
    catch: Vec<Catcher>,
    parameters: Option<Value>,
    result_selector: Option<Value>,
    transition: RawTransition,
}

impl ParallelStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    io_setters!();
    transition_setters!();

    pub fn result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = TriState::Value(path.into());
        self
    }

    pub fn branch(mut self, branch: SubStateMachine) -> Self {
        self.branches.push(branch);
        self
    }

    pub fn retry(mut self, retrier: Retrier) -> Self {
        self.retry.push(retrier);
        self
    }

    pub fn catch(mut self, catcher: Catcher) -> Self {
        self.catch.push(catcher);
        self
    }

    pub fn parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn result_selector(mut self, selector: Value) -> Self {
        self.result_selector = Some(selector);
        self
    }

    pub fn build(self) -> State {
        State::Parallel(ParallelState {
            io: self.io,
            result_path: self.result_path,
            branches: self.branches,
            retry: self.retry,
            catch: self.catch,
            parameters: self.parameters,
            result_selector: self.result_selector,
            transition: self.transition,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MapStateBuilder {
    io: CommonIo,
    result_path: TriState<String>,
    item_processor: SubStateMachine,
    items_path: Option<String>,
    max_concurrency: Option<u64>,
    item_selector: Option<Value>,
    retry: Vec<Retrier>,
    catch: Vec<Catcher>,
    transition: RawTransition,
}

impl MapStateBuilder {
    pub fn new(item_processor: SubStateMachine) -> Self {
        Self {
            io: CommonIo::default(),
            result_path: TriState::Unset,
            item_processor,
            items_path: None,
            max_concurrency: None,
            item_selector: None,
            retry: Vec::new(),
            catch: Vec::new(),
            transition: RawTransition::default(),
        }
    }

    io_setters!();
    transition_setters!();

    pub fn result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = TriState::Value(path.into());
        self
    }

    pub fn items_path(mut self, path: impl Into<String>) -> Self {
        self.items_path = Some(path.into());
        self
    }

    pub fn max_concurrency(mut self, max: u64) -> Self {
        self.max_concurrency = Some(max);
        self
    }

    pub fn item_selector(mut self, selector: Value) -> Self {
        self.item_selector = Some(selector);
        self
    }

    pub fn retry(mut self, retrier: Retrier) -> Self {
        self.retry.push(retrier);
        self
    }

    pub fn catch(mut self, catcher: Catcher) -> Self {
        self.catch.push(catcher);
        self
    }

    pub fn build(self) -> State {
        State::Map(MapState {
            io: self.io,
            result_path: self.result_path,
            item_processor: self.item_processor,
            items_path: self.items_path,
            max_concurrency: self.max_concurrency,
            item_selector: self.item_selector,
            retry: self.retry,
            catch: self.catch,
            transition: self.transition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::LeafOperator;

    #[test]
    fn builds_minimal_two_state_machine() {
        let machine = StateMachineBuilder::new()
            .start_at("Greet")
            .state("Greet", PassStateBuilder::new().next("Done").build())
            .state("Done", SucceedStateBuilder::new().build())
            .build()
            .unwrap();
        assert_eq!(machine.start_at, "Greet");
        assert_eq!(machine.states.len(), 2);
    }

    #[test]
    fn build_fails_on_dangling_next() {
        let result = StateMachineBuilder::new()
            .start_at("Greet")
            .state("Greet", PassStateBuilder::new().next("Nowhere").build())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn choice_builder_round_trips_condition() {
        let condition = Condition::leaf(
            LeafOperator::NumericGreaterThan,
            "$.value",
            Some(asl_core::Operand::NumberLit(10.into())),
        );
        let machine = StateMachineBuilder::new()
            .start_at("Check")
            .state(
                "Check",
                ChoiceStateBuilder::new()
                    .choice(condition, "Big")
                    .default_next("Small")
                    .build(),
            )
            .state("Big", SucceedStateBuilder::new().build())
            .state("Small", SucceedStateBuilder::new().build())
            .build()
            .unwrap();
        assert_eq!(machine.states.len(), 3);
    }
}
