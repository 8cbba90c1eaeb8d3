use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::retry_catch::{Catcher, Retrier};
use crate::transition::Transition;
use crate::tristate::{TriState, is_unset, serialize_tristate_field, tristate_field};

/// Fields every state variant carries regardless of type: a comment, and
/// the two read-side data-flow filters. `ResultPath` is added only to the
/// variants that actually produce a result to merge (Pass, Task, Parallel,
/// Map) — see DESIGN.md for why Choice/Wait/Succeed/Fail don't get it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CommonIo {
    #[serde(rename = "Comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(
        rename = "InputPath",
        default,
        deserialize_with = "tristate_field",
        serialize_with = "serialize_tristate_field",
        skip_serializing_if = "is_unset"
    )]
    pub input_path: TriState<String>,
    #[serde(
        rename = "OutputPath",
        default,
        deserialize_with = "tristate_field",
        serialize_with = "serialize_tristate_field",
        skip_serializing_if = "is_unset"
    )]
    pub output_path: TriState<String>,
}

/// Raw `Next`/`End` pair as they appear on the wire. Exactly one of the two
/// must be set for a non-terminal, non-Choice state; the validator (not
/// this type) enforces that, so malformed documents still deserialize and
/// can be reported as a `Violation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawTransition {
    #[serde(rename = "Next", default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(rename = "End", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

impl RawTransition {
    pub fn resolved(&self) -> Option<Transition> {
        match (&self.next, self.end) {
            (Some(name), None) => Some(Transition::Next(name.clone())),
            (None, Some(true)) => Some(Transition::End),
            _ => None,
        }
    }

    pub fn is_conflicting(&self) -> bool {
        self.next.is_some() && self.end.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassState {
    #[serde(flatten)]
    pub io: CommonIo,
    #[serde(
        rename = "ResultPath",
        default,
        deserialize_with = "tristate_field",
        serialize_with = "serialize_tristate_field",
        skip_serializing_if = "is_unset"
    )]
    pub result_path: TriState<String>,
    #[serde(rename = "Result", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(flatten)]
    pub transition: RawTransition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    #[serde(flatten)]
    pub io: CommonIo,
    #[serde(
        rename = "ResultPath",
        default,
        deserialize_with = "tristate_field",
        serialize_with = "serialize_tristate_field",
        skip_serializing_if = "is_unset"
    )]
    pub result_path: TriState<String>,
    #[serde(rename = "Resource")]
    pub resource: String,
    #[serde(rename = "TimeoutSeconds", default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(rename = "TimeoutSecondsPath", default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds_path: Option<String>,
    #[serde(rename = "HeartbeatSeconds", default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_seconds: Option<u64>,
    #[serde(rename = "HeartbeatSecondsPath", default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_seconds_path: Option<String>,
    #[serde(rename = "Retry", default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(rename = "Catch", default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(rename = "ResultSelector", default, skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<serde_json::Value>,
    #[serde(flatten)]
    pub transition: RawTransition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceRule {
    #[serde(rename = "Condition")]
    pub condition: Condition,
    #[serde(rename = "Next")]
    pub next: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceState {
    #[serde(flatten)]
    pub io: CommonIo,
    #[serde(rename = "Choices")]
    pub choices: Vec<ChoiceRule>,
    #[serde(rename = "Default", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawWaitFor {
    #[serde(rename = "Seconds", default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
    #[serde(rename = "SecondsPath", default, skip_serializing_if = "Option::is_none")]
    pub seconds_path: Option<String>,
    #[serde(rename = "Timestamp", default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "TimestampPath", default, skip_serializing_if = "Option::is_none")]
    pub timestamp_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitFor<'a> {
    Seconds(u64),
    SecondsPath(&'a str),
    Timestamp(&'a str),
    TimestampPath(&'a str),
}

impl RawWaitFor {
    /// `Some(Ok(..))` if exactly one field is set, `Some(Err(()))` if more
    /// than one is set, `None` if none are set.
    pub fn resolved(&self) -> Option<Result<WaitFor<'_>, ()>> {
        let present = [
            self.seconds.is_some(),
            self.seconds_path.is_some(),
            self.timestamp.is_some(),
            self.timestamp_path.is_some(),
        ]
        .iter()
        .filter(|b| **b)
        .count();
        if present > 1 {
            return Some(Err(()));
        }
        if let Some(s) = self.seconds {
            return Some(Ok(WaitFor::Seconds(s)));
        }
        if let Some(s) = &self.seconds_path {
            return Some(Ok(WaitFor::SecondsPath(s)));
        }
        if let Some(s) = &self.timestamp {
            return Some(Ok(WaitFor::Timestamp(s)));
        }
        if let Some(s) = &self.timestamp_path {
            return Some(Ok(WaitFor::TimestampPath(s)));
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitState {
    #[serde(flatten)]
    pub io: CommonIo,
    #[serde(flatten)]
    pub wait_for: RawWaitFor,
    #[serde(flatten)]
    pub transition: RawTransition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SucceedState {
    #[serde(flatten)]
    pub io: CommonIo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FailState {
    #[serde(rename = "Comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "ErrorPath", default, skip_serializing_if = "Option::is_none")]
    pub error_path: Option<String>,
    #[serde(rename = "Cause", default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    #[serde(rename = "CausePath", default, skip_serializing_if = "Option::is_none")]
    pub cause_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelState {
    #[serde(flatten)]
    pub io: CommonIo,
    #[serde(
        rename = "ResultPath",
        default,
        deserialize_with = "tristate_field",
        serialize_with = "serialize_tristate_field",
        skip_serializing_if = "is_unset"
    )]
    pub result_path: TriState<String>,
    #[serde(rename = "Branches")]
    pub branches: Vec<SubStateMachine>,
    #[serde(rename = "Retry", default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(rename = "Catch", default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(rename = "ResultSelector", default, skip_serializing_if = "Option::is_none")]
    pub result_selector: Option<serde_json::Value>,
    #[serde(flatten)]
    pub transition: RawTransition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapState {
    #[serde(flatten)]
    pub io: CommonIo,
    #[serde(
        rename = "ResultPath",
        default,
        deserialize_with = "tristate_field",
        serialize_with = "serialize_tristate_field",
        skip_serializing_if = "is_unset"
    )]
    pub result_path: TriState<String>,
    #[serde(rename = "ItemProcessor")]
    pub item_processor: SubStateMachine,
    #[serde(rename = "ItemsPath", default, skip_serializing_if = "Option::is_none")]
    pub items_path: Option<String>,
    #[serde(rename = "MaxConcurrency", default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<u64>,
    #[serde(rename = "ItemSelector", default, skip_serializing_if = "Option::is_none")]
    pub item_selector: Option<serde_json::Value>,
    #[serde(rename = "Retry", default, skip_serializing_if = "Vec::is_empty")]
    pub retry: Vec<Retrier>,
    #[serde(rename = "Catch", default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
    #[serde(flatten)]
    pub transition: RawTransition,
}

impl MapState {
    pub fn items_path_or_default(&self) -> &str {
        self.items_path.as_deref().unwrap_or("$")
    }
}

/// The tagged sum of all seven ASL state variants. Internally tagged on
/// `Type` so the wire shape is a single flat JSON object, matching the ASL
/// spec exactly rather than `{"type": "Task", "value": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum State {
    Pass(PassState),
    Task(TaskState),
    Choice(ChoiceState),
    Wait(WaitState),
    Succeed(SucceedState),
    Fail(FailState),
    Parallel(ParallelState),
    Map(MapState),
}

impl State {
    pub fn type_name(&self) -> &'static str {
        match self {
            State::Pass(_) => "Pass",
            State::Task(_) => "Task",
            State::Choice(_) => "Choice",
            State::Wait(_) => "Wait",
            State::Succeed(_) => "Succeed",
            State::Fail(_) => "Fail",
            State::Parallel(_) => "Parallel",
            State::Map(_) => "Map",
        }
    }
}

/// A nested state machine embedded in a `Parallel` branch or `Map`
/// `ItemProcessor`. Same shape as [`StateMachine`] minus `TimeoutSeconds`,
/// and with its own `states` name scope (§4.1 invariant 3). `states` is an
/// `IndexMap` rather than a `BTreeMap` because key order is observable:
/// serializing a parsed document must reproduce the original key order
/// byte-for-byte (spec.md §3, §8 property 2), and a `BTreeMap` would
/// alphabetize it instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubStateMachine {
    #[serde(rename = "Comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "StartAt")]
    pub start_at: String,
    #[serde(rename = "States")]
    pub states: IndexMap<String, State>,
}

/// The top-level ASL document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMachine {
    #[serde(rename = "Comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(rename = "StartAt")]
    pub start_at: String,
    #[serde(rename = "TimeoutSeconds", default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(rename = "States")]
    pub states: IndexMap<String, State>,
}
