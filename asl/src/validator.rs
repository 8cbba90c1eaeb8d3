//! Structural validation of a deserialized state machine. Every check here
//! collects into a `Vec<Violation>` instead of failing fast, so a caller
//! sees every defect in a document in one pass rather than fixing them one
//! error at a time.

use indexmap::IndexMap;

use asl_core::{
    ChoiceState, Condition, FailState, LeafCondition, MapState, Operand, ParallelState, PassState,
    ReferencePath, State, StateMachine, SubStateMachine, TaskState, Transition, TriState,
    WaitState, check_all_is_last_and_sole,
};
use asl_core::Violation;

/// Validates a top-level state machine, returning every violation found.
/// An empty vec means the document is structurally sound.
pub fn validate(machine: &StateMachine) -> Vec<Violation> {
    let mut violations = Vec::new();
    validate_states("states", &machine.start_at, &machine.states, &mut violations);
    if let Some(timeout) = machine.timeout_seconds {
        if timeout == 0 {
            violations.push(Violation::new("TimeoutSeconds", "must be greater than zero"));
        }
    }
    if violations.is_empty() {
        tracing::debug!(start_at = %machine.start_at, state_count = machine.states.len(), "state machine passed validation");
    } else {
        for violation in &violations {
            tracing::debug!(path = %violation.path, message = %violation.message, "validation violation");
        }
    }
    violations
}

fn validate_sub_machine(prefix: &str, sub: &SubStateMachine, violations: &mut Vec<Violation>) {
    validate_states(prefix, &sub.start_at, &sub.states, violations);
}

fn validate_states(
    prefix: &str,
    start_at: &str,
    states: &IndexMap<String, State>,
    violations: &mut Vec<Violation>,
) {
    if states.is_empty() {
        violations.push(Violation::new(prefix, "States must not be empty"));
        return;
    }
    if !states.contains_key(start_at) {
        violations.push(Violation::new(
            format!("{prefix}.StartAt"),
            format!("StartAt {start_at} does not name a state in this scope"),
        ));
    }
    for (name, state) in states {
        validate_state(&format!("{prefix}.{name}"), state, states, violations);
    }
}

fn validate_state(
    path: &str,
    state: &State,
    siblings: &IndexMap<String, State>,
    violations: &mut Vec<Violation>,
) {
    match state {
        State::Pass(s) => validate_pass(path, s, siblings, violations),
        State::Task(s) => validate_task(path, s, siblings, violations),
        State::Choice(s) => validate_choice(path, s, siblings, violations),
        State::Wait(s) => validate_wait(path, s, siblings, violations),
        State::Succeed(_) => {}
        State::Fail(s) => validate_fail(path, s, violations),
        State::Parallel(s) => validate_parallel(path, s, siblings, violations),
        State::Map(s) => validate_map(path, s, siblings, violations),
    }
}

fn require_transition(
    path: &str,
    transition: &asl_core::RawTransition,
    siblings: &IndexMap<String, State>,
    violations: &mut Vec<Violation>,
) {
    if transition.is_conflicting() {
        violations.push(Violation::new(path, "a state cannot set both Next and End"));
        return;
    }
    match transition.resolved() {
        Some(Transition::Next(name)) => {
            if !siblings.contains_key(&name) {
                violations.push(Violation::new(
                    path,
                    format!("Next {name} does not name a state in this scope"),
                ));
            }
        }
        Some(Transition::End) => {}
        None => violations.push(Violation::new(path, "must set exactly one of Next or End")),
    }
}

fn validate_path_field(path: &str, field: &str, value: &TriState<String>, violations: &mut Vec<Violation>) {
    if let TriState::Value(p) = value {
        if let Err(e) = ReferencePath::parse(p) {
            violations.push(Violation::new(format!("{path}.{field}"), e));
        }
    }
}

fn validate_optional_path_str(path: &str, field: &str, value: Option<&str>, violations: &mut Vec<Violation>) {
    if let Some(p) = value {
        if let Err(e) = ReferencePath::parse(p) {
            violations.push(Violation::new(format!("{path}.{field}"), e));
        }
    }
}

fn validate_retry_catch(
    path: &str,
    retry: &[asl_core::Retrier],
    catch: &[asl_core::Catcher],
    violations: &mut Vec<Violation>,
) {
    let retry_names: Vec<Vec<String>> = retry.iter().map(|r| r.error_equals.clone()).collect();
    if let Some(idx) = check_all_is_last_and_sole(&retry_names) {
        violations.push(Violation::new(
            format!("{path}.Retry[{idx}]"),
            "States.ALL must be the sole name in the last retrier",
        ));
    }
    let catch_names: Vec<Vec<String>> = catch.iter().map(|c| c.error_equals.clone()).collect();
    if let Some(idx) = check_all_is_last_and_sole(&catch_names) {
        violations.push(Violation::new(
            format!("{path}.Catch[{idx}]"),
            "States.ALL must be the sole name in the last catcher",
        ));
    }
}

fn validate_pass(path: &str, s: &PassState, siblings: &IndexMap<String, State>, violations: &mut Vec<Violation>) {
    validate_path_field(path, "InputPath", &s.io.input_path, violations);
    validate_path_field(path, "OutputPath", &s.io.output_path, violations);
    validate_path_field(path, "ResultPath", &s.result_path, violations);
    require_transition(path, &s.transition, siblings, violations);
}

fn validate_task(path: &str, s: &TaskState, siblings: &IndexMap<String, State>, violations: &mut Vec<Violation>) {
    validate_path_field(path, "InputPath", &s.io.input_path, violations);
    validate_path_field(path, "OutputPath", &s.io.output_path, violations);
    validate_path_field(path, "ResultPath", &s.result_path, violations);
    validate_optional_path_str(path, "TimeoutSecondsPath", s.timeout_seconds_path.as_deref(), violations);
    validate_optional_path_str(path, "HeartbeatSecondsPath", s.heartbeat_seconds_path.as_deref(), violations);
    if s.resource.trim().is_empty() {
        violations.push(Violation::new(format!("{path}.Resource"), "must not be empty"));
    }
    if let (Some(timeout), Some(heartbeat)) = (s.timeout_seconds, s.heartbeat_seconds) {
        if heartbeat >= timeout {
            violations.push(Violation::new(path, "HeartbeatSeconds must be less than TimeoutSeconds"));
        }
    }
    validate_retry_catch(path, &s.retry, &s.catch, violations);
    for catcher in &s.catch {
        if !siblings.contains_key(&catcher.next) {
            violations.push(Violation::new(
                format!("{path}.Catch"),
                format!("Next {} does not name a state in this scope", catcher.next),
            ));
        }
    }
    require_transition(path, &s.transition, siblings, violations);
}

fn validate_choice(path: &str, s: &ChoiceState, siblings: &IndexMap<String, State>, violations: &mut Vec<Violation>) {
    validate_path_field(path, "InputPath", &s.io.input_path, violations);
    validate_path_field(path, "OutputPath", &s.io.output_path, violations);
    if s.choices.is_empty() {
        violations.push(Violation::new(format!("{path}.Choices"), "must contain at least one rule"));
    }
    for (idx, rule) in s.choices.iter().enumerate() {
        if !siblings.contains_key(&rule.next) {
            violations.push(Violation::new(
                format!("{path}.Choices[{idx}]"),
                format!("Next {} does not name a state in this scope", rule.next),
            ));
        }
        validate_condition(&format!("{path}.Choices[{idx}]"), &rule.condition, violations);
    }
    if let Some(default) = &s.default {
        if !siblings.contains_key(default) {
            violations.push(Violation::new(
                format!("{path}.Default"),
                format!("Default {default} does not name a state in this scope"),
            ));
        }
    }
}

fn validate_condition(path: &str, condition: &Condition, violations: &mut Vec<Violation>) {
    match condition {
        Condition::Leaf(leaf) => validate_leaf_condition(path, leaf, violations),
        Condition::Not(inner) => validate_condition(path, inner, violations),
        Condition::And(children) | Condition::Or(children) => {
            if children.is_empty() {
                violations.push(Violation::new(path, "And/Or requires at least one child condition"));
            }
            for child in children {
                validate_condition(path, child, violations);
            }
        }
    }
}

fn validate_leaf_condition(path: &str, leaf: &LeafCondition, violations: &mut Vec<Violation>) {
    if let Err(e) = ReferencePath::parse(&leaf.variable) {
        violations.push(Violation::new(format!("{path}.Variable"), e));
    }
    if let Some(Operand::Path(p)) = &leaf.operand {
        if let Err(e) = ReferencePath::parse(p) {
            violations.push(Violation::new(path, e));
        }
    }
}

fn validate_wait(path: &str, s: &WaitState, siblings: &IndexMap<String, State>, violations: &mut Vec<Violation>) {
    validate_path_field(path, "InputPath", &s.io.input_path, violations);
    validate_path_field(path, "OutputPath", &s.io.output_path, violations);
    match s.wait_for.resolved() {
        None => violations.push(Violation::new(
            path,
            "must set exactly one of Seconds, SecondsPath, Timestamp, TimestampPath",
        )),
        Some(Err(())) => violations.push(Violation::new(
            path,
            "exactly one of Seconds, SecondsPath, Timestamp, TimestampPath may be set",
        )),
        Some(Ok(_)) => {}
    }
    require_transition(path, &s.transition, siblings, violations);
}

fn validate_fail(path: &str, s: &FailState, violations: &mut Vec<Violation>) {
    if s.error.is_some() && s.error_path.is_some() {
        violations.push(Violation::new(format!("{path}.Error"), "cannot set both Error and ErrorPath"));
    }
    if s.cause.is_some() && s.cause_path.is_some() {
        violations.push(Violation::new(format!("{path}.Cause"), "cannot set both Cause and CausePath"));
    }
    validate_optional_path_str(path, "ErrorPath", s.error_path.as_deref(), violations);
    validate_optional_path_str(path, "CausePath", s.cause_path.as_deref(), violations);
}

fn validate_parallel(
    path: &str,
    s: &ParallelState,
    siblings: &IndexMap<String, State>,
    violations: &mut Vec<Violation>,
) {
    validate_path_field(path, "InputPath", &s.io.input_path, violations);
    validate_path_field(path, "OutputPath", &s.io.output_path, violations);
    validate_path_field(path, "ResultPath", &s.result_path, violations);
    if s.branches.is_empty() {
        violations.push(Violation::new(format!("{path}.Branches"), "must contain at least one branch"));
    }
    for (idx, branch) in s.branches.iter().enumerate() {
        validate_sub_machine(&format!("{path}.Branches[{idx}]"), branch, violations);
    }
    validate_retry_catch(path, &s.retry, &s.catch, violations);
    for catcher in &s.catch {
        if !siblings.contains_key(&catcher.next) {
            violations.push(Violation::new(
                format!("{path}.Catch"),
                format!("Next {} does not name a state in this scope", catcher.next),
            ));
        }
    }
    require_transition(path, &s.transition, siblings, violations);
}

fn validate_map(path: &str, s: &MapState, siblings: &IndexMap<String, State>, violations: &mut Vec<Violation>) {
    validate_path_field(path, "InputPath", &s.io.input_path, violations);
    validate_path_field(path, "OutputPath", &s.io.output_path, violations);
    validate_path_field(path, "ResultPath", &s.result_path, violations);
    validate_optional_path_str(path, "ItemsPath", s.items_path.as_deref(), violations);
    validate_sub_machine(&format!("{path}.ItemProcessor"), &s.item_processor, violations);
    validate_retry_catch(path, &s.retry, &s.catch, violations);
    for catcher in &s.catch {
        if !siblings.contains_key(&catcher.next) {
            violations.push(Violation::new(
                format!("{path}.Catch"),
                format!("Next {} does not name a state in this scope", catcher.next),
            ));
        }
    }
    require_transition(path, &s.transition, siblings, violations);
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::{CommonIo, RawTransition};
    use indexmap::IndexMap;

    fn pass(next: Option<&str>, end: Option<bool>) -> State {
        State::Pass(PassState {
            io: CommonIo::default(),
            result_path: TriState::Unset,
            result: None,
            parameters: None,
            transition: RawTransition {
                next: next.map(str::to_string),
                end,
            },
        })
    }

    #[test]
    fn rejects_dangling_next() {
        let mut states = IndexMap::new();
        states.insert("A".to_string(), pass(Some("Nowhere"), None));
        let machine = StateMachine {
            comment: None,
            start_at: "A".to_string(),
            timeout_seconds: None,
            states,
        };
        let violations = validate(&machine);
        assert!(violations.iter().any(|v| v.message.contains("Nowhere")));
    }

    #[test]
    fn rejects_next_and_end_both_set() {
        let mut states = IndexMap::new();
        states.insert("A".to_string(), pass(Some("A"), Some(true)));
        let machine = StateMachine {
            comment: None,
            start_at: "A".to_string(),
            timeout_seconds: None,
            states,
        };
        let violations = validate(&machine);
        assert!(violations.iter().any(|v| v.message.contains("both Next and End")));
    }

    #[test]
    fn accepts_minimal_valid_machine() {
        let mut states = IndexMap::new();
        states.insert("A".to_string(), pass(None, Some(true)));
        let machine = StateMachine {
            comment: None,
            start_at: "A".to_string(),
            timeout_seconds: None,
            states,
        };
        assert!(validate(&machine).is_empty());
    }

    #[test]
    fn rejects_bad_start_at() {
        let mut states = IndexMap::new();
        states.insert("A".to_string(), pass(None, Some(true)));
        let machine = StateMachine {
            comment: None,
            start_at: "Missing".to_string(),
            timeout_seconds: None,
            states,
        };
        let violations = validate(&machine);
        assert!(violations.iter().any(|v| v.path.ends_with("StartAt")));
    }
}
