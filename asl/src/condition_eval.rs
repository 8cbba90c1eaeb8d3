//! Evaluates the `Condition` grammar a `Choice` state dispatches on.

use asl_core::{
    ChoiceState, Condition, ConditionErrorKind, LeafCondition, LeafOperator, Operand,
    StatesLanguageError,
};
use serde_json::Value;

use crate::jsonpath;

/// Runs a `Choice` state's dispatch algorithm: the first rule whose
/// condition evaluates to `true` wins; if none match, `Default` is used;
/// if there is no `Default` either, evaluation fails with
/// `States.NoChoiceMatched` (spec.md §4.2).
pub fn dispatch_choice<'a>(
    choice: &'a ChoiceState,
    input: &Value,
) -> Result<&'a str, StatesLanguageError> {
    for rule in &choice.choices {
        if evaluate(&rule.condition, input)? {
            return Ok(&rule.next);
        }
    }
    choice
        .default
        .as_deref()
        .ok_or(StatesLanguageError::NoChoiceMatched)
}

pub fn evaluate(condition: &Condition, input: &Value) -> Result<bool, StatesLanguageError> {
    match condition {
        Condition::Not(inner) => Ok(!evaluate(inner, input)?),
        Condition::And(children) => {
            for child in children {
                if !evaluate(child, input)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Condition::Or(children) => {
            for child in children {
                if evaluate(child, input)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Condition::Leaf(leaf) => evaluate_leaf(leaf, input),
    }
}

fn evaluate_leaf(leaf: &LeafCondition, input: &Value) -> Result<bool, StatesLanguageError> {
    if leaf.operator.is_type_predicate() {
        return Ok(evaluate_type_predicate(leaf, input));
    }

    let lhs = jsonpath::query(input, &leaf.variable).map_err(|_| condition_err(
        ConditionErrorKind::NoMatch { path: leaf.variable.clone() },
    ))?;
    let rhs = resolve_operand(leaf.operand.as_ref(), input, &leaf.variable)?;

    use LeafOperator::*;
    match leaf.operator {
        StringEquals | StringGreaterThan | StringGreaterThanEquals | StringLessThan
        | StringLessThanEquals => {
            let l = as_str(&lhs, &leaf.variable)?;
            let r = as_str(&rhs, &leaf.variable)?;
            Ok(match leaf.operator {
                StringEquals => l == r,
                StringGreaterThan => l > r,
                StringGreaterThanEquals => l >= r,
                StringLessThan => l < r,
                StringLessThanEquals => l <= r,
                _ => unreachable!(),
            })
        }
        StringMatches => {
            let l = as_str(&lhs, &leaf.variable)?;
            let pattern = as_str(&rhs, &leaf.variable)?;
            Ok(glob_match(pattern, l))
        }
        NumericEquals | NumericGreaterThan | NumericGreaterThanEquals | NumericLessThan
        | NumericLessThanEquals => {
            let l = as_number(&lhs, &leaf.variable)?;
            let r = as_number(&rhs, &leaf.variable)?;
            Ok(match leaf.operator {
                NumericEquals => l == r,
                NumericGreaterThan => l > r,
                NumericGreaterThanEquals => l >= r,
                NumericLessThan => l < r,
                NumericLessThanEquals => l <= r,
                _ => unreachable!(),
            })
        }
        BooleanEquals => {
            let l = as_bool(&lhs, &leaf.variable)?;
            let r = as_bool(&rhs, &leaf.variable)?;
            Ok(l == r)
        }
        TimestampEquals | TimestampGreaterThan | TimestampGreaterThanEquals | TimestampLessThan
        | TimestampLessThanEquals => {
            let l = as_timestamp(&lhs, &leaf.variable)?;
            let r = as_timestamp(&rhs, &leaf.variable)?;
            Ok(match leaf.operator {
                TimestampEquals => l == r,
                TimestampGreaterThan => l > r,
                TimestampGreaterThanEquals => l >= r,
                TimestampLessThan => l < r,
                TimestampLessThanEquals => l <= r,
                _ => unreachable!(),
            })
        }
        IsNull | IsPresent | IsNumeric | IsString | IsBoolean | IsTimestamp => {
            unreachable!("type predicates are routed to evaluate_type_predicate")
        }
    }
}

fn evaluate_type_predicate(leaf: &LeafCondition, input: &Value) -> bool {
    let expected = match leaf.operand.as_ref() {
        Some(Operand::BoolLit(b)) => *b,
        _ => true,
    };
    let found = jsonpath::query_optional(input, &leaf.variable);

    let actual = match leaf.operator {
        LeafOperator::IsPresent => found.is_some(),
        LeafOperator::IsNull => found.as_ref().is_some_and(Value::is_null),
        LeafOperator::IsNumeric => found.as_ref().is_some_and(Value::is_number),
        LeafOperator::IsString => found.as_ref().is_some_and(Value::is_string),
        LeafOperator::IsBoolean => found.as_ref().is_some_and(Value::is_boolean),
        LeafOperator::IsTimestamp => found
            .as_ref()
            .and_then(Value::as_str)
            .is_some_and(|s| parse_rfc3339(s).is_some()),
        _ => unreachable!("not a type predicate"),
    };
    actual == expected
}

fn resolve_operand(
    operand: Option<&Operand>,
    input: &Value,
    variable: &str,
) -> Result<Value, StatesLanguageError> {
    match operand {
        Some(Operand::StringLit(s)) => Ok(Value::String(s.clone())),
        Some(Operand::NumberLit(n)) => Ok(Value::Number(n.clone())),
        Some(Operand::BoolLit(b)) => Ok(Value::Bool(*b)),
        Some(Operand::Path(p)) => jsonpath::query(input, p)
            .map_err(|_| condition_err(ConditionErrorKind::NoMatch { path: p.clone() })),
        None => Err(condition_err(ConditionErrorKind::NoMatch {
            path: variable.to_string(),
        })),
    }
}

fn as_str<'a>(v: &'a Value, path: &str) -> Result<&'a str, StatesLanguageError> {
    v.as_str()
        .ok_or_else(|| condition_err(ConditionErrorKind::NotAString { path: path.to_string() }))
}

fn as_number(v: &Value, path: &str) -> Result<f64, StatesLanguageError> {
    v.as_f64()
        .ok_or_else(|| condition_err(ConditionErrorKind::NotANumber { path: path.to_string() }))
}

fn as_bool(v: &Value, path: &str) -> Result<bool, StatesLanguageError> {
    v.as_bool()
        .ok_or_else(|| condition_err(ConditionErrorKind::NotABoolean { path: path.to_string() }))
}

fn as_timestamp(v: &Value, path: &str) -> Result<chrono::DateTime<chrono::FixedOffset>, StatesLanguageError> {
    let s = as_str(v, path)?;
    parse_rfc3339(s).ok_or_else(|| {
        condition_err(ConditionErrorKind::MalformedTimestamp {
            path: path.to_string(),
            value: s.to_string(),
        })
    })
}

fn parse_rfc3339(s: &str) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    chrono::DateTime::parse_from_rfc3339(s).ok()
}

fn condition_err(kind: ConditionErrorKind) -> StatesLanguageError {
    StatesLanguageError::Condition { kind }
}

/// `StringMatches` wildcard pattern: `*` matches any run of characters,
/// `\*` matches a literal asterisk. No other metacharacters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let segments = split_pattern(pattern);
    match_segments(&segments, text)
}

fn split_pattern(pattern: &str) -> Vec<String> {
    let mut segments = vec![String::new()];
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'*') => {
                segments.last_mut().unwrap().push('*');
                chars.next();
            }
            '*' => segments.push(String::new()),
            other => segments.last_mut().unwrap().push(other),
        }
    }
    segments
}

fn match_segments(segments: &[String], text: &str) -> bool {
    if segments.len() == 1 {
        return segments[0] == text;
    }
    let mut rest = text;
    let first = &segments[0];
    if !rest.starts_with(first.as_str()) {
        return false;
    }
    rest = &rest[first.len()..];

    let last = segments.last().unwrap();
    if !rest.ends_with(last.as_str()) {
        return false;
    }
    if segments.len() > 2 {
        rest = &rest[..rest.len() - last.len()];
    } else {
        return true;
    }

    let mut pos = 0usize;
    for mid in &segments[1..segments.len() - 1] {
        if mid.is_empty() {
            continue;
        }
        match rest[pos..].find(mid.as_str()) {
            Some(found) => pos += found + mid.len(),
            None => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::LeafOperator;
    use serde_json::json;

    #[test]
    fn string_equals_leaf() {
        let input = json!({"name": "alice"});
        let cond = Condition::leaf(LeafOperator::StringEquals, "$.name", Some(Operand::StringLit("alice".into())));
        assert!(evaluate(&cond, &input).unwrap());
    }

    #[test]
    fn and_short_circuits_to_false() {
        let input = json!({"n": 5});
        let cond = Condition::And(vec![
            Condition::leaf(LeafOperator::NumericGreaterThan, "$.n", Some(Operand::NumberLit(10.into()))),
            Condition::leaf(LeafOperator::NumericLessThan, "$.n", Some(Operand::NumberLit(1.into()))),
        ]);
        assert!(!evaluate(&cond, &input).unwrap());
    }

    #[test]
    fn is_present_false_on_missing_path() {
        let input = json!({});
        let cond = Condition::leaf(LeafOperator::IsPresent, "$.missing", Some(Operand::BoolLit(true)));
        assert!(!evaluate(&cond, &input).unwrap());
    }

    #[test]
    fn is_numeric_negation() {
        let input = json!({"v": "not a number"});
        let cond = Condition::leaf(LeafOperator::IsNumeric, "$.v", Some(Operand::BoolLit(false)));
        assert!(evaluate(&cond, &input).unwrap());
    }

    #[test]
    fn string_matches_wildcard() {
        assert!(glob_match("a*c", "abbbc"));
        assert!(!glob_match("a*c", "abbbd"));
        assert!(glob_match("*.log", "app.log"));
        assert!(glob_match("a\\*b", "a*b"));
        assert!(!glob_match("a\\*b", "axb"));
    }

    #[test]
    fn not_inverts() {
        let input = json!({"n": 1});
        let inner = Condition::leaf(LeafOperator::NumericEquals, "$.n", Some(Operand::NumberLit(1.into())));
        assert!(!evaluate(&Condition::Not(Box::new(inner)), &input).unwrap());
    }

    fn rule(condition: Condition, next: &str) -> asl_core::ChoiceRule {
        asl_core::ChoiceRule {
            condition,
            next: next.to_string(),
        }
    }

    #[test]
    fn dispatch_choice_picks_first_match() {
        let input = json!({"v": 5});
        let choice = ChoiceState {
            io: asl_core::CommonIo::default(),
            choices: vec![
                rule(
                    Condition::leaf(LeafOperator::NumericLessThan, "$.v", Some(Operand::NumberLit(10.into()))),
                    "A",
                ),
                rule(
                    Condition::leaf(LeafOperator::NumericLessThan, "$.v", Some(Operand::NumberLit(100.into()))),
                    "B",
                ),
            ],
            default: Some("D".to_string()),
        };
        assert_eq!(dispatch_choice(&choice, &input).unwrap(), "A");
    }

    #[test]
    fn dispatch_choice_falls_back_to_default() {
        let input = json!({"v": 500});
        let choice = ChoiceState {
            io: asl_core::CommonIo::default(),
            choices: vec![rule(
                Condition::leaf(LeafOperator::NumericLessThan, "$.v", Some(Operand::NumberLit(10.into()))),
                "A",
            )],
            default: Some("D".to_string()),
        };
        assert_eq!(dispatch_choice(&choice, &input).unwrap(), "D");
    }

    #[test]
    fn dispatch_choice_errors_with_no_choice_matched() {
        let input = json!({"v": 500});
        let choice = ChoiceState {
            io: asl_core::CommonIo::default(),
            choices: vec![rule(
                Condition::leaf(LeafOperator::NumericLessThan, "$.v", Some(Operand::NumberLit(10.into()))),
                "A",
            )],
            default: None,
        };
        assert!(matches!(
            dispatch_choice(&choice, &input),
            Err(StatesLanguageError::NoChoiceMatched)
        ));
    }
}
