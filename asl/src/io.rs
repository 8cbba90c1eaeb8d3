//! The I/O processor: the chain of filters ASL applies around a state's
//! execution — `InputPath` → `Parameters` → (state work happens
//! elsewhere) → `ResultSelector` → `ResultPath` merge → `OutputPath`.
//! Every step here is a pure function of its inputs; none of them hold
//! state, matching how the rest of this crate is organized (validator,
//! evaluator: all free functions over borrowed data).

use asl_core::{PathToken, ReferencePath, StatesLanguageError, TriState};
use serde_json::Value;

use crate::intrinsics::IntrinsicRegistry;
use crate::jsonpath;

/// Applies `InputPath` to the raw state input. `Unset` is the identity
/// filter (`$`); `Null` discards the input entirely.
pub fn effective_input(input_path: &TriState<String>, raw_input: &Value) -> Result<Value, StatesLanguageError> {
    match input_path {
        TriState::Unset => Ok(raw_input.clone()),
        TriState::Null => Ok(Value::Null),
        TriState::Value(path) => jsonpath::query(raw_input, path),
    }
}

/// Applies a `Parameters` (or `ItemSelector`) payload template, if any, to
/// the filtered input. `context` is the execution context object reachable
/// through `$$`-prefixed paths in the template.
pub fn apply_payload_template(
    template: Option<&Value>,
    input: &Value,
    context: &Value,
    registry: &IntrinsicRegistry,
) -> Result<Value, StatesLanguageError> {
    match template {
        None => Ok(input.clone()),
        Some(template) => transform_template(template, input, context, registry),
    }
}

fn transform_template(
    node: &Value,
    input: &Value,
    context: &Value,
    registry: &IntrinsicRegistry,
) -> Result<Value, StatesLanguageError> {
    match node {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                if let Some(base) = key.strip_suffix(".$") {
                    let resolved = resolve_dynamic_value(value, input, context, registry, key)?;
                    out.insert(base.to_string(), resolved);
                } else {
                    out.insert(key.clone(), transform_template(value, input, context, registry)?);
                }
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(transform_template(item, input, context, registry)?);
            }
            Ok(Value::Array(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_dynamic_value(
    value: &Value,
    input: &Value,
    context: &Value,
    registry: &IntrinsicRegistry,
    key: &str,
) -> Result<Value, StatesLanguageError> {
    let expr = value.as_str().ok_or_else(|| StatesLanguageError::ParameterPathFailure {
        path: key.to_string(),
        input: input.clone(),
    })?;

    if let Some(context_path) = expr.strip_prefix('$').filter(|_| expr.starts_with("$$")) {
        // "$$.Execution.Id" -> strip one leading '$', query "$.Execution.Id" against context.
        return jsonpath::query(context, context_path);
    }
    if expr.starts_with("States.") {
        return registry.evaluate(expr, input);
    }
    if expr.starts_with('$') {
        return jsonpath::query(input, expr);
    }
    Err(StatesLanguageError::ParameterPathFailure {
        path: expr.to_string(),
        input: input.clone(),
    })
}

/// Applies `ResultSelector` to a state's raw result, same payload-template
/// semantics as `Parameters` but with the result itself, not the state
/// input, as the `$`-rooted document.
pub fn effective_result(
    result_selector: Option<&Value>,
    raw_result: &Value,
    context: &Value,
    registry: &IntrinsicRegistry,
) -> Result<Value, StatesLanguageError> {
    apply_payload_template(result_selector, raw_result, context, registry)
}

/// Merges a state's result into the filtered input at `ResultPath`.
/// `Unset` defaults to `$` (the result fully replaces the input); `Null`
/// discards the result and passes the input through unchanged.
pub fn merge_result_path(
    effective_input: &Value,
    result_path: &TriState<String>,
    result: &Value,
) -> Result<Value, StatesLanguageError> {
    match result_path {
        TriState::Unset => Ok(result.clone()),
        TriState::Null => Ok(effective_input.clone()),
        TriState::Value(path) if path == "$" => Ok(result.clone()),
        TriState::Value(path) => {
            let reference = ReferencePath::parse(path).map_err(|_| StatesLanguageError::ResultPathMatchFailure {
                path: path.clone(),
                input: effective_input.clone(),
                result: result.clone(),
            })?;
            if !matches!(effective_input, Value::Object(_) | Value::Array(_) | Value::Null) {
                return Err(StatesLanguageError::ResultPathMatchFailure {
                    path: path.clone(),
                    input: effective_input.clone(),
                    result: result.clone(),
                });
            }
            tracing::trace!(%path, "merging result at ResultPath");
            let mut out = effective_input.clone();
            set_at_path(&mut out, reference.tokens(), result.clone());
            Ok(out)
        }
    }
}

/// Writes `value` at `tokens` inside `current`, synthesizing missing
/// intermediate objects/arrays along the way (ASL's `ResultPath` can target
/// a field that does not yet exist anywhere in the input document).
fn set_at_path(current: &mut Value, tokens: &[PathToken], value: Value) {
    match tokens.split_first() {
        None => *current = value,
        Some((PathToken::Field(name), rest)) => {
            if !current.is_object() {
                *current = Value::Object(serde_json::Map::new());
            }
            let obj = current.as_object_mut().expect("just coerced to object");
            let entry = obj.entry(name.clone()).or_insert(Value::Null);
            set_at_path(entry, rest, value);
        }
        Some((PathToken::Index(idx), rest)) => {
            if !current.is_array() {
                *current = Value::Array(Vec::new());
            }
            let arr = current.as_array_mut().expect("just coerced to array");
            while arr.len() <= *idx {
                arr.push(Value::Null);
            }
            set_at_path(&mut arr[*idx], rest, value);
        }
    }
}

/// Applies `OutputPath` to the state's post-merge result. `Unset` passes
/// the merged value through unchanged; `Null` discards it.
pub fn effective_output(output_path: &TriState<String>, merged: &Value) -> Result<Value, StatesLanguageError> {
    match output_path {
        TriState::Unset => Ok(merged.clone()),
        TriState::Null => Ok(Value::Null),
        TriState::Value(path) => jsonpath::query(merged, path),
    }
}

/// Resolves a `Fail` state's `Error`/`Cause` field, which may be given
/// either as a literal or as a `*Path` pointing at a string in the input.
pub fn fail_field(
    literal: Option<&str>,
    path: Option<&str>,
    input: &Value,
) -> Result<Option<String>, StatesLanguageError> {
    if let Some(path) = path {
        let resolved = jsonpath::query(input, path)?;
        let s = resolved
            .as_str()
            .ok_or_else(|| StatesLanguageError::PathMatchFailure {
                path: path.to_string(),
                input: input.clone(),
            })?
            .to_string();
        return Ok(Some(s));
    }
    Ok(literal.map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unset_input_path_is_identity() {
        let input = json!({"a": 1});
        assert_eq!(effective_input(&TriState::Unset, &input).unwrap(), input);
    }

    #[test]
    fn null_input_path_discards_input() {
        let input = json!({"a": 1});
        assert_eq!(effective_input(&TriState::Null, &input).unwrap(), Value::Null);
    }

    #[test]
    fn parameters_resolve_path_and_context() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({"name": "ada"});
        let context = json!({"Execution": {"Id": "exec-1"}});
        let template = json!({
            "name.$": "$.name",
            "execId.$": "$$.Execution.Id",
            "literal": "fixed",
        });
        let result = apply_payload_template(Some(&template), &input, &context, &registry).unwrap();
        assert_eq!(
            result,
            json!({"name": "ada", "execId": "exec-1", "literal": "fixed"})
        );
    }

    #[test]
    fn parameters_resolve_intrinsic_call() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({"name": "ada"});
        let context = json!({});
        let template = json!({"greeting.$": "States.Format('hi {}', $.name)"});
        let result = apply_payload_template(Some(&template), &input, &context, &registry).unwrap();
        assert_eq!(result, json!({"greeting": "hi ada"}));
    }

    #[test]
    fn result_path_merge_synthesizes_missing_objects() {
        let input = json!({"existing": true});
        let result = json!({"value": 42});
        let out = merge_result_path(
            &input,
            &TriState::Value("$.deep.nested".to_string()),
            &result,
        )
        .unwrap();
        assert_eq!(
            out,
            json!({"existing": true, "deep": {"nested": {"value": 42}}})
        );
    }

    #[test]
    fn result_path_null_discards_result() {
        let input = json!({"a": 1});
        let result = json!({"b": 2});
        let out = merge_result_path(&input, &TriState::Null, &result).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn result_path_unset_defaults_to_full_replace() {
        let input = json!({"a": 1});
        let result = json!({"b": 2});
        let out = merge_result_path(&input, &TriState::Unset, &result).unwrap();
        assert_eq!(out, result);
    }

    #[test]
    fn result_path_rejects_scalar_input_with_non_identity_path() {
        let input = json!("just a string");
        let result = json!({"b": 2});
        let err = merge_result_path(&input, &TriState::Value("$.b".to_string()), &result).unwrap_err();
        assert!(matches!(err, StatesLanguageError::ResultPathMatchFailure { .. }));
    }
}
