//! Thin wrapper around `jsonpath-rust` for read-side path resolution
//! (`InputPath`, `OutputPath`, `Parameters` path fields, intrinsic path
//! arguments). Write targets (`ResultPath`, `ItemsPath`) use the
//! restricted `asl_core::ReferencePath` parser instead — see `io.rs`.

use asl_core::StatesLanguageError;
use jsonpath_rust::JsonPathQuery;
use serde_json::Value;

/// Resolves `path` against `input`. A path matching zero values is a
/// `PathMatchFailure`; a path matching exactly one value unwraps to that
/// value; a path matching more than one value is returned as a JSON array
/// (the pinned decision for multi-token matches, see DESIGN.md).
pub fn query(input: &Value, path: &str) -> Result<Value, StatesLanguageError> {
    if path == "$" {
        return Ok(input.clone());
    }

    let matches = input
        .clone()
        .path(path)
        .map_err(|_| StatesLanguageError::PathMatchFailure {
            path: path.to_string(),
            input: input.clone(),
        })?;

    match matches {
        Value::Array(items) if items.is_empty() => Err(StatesLanguageError::PathMatchFailure {
            path: path.to_string(),
            input: input.clone(),
        }),
        Value::Array(mut items) if items.len() == 1 => Ok(items.remove(0)),
        other => Ok(other),
    }
}

/// Like [`query`], but a non-matching path yields `None` instead of an
/// error. Used by the type-predicate comparators, which treat absence as
/// `false` rather than an evaluation error.
pub fn query_optional(input: &Value, path: &str) -> Option<Value> {
    query(input, path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_path_returns_whole_input() {
        let input = json!({"a": 1});
        assert_eq!(query(&input, "$").unwrap(), input);
    }

    #[test]
    fn single_match_unwraps() {
        let input = json!({"a": {"b": 5}});
        assert_eq!(query(&input, "$.a.b").unwrap(), json!(5));
    }

    #[test]
    fn no_match_is_an_error() {
        let input = json!({"a": 1});
        assert!(query(&input, "$.missing").is_err());
    }

    #[test]
    fn no_match_is_none_when_optional() {
        let input = json!({"a": 1});
        assert!(query_optional(&input, "$.missing").is_none());
    }
}
