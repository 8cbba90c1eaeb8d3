//! The `States.Name(args)` intrinsic function language: a recursive-descent
//! parser over the call expression, and a registry of named implementations
//! that evaluate the parsed argument tree against the current input.

use std::collections::HashMap;
use std::sync::Arc;

use asl_core::StatesLanguageError;
use base64::Engine;
use serde_json::{Number, Value};

use crate::jsonpath;

/// One parsed argument to an intrinsic call: a JSON literal, a reference
/// path to resolve against the active input, or a nested intrinsic call.
#[derive(Debug, Clone, PartialEq)]
pub enum IntrinsicArg {
    Literal(Value),
    Path(String),
    Call(IntrinsicCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicCall {
    pub name: String,
    pub args: Vec<IntrinsicArg>,
}

/// Parses a `States.Name(arg, arg, ...)` expression. Accepts only what
/// intrinsic argument lists use: strings (single-quoted, no escapes other
/// than `\'`), numbers, booleans, `null`, `$`-rooted paths, and nested
/// calls, separated by commas with optional surrounding whitespace.
pub fn parse(expr: &str) -> Result<IntrinsicCall, StatesLanguageError> {
    let mut parser = Parser { src: expr, pos: 0 };
    let call = parser.parse_call()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return Err(syntax_err(parser.pos, "trailing characters after intrinsic call"));
    }
    Ok(call)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += self.peek().unwrap().len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn expect(&mut self, c: char) -> Result<(), StatesLanguageError> {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(syntax_err(self.pos, &format!("expected '{c}'")))
        }
    }

    fn parse_call(&mut self) -> Result<IntrinsicCall, StatesLanguageError> {
        self.skip_ws();
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '.' || c == '_')
        {
            self.pos += self.peek().unwrap().len_utf8();
        }
        if start == self.pos {
            return Err(syntax_err(start, "expected a function name"));
        }
        let name = self.src[start..self.pos].to_string();
        self.skip_ws();
        self.expect('(')?;
        let mut args = Vec::new();
        self.skip_ws();
        if self.peek() != Some(')') {
            loop {
                args.push(self.parse_arg()?);
                self.skip_ws();
                match self.peek() {
                    Some(',') => {
                        self.pos += 1;
                        self.skip_ws();
                    }
                    _ => break,
                }
            }
        }
        self.skip_ws();
        self.expect(')')?;
        Ok(IntrinsicCall { name, args })
    }

    fn parse_arg(&mut self) -> Result<IntrinsicArg, StatesLanguageError> {
        self.skip_ws();
        match self.peek() {
            Some('$') => {
                let start = self.pos;
                self.pos += 1;
                while self
                    .peek()
                    .is_some_and(|c| !matches!(c, ',' | ')' | ' ' | '\t'))
                {
                    self.pos += self.peek().unwrap().len_utf8();
                }
                Ok(IntrinsicArg::Path(self.src[start..self.pos].to_string()))
            }
            Some('\'') => {
                self.pos += 1;
                let start = self.pos;
                let mut buf = String::new();
                loop {
                    match self.peek() {
                        None => return Err(syntax_err(self.pos, "unterminated string literal")),
                        Some('\'') => {
                            if self.src[self.pos + 1..].starts_with('\'') {
                                buf.push('\'');
                                self.pos += 2;
                            } else {
                                self.pos += 1;
                                break;
                            }
                        }
                        Some(c) => {
                            buf.push(c);
                            self.pos += c.len_utf8();
                        }
                    }
                }
                let _ = start;
                Ok(IntrinsicArg::Literal(Value::String(buf)))
            }
            Some(c) if c == '-' || c.is_ascii_digit() => {
                let start = self.pos;
                if c == '-' {
                    self.pos += 1;
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '.') {
                    self.pos += 1;
                }
                let text = &self.src[start..self.pos];
                let n: Number = if text.contains('.') {
                    text.parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .ok_or_else(|| syntax_err(start, "invalid numeric literal"))?
                } else {
                    text.parse::<i64>()
                        .map(Number::from)
                        .map_err(|_| syntax_err(start, "invalid numeric literal"))?
                };
                Ok(IntrinsicArg::Literal(Value::Number(n)))
            }
            Some('t') | Some('f') => {
                if self.src[self.pos..].starts_with("true") {
                    self.pos += 4;
                    Ok(IntrinsicArg::Literal(Value::Bool(true)))
                } else if self.src[self.pos..].starts_with("false") {
                    self.pos += 5;
                    Ok(IntrinsicArg::Literal(Value::Bool(false)))
                } else {
                    Err(syntax_err(self.pos, "expected 'true' or 'false'"))
                }
            }
            Some('n') if self.src[self.pos..].starts_with("null") => {
                self.pos += 4;
                Ok(IntrinsicArg::Literal(Value::Null))
            }
            Some('[') => {
                self.pos += 1;
                let mut items = Vec::new();
                self.skip_ws();
                if self.peek() != Some(']') {
                    loop {
                        match self.parse_arg()? {
                            IntrinsicArg::Literal(v) => items.push(v),
                            other => return Err(syntax_err(self.pos, &format!("array literal cannot contain {other:?}"))),
                        }
                        self.skip_ws();
                        match self.peek() {
                            Some(',') => {
                                self.pos += 1;
                                self.skip_ws();
                            }
                            _ => break,
                        }
                    }
                }
                self.expect(']')?;
                Ok(IntrinsicArg::Literal(Value::Array(items)))
            }
            Some(c) if c.is_alphabetic() => Ok(IntrinsicArg::Call(self.parse_call()?)),
            _ => Err(syntax_err(self.pos, "unrecognized argument")),
        }
    }
}

fn syntax_err(position: usize, message: &str) -> StatesLanguageError {
    StatesLanguageError::IntrinsicFunctionSyntaxError {
        position,
        message: message.to_string(),
    }
}

pub type IntrinsicFn = Arc<dyn Fn(&[Value], &Value) -> Result<Value, StatesLanguageError> + Send + Sync>;

/// A mutable table of intrinsic function implementations, keyed by their
/// `States.Name`. Seeded with the standard library via
/// [`IntrinsicRegistry::with_standard_functions`]; callers can register
/// additional names or override standard ones.
#[derive(Clone)]
pub struct IntrinsicRegistry {
    functions: HashMap<String, IntrinsicFn>,
}

impl IntrinsicRegistry {
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn with_standard_functions() -> Self {
        let mut registry = Self::empty();
        standard::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, f: IntrinsicFn) {
        self.functions.insert(name.into(), f);
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.functions.remove(name).is_some()
    }

    pub fn call(&self, name: &str, args: &[Value], input: &Value) -> Result<Value, StatesLanguageError> {
        let f = self
            .functions
            .get(name)
            .ok_or_else(|| StatesLanguageError::IntrinsicFunctionNotFound { name: name.to_string() })?;
        f(args, input)
    }

    /// Parses and evaluates a full `States.Name(args)` expression,
    /// resolving nested calls and `$`-paths against `input` first.
    pub fn evaluate(&self, expr: &str, input: &Value) -> Result<Value, StatesLanguageError> {
        let call = parse(expr)?;
        self.evaluate_call(&call, input)
    }

    fn evaluate_call(&self, call: &IntrinsicCall, input: &Value) -> Result<Value, StatesLanguageError> {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.evaluate_arg(arg, input)?);
        }
        self.call(&call.name, &args, input)
    }

    fn evaluate_arg(&self, arg: &IntrinsicArg, input: &Value) -> Result<Value, StatesLanguageError> {
        match arg {
            IntrinsicArg::Literal(v) => Ok(v.clone()),
            IntrinsicArg::Path(p) => jsonpath::query(input, p),
            IntrinsicArg::Call(call) => self.evaluate_call(call, input),
        }
    }
}

impl Default for IntrinsicRegistry {
    fn default() -> Self {
        Self::with_standard_functions()
    }
}

fn arg_err(name: &str, idx: usize, reason: impl Into<String>) -> StatesLanguageError {
    StatesLanguageError::IntrinsicFunctionArgumentError {
        name: name.to_string(),
        arg_index: idx,
        reason: reason.into(),
    }
}

mod standard {
    use super::*;
    use sha1::Sha1;
    use sha2::{Digest, Sha256, Sha384, Sha512};
    use md5::Md5;

    pub fn register_all(registry: &mut IntrinsicRegistry) {
        registry.register("States.Format", Arc::new(format));
        registry.register("States.StringToJson", Arc::new(string_to_json));
        registry.register("States.JsonToString", Arc::new(json_to_string));
        registry.register("States.Array", Arc::new(array));
        registry.register("States.ArrayPartition", Arc::new(array_partition));
        registry.register("States.ArrayContains", Arc::new(array_contains));
        registry.register("States.ArrayRange", Arc::new(array_range));
        registry.register("States.ArrayGetItem", Arc::new(array_get_item));
        registry.register("States.ArrayLength", Arc::new(array_length));
        registry.register("States.ArrayUnique", Arc::new(array_unique));
        registry.register("States.Base64Encode", Arc::new(base64_encode));
        registry.register("States.Base64Decode", Arc::new(base64_decode));
        registry.register("States.Hash", Arc::new(hash));
        registry.register("States.MathRandom", Arc::new(math_random));
        registry.register("States.MathAdd", Arc::new(math_add));
        registry.register("States.StringSplit", Arc::new(string_split));
        registry.register("States.UUID", Arc::new(uuid));
        registry.register("States.JsonMerge", Arc::new(json_merge));
        registry.register("States.StringToUpper", Arc::new(string_to_upper));
        registry.register("States.StringToLower", Arc::new(string_to_lower));
        registry.register("States.Now", Arc::new(now));
    }

    fn as_str<'a>(name: &str, args: &'a [Value], idx: usize) -> Result<&'a str, StatesLanguageError> {
        args.get(idx)
            .and_then(Value::as_str)
            .ok_or_else(|| arg_err(name, idx, "expected a string"))
    }

    fn as_array<'a>(name: &str, args: &'a [Value], idx: usize) -> Result<&'a Vec<Value>, StatesLanguageError> {
        args.get(idx)
            .and_then(Value::as_array)
            .ok_or_else(|| arg_err(name, idx, "expected an array"))
    }

    fn as_i64(name: &str, args: &[Value], idx: usize) -> Result<i64, StatesLanguageError> {
        args.get(idx)
            .and_then(Value::as_i64)
            .ok_or_else(|| arg_err(name, idx, "expected an integer"))
    }

    fn format(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let template = as_str("States.Format", args, 0)?;
        let mut out = String::new();
        let mut rest = template;
        let mut next_arg = 1usize;
        while let Some(idx) = rest.find("{}") {
            out.push_str(&rest[..idx]);
            let value = args
                .get(next_arg)
                .ok_or_else(|| arg_err("States.Format", next_arg, "missing substitution argument"))?;
            out.push_str(&value_to_display(value));
            next_arg += 1;
            rest = &rest[idx + 2..];
        }
        out.push_str(rest);
        Ok(Value::String(out))
    }

    fn value_to_display(v: &Value) -> String {
        match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn string_to_json(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let s = as_str("States.StringToJson", args, 0)?;
        serde_json::from_str(s).map_err(|e| arg_err("States.StringToJson", 0, e.to_string()))
    }

    fn json_to_string(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let v = args
            .first()
            .ok_or_else(|| arg_err("States.JsonToString", 0, "missing argument"))?;
        serde_json::to_string(v)
            .map(Value::String)
            .map_err(|e| arg_err("States.JsonToString", 0, e.to_string()))
    }

    fn array(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        Ok(Value::Array(args.to_vec()))
    }

    fn array_partition(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let items = as_array("States.ArrayPartition", args, 0)?;
        let size = as_i64("States.ArrayPartition", args, 1)?;
        if size <= 0 {
            return Err(arg_err("States.ArrayPartition", 1, "partition size must be positive"));
        }
        let size = size as usize;
        let chunks: Vec<Value> = items
            .chunks(size)
            .map(|chunk| Value::Array(chunk.to_vec()))
            .collect();
        Ok(Value::Array(chunks))
    }

    fn array_contains(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let items = as_array("States.ArrayContains", args, 0)?;
        let target = args
            .get(1)
            .ok_or_else(|| arg_err("States.ArrayContains", 1, "missing target value"))?;
        Ok(Value::Bool(items.contains(target)))
    }

    fn array_range(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let start = as_i64("States.ArrayRange", args, 0)?;
        let end = as_i64("States.ArrayRange", args, 1)?;
        let step = as_i64("States.ArrayRange", args, 2)?;
        if step == 0 {
            return Err(arg_err("States.ArrayRange", 2, "step must not be zero"));
        }
        let mut out = Vec::new();
        let mut cur = start;
        if step > 0 {
            while cur <= end {
                out.push(Value::Number(cur.into()));
                cur += step;
            }
        } else {
            while cur >= end {
                out.push(Value::Number(cur.into()));
                cur += step;
            }
        }
        Ok(Value::Array(out))
    }

    fn array_get_item(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let items = as_array("States.ArrayGetItem", args, 0)?;
        let idx = as_i64("States.ArrayGetItem", args, 1)?;
        if idx < 0 {
            return Err(arg_err("States.ArrayGetItem", 1, "index must be non-negative"));
        }
        items
            .get(idx as usize)
            .cloned()
            .ok_or_else(|| arg_err("States.ArrayGetItem", 1, "index out of bounds"))
    }

    fn array_length(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let items = as_array("States.ArrayLength", args, 0)?;
        Ok(Value::Number(items.len().into()))
    }

    fn array_unique(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let items = as_array("States.ArrayUnique", args, 0)?;
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
        Ok(Value::Array(out))
    }

    fn base64_encode(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let s = as_str("States.Base64Encode", args, 0)?;
        Ok(Value::String(base64::engine::general_purpose::STANDARD.encode(s)))
    }

    fn base64_decode(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let s = as_str("States.Base64Decode", args, 0)?;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| arg_err("States.Base64Decode", 0, e.to_string()))?;
        String::from_utf8(bytes)
            .map(Value::String)
            .map_err(|e| arg_err("States.Base64Decode", 0, e.to_string()))
    }

    fn hash(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let data = as_str("States.Hash", args, 0)?;
        let algorithm = as_str("States.Hash", args, 1)?;
        let digest = match algorithm {
            "MD5" => hex(Md5::digest(data.as_bytes())),
            "SHA-1" => hex(Sha1::digest(data.as_bytes())),
            "SHA-256" => hex(Sha256::digest(data.as_bytes())),
            "SHA-384" => hex(Sha384::digest(data.as_bytes())),
            "SHA-512" => hex(Sha512::digest(data.as_bytes())),
            other => return Err(arg_err("States.Hash", 1, format!("unsupported algorithm {other}"))),
        };
        Ok(Value::String(digest))
    }

    fn hex(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    fn math_random(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let start = as_i64("States.MathRandom", args, 0)?;
        let end = as_i64("States.MathRandom", args, 1)?;
        if start >= end {
            return Err(arg_err("States.MathRandom", 1, "end must be > start"));
        }
        let value = match args.get(2) {
            None => rand::thread_rng().gen_range(start..end),
            Some(_) => {
                let seed = as_i64("States.MathRandom", args, 2)?;
                StdRng::seed_from_u64(seed as u64).gen_range(start..end)
            }
        };
        Ok(Value::Number(value.into()))
    }

    fn math_add(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let a = as_i64("States.MathAdd", args, 0)?;
        let b = as_i64("States.MathAdd", args, 1)?;
        Ok(Value::Number((a + b).into()))
    }

    fn string_split(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let s = as_str("States.StringSplit", args, 0)?;
        let delimiter = as_str("States.StringSplit", args, 1)?;
        let parts: Vec<Value> = if delimiter.is_empty() {
            vec![Value::String(s.to_string())]
        } else {
            s.split(|c| delimiter.contains(c))
                .map(|p| Value::String(p.to_string()))
                .collect()
        };
        Ok(Value::Array(parts))
    }

    fn uuid(_args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        Ok(Value::String(uuid::Uuid::new_v4().to_string()))
    }

    fn json_merge(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        let a = args
            .first()
            .ok_or_else(|| arg_err("States.JsonMerge", 0, "missing argument"))?;
        let b = args
            .get(1)
            .ok_or_else(|| arg_err("States.JsonMerge", 1, "missing argument"))?;
        let (Value::Object(a_map), Value::Object(b_map)) = (a, b) else {
            return Err(arg_err("States.JsonMerge", 0, "both arguments must be objects"));
        };
        let mut merged = a_map.clone();
        for (k, v) in b_map {
            merged.insert(k.clone(), v.clone());
        }
        Ok(Value::Object(merged))
    }

    fn string_to_upper(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        Ok(Value::String(as_str("States.StringToUpper", args, 0)?.to_uppercase()))
    }

    fn string_to_lower(args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        Ok(Value::String(as_str("States.StringToLower", args, 0)?.to_lowercase()))
    }

    fn now(_args: &[Value], _input: &Value) -> Result<Value, StatesLanguageError> {
        Ok(Value::String(chrono::Utc::now().to_rfc3339()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_call_with_path_and_literal() {
        let call = parse("States.Format('hello {}', $.name)").unwrap();
        assert_eq!(call.name, "States.Format");
        assert_eq!(call.args.len(), 2);
        assert!(matches!(call.args[1], IntrinsicArg::Path(ref p) if p == "$.name"));
    }

    #[test]
    fn evaluates_format_with_path_substitution() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({"name": "world"});
        let result = registry.evaluate("States.Format('hello {}!', $.name)", &input).unwrap();
        assert_eq!(result, json!("hello world!"));
    }

    #[test]
    fn array_length_and_contains() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({});
        assert_eq!(
            registry.evaluate("States.ArrayLength(States.Array(1, 2, 3))", &input).unwrap(),
            json!(3)
        );
    }

    #[test]
    fn hash_sha256_is_stable() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({});
        let result = registry.evaluate("States.Hash('abc', 'SHA-256')", &input).unwrap();
        assert_eq!(
            result,
            json!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn unknown_function_errors() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({});
        assert!(registry.evaluate("States.NotReal()", &input).is_err());
    }

    #[test]
    fn can_register_custom_function() {
        let mut registry = IntrinsicRegistry::empty();
        registry.register("Custom.Echo", Arc::new(|args, _input| Ok(args[0].clone())));
        let input = json!({});
        assert_eq!(registry.evaluate("Custom.Echo('hi')", &input).unwrap(), json!("hi"));
    }

    #[test]
    fn math_random_respects_half_open_range() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({});
        for _ in 0..20 {
            let value = registry.evaluate("States.MathRandom(1, 2)", &input).unwrap();
            assert_eq!(value, json!(1));
        }
    }

    #[test]
    fn math_random_with_seed_is_deterministic() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({});
        let a = registry.evaluate("States.MathRandom(0, 1000, 42)", &input).unwrap();
        let b = registry.evaluate("States.MathRandom(0, 1000, 42)", &input).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn string_split_treats_delimiter_as_character_set() {
        let registry = IntrinsicRegistry::with_standard_functions();
        let input = json!({});
        let result = registry.evaluate("States.StringSplit('a,b;c', ',;')", &input).unwrap();
        assert_eq!(result, json!(["a", "b", "c"]));
    }
}
