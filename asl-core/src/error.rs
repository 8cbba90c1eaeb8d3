use serde_json::Value;

/// A single structural violation found while validating a candidate
/// state machine. Carries a dotted pointer (`states.Foo.Retriers[1].MaxAttempts`)
/// so callers can locate the offending field without re-walking the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl core::fmt::Display for Violation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The root error type for every fallible operation this crate exposes.
#[derive(Debug, thiserror::Error)]
pub enum StatesLanguageError {
    #[error("state machine failed validation with {} violation(s)", .violations.len())]
    Validation { violations: Vec<Violation> },

    #[error("failed to deserialize ASL document: {message}")]
    Serialization {
        message: String,
        #[source]
        cause: Option<serde_json::Error>,
    },

    #[error("path {path} matched no value in input: {input}")]
    PathMatchFailure { path: String, input: Value },

    #[error("parameter path {path} could not be resolved against input/context")]
    ParameterPathFailure { path: String, input: Value },

    #[error("result cannot be merged at result path {path}")]
    ResultPathMatchFailure {
        path: String,
        input: Value,
        result: Value,
    },

    #[error("intrinsic function syntax error at position {position}: {message}")]
    IntrinsicFunctionSyntaxError { position: usize, message: String },

    #[error("intrinsic function not found: {name}")]
    IntrinsicFunctionNotFound { name: String },

    #[error("intrinsic function {name} argument {arg_index}: {reason}")]
    IntrinsicFunctionArgumentError {
        name: String,
        arg_index: usize,
        reason: String,
    },

    #[error("condition evaluation error: {kind}")]
    Condition { kind: ConditionErrorKind },

    #[error("States.NoChoiceMatched: no choice condition matched and no Default was set")]
    NoChoiceMatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionErrorKind {
    NotANumber { path: String },
    NotAString { path: String },
    NotABoolean { path: String },
    MalformedTimestamp { path: String, value: String },
    NoMatch { path: String },
    AmbiguousMatch { path: String },
    EmptyCombinator,
}

impl core::fmt::Display for ConditionErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConditionErrorKind::NotANumber { path } => write!(f, "{path} is not a number"),
            ConditionErrorKind::NotAString { path } => write!(f, "{path} is not a string"),
            ConditionErrorKind::NotABoolean { path } => write!(f, "{path} is not a boolean"),
            ConditionErrorKind::MalformedTimestamp { path, value } => {
                write!(f, "{path} ({value}) is not a valid ISO-8601 timestamp")
            }
            ConditionErrorKind::NoMatch { path } => write!(f, "{path} matched no value"),
            ConditionErrorKind::AmbiguousMatch { path } => {
                write!(f, "{path} matched more than one value")
            }
            ConditionErrorKind::EmptyCombinator => {
                write!(f, "And/Or requires at least one child condition")
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, StatesLanguageError>;
