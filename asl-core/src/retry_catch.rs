use serde::{Deserialize, Serialize};

/// A single retry rule. `States.ALL` is allowed as an `ErrorEquals` entry
/// but only as the last retrier in a state's `Retry` array and only as the
/// sole name in that entry (spec.md §4.1 invariant 8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retrier {
    #[serde(rename = "ErrorEquals")]
    pub error_equals: Vec<String>,
    #[serde(rename = "IntervalSeconds", default, skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    #[serde(rename = "MaxAttempts", default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    #[serde(rename = "BackoffRate", default, skip_serializing_if = "Option::is_none")]
    pub backoff_rate: Option<f64>,
    #[serde(rename = "MaxDelaySeconds", default, skip_serializing_if = "Option::is_none")]
    pub max_delay_seconds: Option<u64>,
    #[serde(rename = "JitterStrategy", default, skip_serializing_if = "Option::is_none")]
    pub jitter_strategy: Option<JitterStrategy>,
}

impl Retrier {
    pub const DEFAULT_INTERVAL_SECONDS: u64 = 1;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BACKOFF_RATE: f64 = 2.0;

    pub fn effective_interval_seconds(&self) -> u64 {
        self.interval_seconds.unwrap_or(Self::DEFAULT_INTERVAL_SECONDS)
    }

    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(Self::DEFAULT_MAX_ATTEMPTS)
    }

    pub fn effective_backoff_rate(&self) -> f64 {
        self.backoff_rate.unwrap_or(Self::DEFAULT_BACKOFF_RATE)
    }

    pub fn matches_all(&self) -> bool {
        self.error_equals.iter().any(|e| e == "States.ALL")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JitterStrategy {
    #[serde(rename = "FULL")]
    Full,
    #[serde(rename = "NONE")]
    None,
}

/// A single catch rule: on match, transitions to `next` with the error
/// (optionally) merged into the input at `result_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catcher {
    #[serde(rename = "ErrorEquals")]
    pub error_equals: Vec<String>,
    #[serde(rename = "ResultPath", default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    #[serde(rename = "Next")]
    pub next: String,
}

impl Catcher {
    pub fn matches_all(&self) -> bool {
        self.error_equals.iter().any(|e| e == "States.ALL")
    }
}

/// Checks the "`States.ALL` must be last and sole" invariant shared by
/// `Retry` and `Catch` arrays (spec.md §4.1 invariant 8). Returns the
/// index of the offending entry, if any.
pub fn check_all_is_last_and_sole(entries: &[Vec<String>]) -> Option<usize> {
    let mut seen_all_at: Option<usize> = None;
    for (idx, names) in entries.iter().enumerate() {
        let has_all = names.iter().any(|e| e == "States.ALL");
        if has_all {
            if names.len() != 1 {
                return Some(idx);
            }
            seen_all_at = Some(idx);
        }
    }
    match seen_all_at {
        Some(idx) if idx + 1 != entries.len() => Some(idx),
        _ => None,
    }
}
