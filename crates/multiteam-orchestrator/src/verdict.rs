//! Parsing of reviewer output into a [`ReviewVerdict`].
//!
//! Reviewers answer in free text that is expected to contain a JSON object
//! `{"approved": bool, "corrected_instruction": string | null}`. Parsing is
//! deliberately narrow; what to do with text that does not parse is decided
//! by the caller through [`UnparseablePolicy`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// A reviewer's judgement of one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewVerdict {
    /// Whether the attempt is accepted.
    pub approved: bool,
    /// Replacement instruction for the next attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_instruction: Option<String>,
}

impl ReviewVerdict {
    /// An approval.
    pub fn approve() -> Self {
        Self {
            approved: true,
            corrected_instruction: None,
        }
    }

    /// A rejection, optionally carrying a corrected instruction.
    pub fn reject(correction: Option<String>) -> Self {
        Self {
            approved: false,
            corrected_instruction: correction,
        }
    }
}

/// What to do when reviewer output cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparseablePolicy {
    /// Treat as approved, flagged as unverified.
    #[default]
    FailOpen,
    /// Treat as a rejection without correction.
    FailClosed,
}

/// Why reviewer output could not be read as a verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerdictParseError {
    /// No `{...}` span in the text.
    #[error("no JSON object found in reviewer output")]
    NoObject,
    /// A span was found but is not valid JSON.
    #[error("malformed verdict JSON: {0}")]
    Malformed(String),
    /// The object lacks an `approved` key.
    #[error("missing 'approved' field")]
    MissingApproved,
    /// `approved` is neither a boolean nor a yes/no word.
    #[error("unrecognised 'approved' value: {0}")]
    InvalidApproved(String),
    /// The correction is not a string or null.
    #[error("'corrected_instruction' must be a string or null")]
    InvalidCorrection,
}

const CORRECTION_KEYS: [&str; 3] = ["corrected_instruction", "correction", "instruction"];

#[allow(clippy::expect_used)]
fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid fence regex"))
}

/// First JSON value of `text`, ignoring whatever follows it.
fn first_value(text: &str) -> Option<(Result<Value, serde_json::Error>, usize)> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    let value = stream.next()?;
    Some((value, stream.byte_offset()))
}

/// Locate the JSON object in free text: a fenced block if present, else the
/// object starting at the first `{`. When that does not parse as JSON, falls
/// back to the span from the first `{` to the last `}`.
pub(crate) fn extract_json_object(text: &str) -> Option<&str> {
    if let Some(caps) = fence_re().captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }
    let start = text.find('{')?;
    let tail = &text[start..];
    if let Some((Ok(Value::Object(_)), end)) = first_value(tail) {
        return Some(&tail[..end]);
    }
    let end = tail.rfind('}')?;
    Some(&tail[..=end])
}

/// Rewrite Python-style literals into JSON: single-quoted strings become
/// double-quoted, and `True`/`False`/`None` outside strings become
/// `true`/`false`/`null`. String contents are left alone.
fn normalize_python_literals(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => match c {
                '\\' => match chars.next() {
                    // `\'` is not a JSON escape.
                    Some('\'') => out.push('\''),
                    Some(next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                },
                c if c == q => {
                    out.push('"');
                    quote = None;
                }
                '"' => out.push_str("\\\""),
                c => out.push(c),
            },
            None => match c {
                '"' | '\'' => {
                    out.push('"');
                    quote = Some(c);
                }
                c if c.is_alphanumeric() || c == '_' => {
                    let mut word = String::from(c);
                    while let Some(&next) = chars.peek() {
                        if !(next.is_alphanumeric() || next == '_') {
                            break;
                        }
                        word.push(next);
                        chars.next();
                    }
                    out.push_str(match word.as_str() {
                        "True" => "true",
                        "False" => "false",
                        "None" => "null",
                        other => other,
                    });
                }
                c => out.push(c),
            },
        }
    }
    out
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, VerdictParseError> {
    let first = match first_value(raw) {
        Some((Ok(Value::Object(map)), _)) => return Ok(map),
        Some((Ok(_), _)) | None => return Err(VerdictParseError::NoObject),
        Some((Err(e), _)) => e,
    };
    match first_value(&normalize_python_literals(raw)) {
        Some((Ok(Value::Object(map)), _)) => Ok(map),
        _ => Err(VerdictParseError::Malformed(first.to_string())),
    }
}

fn read_approved(value: &Value) -> Result<bool, VerdictParseError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "approved" | "approve" | "accept" | "accepted" => Ok(true),
            "false" | "no" | "rejected" | "reject" => Ok(false),
            _ => Err(VerdictParseError::InvalidApproved(s.clone())),
        },
        other => Err(VerdictParseError::InvalidApproved(other.to_string())),
    }
}

fn read_correction(map: &Map<String, Value>) -> Result<Option<String>, VerdictParseError> {
    let Some(value) = CORRECTION_KEYS.iter().find_map(|key| map.get(*key)) else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        _ => Err(VerdictParseError::InvalidCorrection),
    }
}

/// Parse reviewer output into a verdict.
pub fn parse_verdict(text: &str) -> Result<ReviewVerdict, VerdictParseError> {
    let raw = extract_json_object(text).ok_or(VerdictParseError::NoObject)?;
    let map = parse_object(raw)?;
    let approved = map
        .get("approved")
        .ok_or(VerdictParseError::MissingApproved)
        .and_then(read_approved)?;
    let corrected_instruction = read_correction(&map)?;
    Ok(ReviewVerdict {
        approved,
        corrected_instruction,
    })
}
