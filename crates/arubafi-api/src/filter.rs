// Query filter DSL for the Mobility Master object API.
//
// The upstream accepts a JSON array of clauses in the `filter` query
// parameter: `[{"<table>.<field>": {"<op>": ["<value>"]}}]`. Callers either
// hand over a structured triple, or a raw string that is passed through
// after a cheap balance check.

use std::str::FromStr;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::Error;

/// Comparison operator of a filter clause. Displays as its wire form
/// (`$eq`, `$in`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::AsRefStr)]
pub enum FilterOp {
    #[default]
    #[strum(serialize = "$eq")]
    Eq,
    #[strum(serialize = "$neq")]
    Neq,
    #[strum(serialize = "$gt")]
    Gt,
    #[strum(serialize = "$gte")]
    Gte,
    #[strum(serialize = "$lt")]
    Lt,
    #[strum(serialize = "$lte")]
    Lte,
    #[strum(serialize = "$in")]
    In,
    #[strum(serialize = "$nin")]
    Nin,
}

impl FilterOp {
    pub const ALL: [Self; 8] = [
        Self::Eq,
        Self::Neq,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::In,
        Self::Nin,
    ];
}

impl FromStr for FilterOp {
    type Err = Error;

    /// Accepts the wire form, the bare name, and the descriptive aliases
    /// `equals`, `contains` and `not-contains`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().trim_start_matches('$').to_ascii_lowercase().as_str() {
            "eq" | "equals" => Self::Eq,
            "neq" | "not-equals" => Self::Neq,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "in" | "contains" => Self::In,
            "nin" | "not-contains" => Self::Nin,
            _ => {
                return Err(Error::InvalidFilter {
                    reason: format!("unknown operator `{s}`"),
                });
            }
        };
        Ok(op)
    }
}

/// A filter for one request. Exactly one representation is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterExpression {
    /// Caller-supplied filter text, sent as-is.
    Raw(String),
    /// A single `field op value` clause.
    Structured {
        field: String,
        op: FilterOp,
        value: String,
    },
}

impl FilterExpression {
    pub fn raw(filter: impl Into<String>) -> Self {
        Self::Raw(filter.into())
    }

    pub fn structured(field: impl Into<String>, op: FilterOp, value: impl Into<String>) -> Self {
        Self::Structured {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Render the wire form of this filter.
    ///
    /// Raw filters are checked for balanced brackets, braces and quotes
    /// only; their meaning is up to the upstream.
    pub fn build(&self) -> Result<String, Error> {
        match self {
            Self::Raw(text) => {
                check_balanced(text)?;
                Ok(text.clone())
            }
            Self::Structured { field, op, value } => {
                if field.is_empty() {
                    return Err(Error::InvalidFilter {
                        reason: "filter field is empty".into(),
                    });
                }
                let mut clause = Map::new();
                clause.insert(
                    field.clone(),
                    Value::Object(Map::from_iter([(
                        op.as_ref().to_owned(),
                        Value::Array(vec![Value::String(value.clone())]),
                    )])),
                );
                Ok(Value::Array(vec![Value::Object(clause)]).to_string())
            }
        }
    }

    /// Read a single-clause filter back into its structured form.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidFilter {
            reason: reason.to_owned(),
        };
        let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidFilter {
            reason: format!("not valid JSON: {e}"),
        })?;

        let [clause] = value
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| invalid("filter must be a JSON array"))?
        else {
            return Err(invalid("expected exactly one clause"));
        };
        let (field, condition) = single_entry(clause).ok_or_else(|| invalid("clause must map one field"))?;
        let (op, values) = single_entry(condition).ok_or_else(|| invalid("condition must hold one operator"))?;
        let op: FilterOp = op.parse()?;
        let [Value::String(value)] = values
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| invalid("operator values must be an array"))?
        else {
            return Err(invalid("expected exactly one string value"));
        };

        Ok(Self::structured(field, op, value.clone()))
    }
}

fn single_entry(value: &Value) -> Option<(&str, &Value)> {
    let map = value.as_object()?;
    if map.len() != 1 {
        return None;
    }
    map.iter().next().map(|(k, v)| (k.as_str(), v))
}

/// Pick the active filter when a caller may have supplied both forms.
///
/// A raw filter replaces the structured clause entirely; the discarded
/// clause is reported at WARN.
pub fn select(raw: Option<&str>, structured: Option<&FilterExpression>) -> Option<FilterExpression> {
    match (raw, structured) {
        (Some(raw), Some(discarded)) => {
            warn!(
                ?discarded,
                "raw filter overrides the structured filter; structured clause ignored"
            );
            Some(FilterExpression::raw(raw))
        }
        (Some(raw), None) => Some(FilterExpression::raw(raw)),
        (None, structured) => structured.cloned(),
    }
}

fn check_balanced(text: &str) -> Result<(), Error> {
    let mut stack: Vec<char> = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for ch in text.chars() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '{' | '(' => stack.push(ch),
            ']' | '}' | ')' => {
                let expected = match ch {
                    ']' => '[',
                    '}' => '{',
                    _ => '(',
                };
                if stack.pop() != Some(expected) {
                    return Err(Error::InvalidFilter {
                        reason: format!("unbalanced `{ch}` in raw filter"),
                    });
                }
            }
            _ => {}
        }
    }

    if let Some(open) = quote {
        return Err(Error::InvalidFilter {
            reason: format!("unterminated {open} quote in raw filter"),
        });
    }
    if let Some(open) = stack.pop() {
        return Err(Error::InvalidFilter {
            reason: format!("unclosed `{open}` in raw filter"),
        });
    }
    Ok(())
}
