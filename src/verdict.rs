// src/verdict.rs
use serde::Serialize;
use serde_json::Value;

use crate::errors::{AtdError, Result};

pub const MAX_SEVERITY: u8 = 5;

/// The part of an analysis report that decides the exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Malware confidence, 0 (clean) to 5 (very high).
    pub severity: u8,
    pub description: String,
}

impl Verdict {
    /// Reads `Summary.Verdict.Severity` and `Summary.Verdict.Description`.
    pub fn from_report(report: &Value) -> Result<Self> {
        let verdict = report
            .get("Summary")
            .and_then(|summary| summary.get("Verdict"))
            .and_then(Value::as_object)
            .ok_or_else(|| AtdError::MalformedReport("no Summary.Verdict object".to_string()))?;

        let severity = verdict
            .get("Severity")
            .ok_or_else(|| AtdError::MalformedReport("no Summary.Verdict.Severity".to_string()))
            .and_then(parse_severity)?;

        let description = match verdict.get("Description") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => {
                return Err(AtdError::MalformedReport(format!(
                    "Description is not text: {}",
                    other
                )));
            }
        };

        Ok(Verdict {
            severity,
            description,
        })
    }
}

fn parse_severity(raw: &Value) -> Result<u8> {
    let value = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match value {
        Some(v) if (0..=MAX_SEVERITY as i64).contains(&v) => Ok(v as u8),
        _ => Err(AtdError::MalformedReport(format!("invalid Severity {}", raw))),
    }
}
