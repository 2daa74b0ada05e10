//! Core domain types for dbbuilder.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{DbBuilderError, Result};
use crate::urls::strip_base_url;

// ---------------------------------------------------------------------------
// SearchResultItem
// ---------------------------------------------------------------------------

/// One normalized result from the search capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    /// Result URL; the natural dedup key.
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// CandidateEntity
// ---------------------------------------------------------------------------

/// A company accepted by the judgement stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntity {
    pub name: String,
    /// Always a base URL (scheme and host only).
    pub url: String,
}

impl CandidateEntity {
    /// Build an entity, reducing `link` to its base URL.
    pub fn new(name: impl Into<String>, link: &str) -> Self {
        Self {
            name: name.into(),
            url: strip_base_url(link),
        }
    }
}

// ---------------------------------------------------------------------------
// TargetKey
// ---------------------------------------------------------------------------

/// Two-digit groups joined by `-`, optionally repeated with spaces, then the label.
static TARGET_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}(?:-\d{2})*(?: \d{2}(?:-\d{2})*)*) (.+)$").expect("valid target key regex")
});

/// A seed identifier: a classification code and its label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetKey {
    pub code: String,
    pub label: String,
}

impl TargetKey {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }

    /// Recover `(code, label)` from the `"<code> <label>"` projection.
    pub fn parse(projection: &str) -> Result<Self> {
        let trimmed = projection.trim();
        let caps = TARGET_KEY_RE.captures(trimmed).ok_or_else(|| {
            DbBuilderError::parse(format!("not a '<code> <label>' target: {trimmed:?}"))
        })?;

        Ok(Self {
            code: caps[1].to_string(),
            label: caps[2].trim().to_string(),
        })
    }
}

impl fmt::Display for TargetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.label)
    }
}

impl FromStr for TargetKey {
    type Err = DbBuilderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// ParameterRecord
// ---------------------------------------------------------------------------

/// A named parameter and exactly N generated values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRecord {
    name: String,
    values: Vec<String>,
}

impl ParameterRecord {
    /// Build a record, rejecting any `values` whose length is not `expected`.
    pub fn new(name: impl Into<String>, values: Vec<String>, expected: usize) -> Result<Self> {
        if values.len() != expected {
            return Err(DbBuilderError::QuantityMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            values,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.name, self.values)
    }
}
