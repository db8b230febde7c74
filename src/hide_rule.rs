use crate::protocol::MAX_STRING_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved package value standing for "any isolated process".
pub const ISOLATED_MAGIC: &str = "isolated";

/// App zygotes carry this suffix; the SDK-gated sweep kills them all.
pub const ZYGOTE_SUFFIX: &str = "_zygote";

/// Never killed by the zygote sweep, the system browser component relies on it.
pub const WEBVIEW_ZYGOTE: &str = "webview_zygote";

/// A single `(package, process)` hide rule.
///
/// For normal packages `process` is the full process name. For the
/// [`ISOLATED_MAGIC`] package it is a prefix pattern, since isolated
/// processes get a numeric suffix appended by the system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HideRule {
    pub package: String,
    pub process: String,
}

impl HideRule {
    /// Build a rule, defaulting an empty process to the package name.
    pub fn new(package: impl Into<String>, process: impl Into<String>) -> Self {
        let package = package.into();
        let mut process = process.into();
        if process.is_empty() {
            process = package.clone();
        }
        Self { package, process }
    }

    pub fn is_isolated(&self) -> bool {
        self.package == ISOLATED_MAGIC
    }

    /// Check package and process syntax, and that the list record fits
    /// in one wire string.
    pub fn is_valid(&self) -> bool {
        self.record_len() <= MAX_STRING_LEN && validate(&self.package, &self.process)
    }

    fn record_len(&self) -> usize {
        self.package.len() + 1 + self.process.len()
    }

    /// How already-running processes are matched when this rule is added.
    /// Isolated rules kill every prefixed process, normal rules the first exact one.
    pub fn kill_strategy(&self) -> (NameMatch, bool) {
        if self.is_isolated() {
            (NameMatch::Prefix, true)
        } else {
            (NameMatch::Exact, false)
        }
    }

    /// The `package|process` record used by the list command.
    pub fn to_record(&self) -> String {
        format!("{}|{}", self.package, self.process)
    }

    /// Parse a `package|process` record.
    pub fn from_record(record: &str) -> Option<Self> {
        let (package, process) = record.split_once('|')?;
        Some(Self {
            package: package.to_string(),
            process: process.to_string(),
        })
    }
}

impl fmt::Display for HideRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.process)
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Validate a `(package, process)` pair.
///
/// Isolated rules only constrain the process up to the first `:`, anything
/// after it is accepted. Normal packages need at least one dot.
pub fn validate(package: &str, process: &str) -> bool {
    if package == ISOLATED_MAGIC {
        for c in process.chars() {
            if is_name_char(c) || c == '.' {
                continue;
            }
            return c == ':';
        }
        return true;
    }

    let mut has_dot = false;
    for c in package.chars() {
        if c == '.' {
            has_dot = true;
        } else if !is_name_char(c) {
            return false;
        }
    }

    has_dot
        && process
            .chars()
            .all(|c| is_name_char(c) || c == '.' || c == ':')
}

/// Comparison used when killing processes by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// Process name equals the pattern
    Exact,
    /// Process name starts with the pattern
    Prefix,
    /// Process name ends with the pattern, except `webview_zygote`
    SuffixExceptWebview,
}

impl NameMatch {
    pub fn matches(self, name: &str, pattern: &str) -> bool {
        match self {
            NameMatch::Exact => name == pattern,
            NameMatch::Prefix => name.starts_with(pattern),
            NameMatch::SuffixExceptWebview => name != WEBVIEW_ZYGOTE && name.ends_with(pattern),
        }
    }
}
