//! Scope paths addressing independently invalidatable parts of a build.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between segments of a scope path.
const SEPARATOR: char = ':';

/// An absolute, colon-separated path to a scope such as a project (`:app:core`).
///
/// The root scope is written `:`. Ordering is lexicographic on the textual form,
/// which keeps sets of scopes deterministic when rendered or serialized.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopePath(String);

/// Error returned when a string is not a valid scope path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid scope path '{path}': {reason}")]
pub struct ParseScopePathError {
    /// The rejected input.
    pub path: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl ScopePath {
    /// Returns the root scope `:`.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Returns `true` if this is the root scope.
    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Returns the child scope with the given segment name.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or contains `:`.
    pub fn child(&self, name: &str) -> Self {
        assert!(
            !name.is_empty() && !name.contains(SEPARATOR),
            "invalid scope segment '{name}'"
        );
        if self.is_root() {
            Self(format!("{SEPARATOR}{name}"))
        } else {
            Self(format!("{}{SEPARATOR}{name}", self.0))
        }
    }

    /// Returns the enclosing scope, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let idx = self.0.rfind(SEPARATOR)?;
        if idx == 0 {
            Some(Self::root())
        } else {
            Some(Self(self.0[..idx].to_string()))
        }
    }

    /// Returns the last segment, or `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit(SEPARATOR).next()
        }
    }

    /// Returns the path segments from outermost to innermost.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Returns the textual form of this path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ScopePath {
    type Err = ParseScopePathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason| ParseScopePathError {
            path: s.to_string(),
            reason,
        };
        if !s.starts_with(SEPARATOR) {
            return Err(err("must start with ':'"));
        }
        if s.len() == 1 {
            return Ok(Self::root());
        }
        if s[1..].split(SEPARATOR).any(str::is_empty) {
            return Err(err("empty segment"));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ScopePath {
    type Error = ParseScopePathError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ScopePath> for String {
    fn from(path: ScopePath) -> Self {
        path.0
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopePath({})", self.0)
    }
}
