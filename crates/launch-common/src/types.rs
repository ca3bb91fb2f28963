//! Core identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// App name - the label a supervisor knows a managed process by.
///
/// # Example
/// ```
/// use launch_common::AppName;
///
/// let name = AppName::from("betaione_backend");
/// assert_eq!(name.as_str(), "betaione_backend");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
    /// Creates a new AppName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank names (empty or whitespace only) count as empty.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for AppName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_name_serializes_as_plain_string() {
        let name = AppName::from("web");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"web\"");

        let back: AppName = serde_json::from_str("\"web\"").unwrap();
        assert_eq!(back, name);
    }

    #[test]
    fn test_blank_name_is_empty() {
        assert!(AppName::from("   ").is_empty());
        assert!(!AppName::from("api").is_empty());
    }
}
