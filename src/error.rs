//! Structured errors for tooling

use serde::{Deserialize, Serialize};
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ElementNotFound,
    MultipleMatches,
    SelectorInvalid,
    PageInvalid,
    TraceInvalid,
    ScriptInvalid,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            suggestions: Vec::new(),
            context: None,
        }
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn element_not_found(selector: &str) -> Self {
        Self::new(
            ErrorCode::ElementNotFound,
            format!("No element matching: {}", selector),
        )
    }

    pub fn multiple_matches(selector: &str, count: usize) -> Self {
        Self::new(
            ErrorCode::MultipleMatches,
            format!("Selector '{}' matched {} elements, expected 1", selector, count),
        )
    }

    pub fn selector_invalid(selector: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::SelectorInvalid,
            format!("Invalid selector '{}': {}", selector, reason),
        )
    }

    pub fn page_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::PageInvalid, reason)
    }

    pub fn trace_invalid(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::TraceInvalid, reason)
    }

    pub fn script_invalid(step: usize, reason: &str) -> Self {
        Self::new(
            ErrorCode::ScriptInvalid,
            format!("Script step {}: {}", step, reason),
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ErrorCode::PageInvalid, e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_code_in_screaming_case() {
        let e = Error::multiple_matches("div", 3);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["code"], "MULTIPLE_MATCHES");
        assert!(json.get("suggestions").is_none());
        assert!(json.get("context").is_none());
    }

    #[test]
    fn display_includes_code() {
        let e = Error::element_not_found("#missing");
        assert_eq!(e.to_string(), "[ElementNotFound] No element matching: #missing");
    }

    #[test]
    fn json_errors_become_page_invalid() {
        let e: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(e.code, ErrorCode::PageInvalid);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["code"], "PAGE_INVALID");
    }
}
