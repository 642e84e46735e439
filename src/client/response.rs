//! Response envelope returned by the executor.
//!
//! # Design Decisions
//! - Body parsing never fails: malformed JSON degrades to raw text
//! - An empty body is distinct from an empty JSON document

use std::fmt;

use serde_json::Value;

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No content.
    Empty,
    /// Well-formed JSON.
    Json(Value),
    /// Anything that did not parse as JSON, verbatim.
    Text(String),
}

impl ResponseBody {
    /// Parse raw response text.
    pub fn parse(raw: String) -> Self {
        if raw.trim().is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(raw),
        }
    }

    /// The JSON value, if the body parsed.
    pub fn json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// The raw text, if the body did not parse.
    pub fn text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    /// Render as a JSON value (text becomes a JSON string, empty becomes null).
    pub fn to_value(&self) -> Value {
        match self {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value.clone(),
            ResponseBody::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Empty => write!(f, "<empty>"),
            ResponseBody::Json(value) => write!(f, "{}", value),
            ResponseBody::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Outcome of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Standard reason phrase for `status` (e.g. "Created"), not the text
    /// the server put on its status line. Empty for unregistered codes.
    pub status_message: String,
    /// Parsed body.
    pub body: ResponseBody,
}

impl ResponseEnvelope {
    pub fn new(status: u16, status_message: impl Into<String>, body: ResponseBody) -> Self {
        Self {
            status,
            status_message: status_message.into(),
            body,
        }
    }

    /// True for statuses in [200, 299].
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json() {
        let body = ResponseBody::parse(r#"{"Users": []}"#.to_string());
        assert_eq!(body.json(), Some(&json!({"Users": []})));
    }

    #[test]
    fn test_malformed_json_degrades_to_text() {
        let raw = "<html>Service Unavailable</html>".to_string();
        let body = ResponseBody::parse(raw.clone());
        assert_eq!(body.text(), Some(raw.as_str()));
        assert_eq!(body.to_string(), raw);

        let truncated = ResponseBody::parse(r#"{"Users": ["#.to_string());
        assert_eq!(truncated, ResponseBody::Text(r#"{"Users": ["#.to_string()));
    }

    #[test]
    fn test_empty_body() {
        assert!(ResponseBody::parse(String::new()).is_empty());
        assert!(ResponseBody::parse("  \r\n".to_string()).is_empty());
        assert_eq!(ResponseBody::Empty.to_value(), Value::Null);
    }

    #[test]
    fn test_success_range() {
        assert!(ResponseEnvelope::new(200, "OK", ResponseBody::Empty).is_success());
        assert!(ResponseEnvelope::new(204, "No Content", ResponseBody::Empty).is_success());
        assert!(!ResponseEnvelope::new(199, "", ResponseBody::Empty).is_success());
        assert!(!ResponseEnvelope::new(300, "Multiple Choices", ResponseBody::Empty).is_success());
    }
}
