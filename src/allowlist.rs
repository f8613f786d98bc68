//! Allow-list evaluator.
//!
//! The original implementation this proxy is modeled on lets operators
//! supply a free-form expression that is evaluated against the decoded
//! message. That is unsafe to port literally into a memory-safe host, so
//! `--remote-debugging-allow-expression` here takes a small JSON matcher
//! document instead of an expression string. Method-equality predicates
//! (`--remote-debugging-allow`) are unchanged.

use serde::Deserialize;
use serde_json::Value;

use crate::error::ProxyError;

/// One predicate in the allow-list. A message is forwarded iff at least
/// one predicate in the list matches; evaluation short-circuits on the
/// first match.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Holds iff `message.method == name`.
    MethodEquals(String),
    /// Holds iff the matcher tree evaluates true against the message.
    Matcher(Matcher),
}

/// Declarative matcher DSL: field-equality, field-presence, and their
/// boolean combinations. Parsed once, at argument-parsing time, from a
/// JSON document such as:
///
/// ```json
/// {"any": [
///   {"equals": {"path": "method", "value": "Page.enable"}},
///   {"all": [
///     {"present": {"path": "params.url"}},
///     {"equals": {"path": "method", "value": "Page.navigate"}}
///   ]}
/// ]}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Matcher {
    Equals { path: String, value: Value },
    Present { path: String },
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
}

impl Matcher {
    pub fn evaluate(&self, message: &Value) -> bool {
        match self {
            Matcher::Equals { path, value } => {
                resolve_path(message, path).map(|v| v == value).unwrap_or(false)
            }
            Matcher::Present { path } => resolve_path(message, path).is_some(),
            Matcher::All(children) => children.iter().all(|c| c.evaluate(message)),
            Matcher::Any(children) => children.iter().any(|c| c.evaluate(message)),
        }
    }
}

/// Resolve a dotted path (`"params.url"`) into a JSON value, if present.
fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// An ordered list of predicates supplied via the CLI, consulted once per
/// inbound client message.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    predicates: Vec<Predicate>,
}

impl AllowList {
    pub fn new() -> Self {
        Self { predicates: Vec::new() }
    }

    pub fn push_method(&mut self, method: impl Into<String>) {
        self.predicates.push(Predicate::MethodEquals(method.into()));
    }

    pub fn push_matcher_json(&mut self, raw: &str) -> Result<(), ProxyError> {
        let matcher: Matcher = serde_json::from_str(raw).map_err(|e| {
            ProxyError::Config(format!("invalid allow-expression matcher JSON: {e}"))
        })?;
        self.predicates.push(Predicate::Matcher(matcher));
        Ok(())
    }

    /// True iff at least one predicate matches `message`.
    pub fn allows(&self, message: &Value) -> bool {
        self.predicates.iter().any(|p| match p {
            Predicate::MethodEquals(expected) => {
                message.get("method").and_then(Value::as_str) == Some(expected.as_str())
            }
            Predicate::Matcher(matcher) => matcher.evaluate(message),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_equality_matches_only_configured_method() {
        let mut list = AllowList::new();
        list.push_method("Page.reload");

        assert!(list.allows(&json!({"id": 1, "method": "Page.reload"})));
        assert!(!list.allows(&json!({"id": 2, "method": "Page.enable"})));
    }

    #[test]
    fn empty_allow_list_denies_everything() {
        let list = AllowList::new();
        assert!(!list.allows(&json!({"id": 1, "method": "Page.enable"})));
        assert!(list.is_empty());
    }

    #[test]
    fn matcher_field_presence_and_equality() {
        let mut list = AllowList::new();
        list.push_matcher_json(
            r#"{"all": [
                {"present": {"path": "params.url"}},
                {"equals": {"path": "method", "value": "Page.navigate"}}
            ]}"#,
        )
        .unwrap();

        assert!(list.allows(&json!({
            "id": 3, "method": "Page.navigate", "params": {"url": "https://example.com"}
        })));
        assert!(!list.allows(&json!({"id": 4, "method": "Page.navigate"})));
    }

    #[test]
    fn matcher_any_short_circuits_on_first_match() {
        let mut list = AllowList::new();
        list.push_matcher_json(
            r#"{"any": [
                {"equals": {"path": "method", "value": "A"}},
                {"equals": {"path": "method", "value": "B"}}
            ]}"#,
        )
        .unwrap();

        assert!(list.allows(&json!({"method": "B"})));
        assert!(!list.allows(&json!({"method": "C"})));
    }

    #[test]
    fn invalid_matcher_json_is_rejected_as_config_error() {
        let mut list = AllowList::new();
        let err = list.push_matcher_json("not json").unwrap_err();
        assert!(matches!(err, ProxyError::Config(_)));
    }
}
