//! Per-method response configuration.

use serde::{Deserialize, Serialize};

use super::request::{Headers, RequestRecord};
use crate::db::StoreError;

/// Configured response for one HTTP method of a basket.
/// The wildcard entry (empty method name) is the per-basket default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSpec {
    pub status: u16,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: String,
    /// When set, `body` is a text template expanded against the captured request.
    #[serde(default, rename = "is_template")]
    pub is_template: bool,
    /// When set, `body` is a script evaluated by the sandbox. Wins over `is_template`.
    #[serde(default, rename = "is_script")]
    pub is_script: bool,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
            body: String::new(),
            is_template: false,
            is_script: false,
        }
    }
}

impl ResponseSpec {
    /// Validates the configured status code.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !(100..=599).contains(&self.status) {
            return Err(StoreError::InvalidConfig(format!(
                "response status must be within 100..599, got {}",
                self.status
            )));
        }
        Ok(())
    }

    /// Expands template placeholders in `body` against a captured request.
    ///
    /// Supported placeholders: `{{.Method}}`, `{{.Path}}`, `{{.Query}}`,
    /// `{{.Body}}`, `{{.Date}}`, `{{.ContentLength}}`, and header access as
    /// `{{.Headers.Name}}` (first value) or `{{.Headers.Name.N}}` (indexed).
    /// Unknown placeholders expand to the empty string.
    pub fn expand_template(&self, record: &RequestRecord) -> String {
        let mut out = String::with_capacity(self.body.len());
        let mut rest = self.body.as_str();

        while let Some(open) = rest.find("{{.") {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            match tail.find("}}") {
                Some(close) => {
                    let field = tail[3..close].trim();
                    out.push_str(&expand_field(field, record));
                    rest = &tail[close + 2..];
                }
                None => {
                    // Unterminated placeholder is emitted verbatim.
                    out.push_str(tail);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn expand_field(field: &str, record: &RequestRecord) -> String {
    match field {
        "Method" => record.method.clone(),
        "Path" => record.path.clone(),
        "Query" => record.query.clone(),
        "Body" => record.body.clone(),
        "Date" => record.date.to_string(),
        "ContentLength" => record.content_length.to_string(),
        _ => match field.strip_prefix("Headers.") {
            Some(spec) => {
                let (name, index) = match spec.rsplit_once('.') {
                    Some((name, idx)) => match idx.parse::<usize>() {
                        Ok(i) => (name, i),
                        Err(_) => (spec, 0),
                    },
                    None => (spec, 0),
                };
                record.header_at(name, index).unwrap_or_default().to_string()
            }
            None => String::new(),
        },
    }
}
