//! Parsing and structural validation of raw model output
//!
//! Models wrap their JSON in prose, code fences or envelope objects. The
//! validator locates the array with an ordered fallback, then checks every
//! element before anything reaches the caller.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::request::{ContentItem, OfferType};
use crate::error::{Result, ServiceError};
use crate::util::truncate_string;

/// CTA used when the model leaves one out
pub const DEFAULT_CTA: &str = "Learn More";

/// Object keys a model may wrap the array in
pub const ENVELOPE_KEYS: [&str; 3] = ["variations", "texts", "results"];

static FENCED_JSON: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)```json\s*(.*?)\s*```").ok());

/// Where the JSON text was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Inside a ```json fence
    Fenced,
    /// A bracketed array of objects embedded in other text
    EmbeddedArray,
    /// The whole trimmed answer
    Whole,
}

/// Turns raw model text into content items
#[derive(Debug, Clone)]
pub struct ResponseValidator {
    keep_headline: bool,
    default_cta: String,
}

impl ResponseValidator {
    /// Validator for items of `category`
    pub fn for_category(category: OfferType) -> Self {
        Self {
            keep_headline: category.uses_headline(),
            default_cta: DEFAULT_CTA.to_string(),
        }
    }

    /// Replace the fallback CTA
    pub fn with_default_cta(mut self, cta: impl Into<String>) -> Self {
        self.default_cta = cta.into();
        self
    }

    /// Parse `raw` into at most `expected` items
    ///
    /// Fewer items than expected is not an error.
    pub fn parse(&self, raw: &str, expected: usize) -> Result<Vec<ContentItem>> {
        debug!(raw_prefix = %truncate_string(raw, 500), "Parsing model output");

        let (candidate, extraction) = extract_json(raw);
        debug!(?extraction, "Located JSON candidate");

        let value: Value = serde_json::from_str(candidate).map_err(|e| {
            ServiceError::parsing(format!("Failed to parse model output as JSON: {}", e), raw)
        })?;

        let elements = match unwrap_envelope(value) {
            Value::Array(elements) => elements,
            other => {
                return Err(ServiceError::parsing(
                    format!("Expected list of variations, got {}", kind_of(&other)),
                    raw,
                ))
            }
        };

        if elements.is_empty() {
            return Err(ServiceError::parsing("Received empty list of variations", raw));
        }

        let mut items = elements
            .iter()
            .enumerate()
            .map(|(index, element)| self.item(index, element, raw))
            .collect::<Result<Vec<_>>>()?;

        if items.len() > expected {
            debug!(received = items.len(), expected, "Dropping surplus variations");
            items.truncate(expected);
        } else if items.len() < expected {
            warn!(received = items.len(), expected, "Model returned fewer variations than requested");
        }

        Ok(items)
    }

    fn item(&self, index: usize, element: &Value, raw: &str) -> Result<ContentItem> {
        let fields = element.as_object().ok_or_else(|| {
            ServiceError::parsing(
                format!("Variation {} is not an object: {}", index, kind_of(element)),
                raw,
            )
        })?;

        let body = match fields.get("text").or_else(|| fields.get("body")) {
            Some(Value::String(text)) if !text.trim().is_empty() => text.trim().to_string(),
            Some(Value::String(_)) => {
                return Err(ServiceError::parsing(
                    format!("Variation {} has empty 'text' field", index),
                    raw,
                ))
            }
            Some(other) => {
                return Err(ServiceError::parsing(
                    format!("Variation {} 'text' must be a string, got {}", index, kind_of(other)),
                    raw,
                ))
            }
            None => {
                return Err(ServiceError::parsing(
                    format!("Variation {} missing 'text' field", index),
                    raw,
                ))
            }
        };

        let cta = match non_empty(fields, "cta") {
            Some(cta) => cta,
            None => {
                warn!(index, "Variation missing 'cta' field, using default");
                self.default_cta.clone()
            }
        };

        let headline = if self.keep_headline {
            non_empty(fields, "headline")
        } else {
            None
        };

        Ok(ContentItem { headline, body, cta })
    }
}

/// Locate the JSON text inside a model answer
pub fn extract_json(raw: &str) -> (&str, Extraction) {
    if let Some(inner) = FENCED_JSON
        .as_ref()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
    {
        return (inner.as_str(), Extraction::Fenced);
    }

    if let Some(span) = embedded_array(raw) {
        return (span, Extraction::EmbeddedArray);
    }

    (raw.trim(), Extraction::Whole)
}

/// First `[` whose next non-space char is `{`, up to its matching `]`
fn embedded_array(raw: &str) -> Option<&str> {
    for (start, _) in raw.match_indices('[') {
        let opens_object = raw[start + 1..].trim_start().starts_with('{');
        if !opens_object {
            continue;
        }
        if let Some(end) = matching_bracket(&raw[start..]) {
            return Some(&raw[start..start + end + 1]);
        }
    }
    None
}

/// Byte offset of the bracket closing the one at offset 0
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut fields) => {
            for key in ENVELOPE_KEYS {
                if let Some(inner) = fields.remove(key) {
                    return inner;
                }
            }
            Value::Object(fields)
        }
        other => other,
    }
}

fn non_empty(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
