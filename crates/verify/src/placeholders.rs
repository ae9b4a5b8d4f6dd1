//! Saved Data and Placeholder Substitution
//!
//! Values captured from responses are stored under user-chosen keys and
//! referenced by later requests as `{saved_<key>}`. One `SavedData` lives for a
//! whole suite run, so ids created in one scenario are visible in the next.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Run-scoped store of captured response values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SavedData {
    values: BTreeMap<String, Value>,
}

impl SavedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `{saved_<key>}` for known keys. Unknown placeholders stay
    /// as literal text.
    pub fn substitute(&self, text: &str) -> String {
        if !text.contains("{saved_") {
            return text.to_string();
        }
        let mut out = text.to_string();
        for (key, value) in &self.values {
            let placeholder = format!("{{saved_{}}}", key);
            if out.contains(&placeholder) {
                out = out.replace(&placeholder, &render(value));
            }
        }
        out
    }

    /// Substitute placeholders in every string inside a JSON structure.
    pub fn substitute_value(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.substitute(s)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.substitute_value(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.substitute_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Strings substitute raw; everything else as JSON text.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
