use crate::NormalizeError;
use serde_json::{Map, Value};

/// Typed accessors over one JSON object. Field names in errors carry the
/// object's path so `location.latitude` is reported as such.
pub(crate) struct Fields<'a> {
    obj: &'a Map<String, Value>,
    path: &'a str,
}

impl<'a> Fields<'a> {
    pub fn new(value: &'a Value, path: &'a str) -> Result<Self, NormalizeError> {
        match value.as_object() {
            Some(obj) => Ok(Fields { obj, path }),
            None if path.is_empty() => Err(NormalizeError::NotAnObject),
            None => Err(NormalizeError::InvalidField { field: path.to_string(), expected: "an object" }),
        }
    }

    pub fn name(&self, field: &str) -> String {
        if self.path.is_empty() { field.to_string() } else { format!("{}.{}", self.path, field) }
    }

    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.obj.get(field)
    }

    pub fn required(&self, field: &str) -> Result<&'a Value, NormalizeError> {
        self.obj.get(field).ok_or_else(|| NormalizeError::MissingField(self.name(field)))
    }

    pub fn required_str(&self, field: &str) -> Result<&'a str, NormalizeError> {
        self.required(field)?.as_str().ok_or_else(|| self.invalid(field, "a string"))
    }

    pub fn required_number(&self, field: &str) -> Result<&'a serde_json::Number, NormalizeError> {
        match self.required(field)? {
            Value::Number(n) => Ok(n),
            _ => Err(self.invalid(field, "a number")),
        }
    }

    /// Key must be present; a JSON null maps to `None`.
    pub fn nullable_str(&self, field: &str) -> Result<Option<String>, NormalizeError> {
        match self.required(field)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            _ => Err(self.invalid(field, "a string or null")),
        }
    }

    /// Key may be absent or null.
    pub fn optional_str(&self, field: &str) -> Result<Option<String>, NormalizeError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.invalid(field, "a string or null")),
        }
    }

    /// Like `optional_str`, but numbers are rendered as text (`asn` shows up both ways).
    pub fn optional_text(&self, field: &str) -> Result<Option<String>, NormalizeError> {
        match self.obj.get(field) {
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            _ => self.optional_str(field),
        }
    }

    pub fn optional_f64(&self, field: &str) -> Result<Option<f64>, NormalizeError> {
        match self.obj.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or_else(|| self.invalid(field, "a number")),
            Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| self.invalid(field, "a number")),
            Some(_) => Err(self.invalid(field, "a number or null")),
        }
    }

    pub fn invalid(&self, field: &str, expected: &'static str) -> NormalizeError {
        NormalizeError::InvalidField { field: self.name(field), expected }
    }
}
