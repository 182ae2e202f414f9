use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(String),
    #[error("field `{field}` has an invalid value, expected {expected}")]
    InvalidField { field: String, expected: &'static str },
    #[error("malformed CPE string `{0}`")]
    MalformedCpe(String),
    #[error("derived {key} `{digits}` does not fit a 64-bit integer")]
    KeyNotNumeric { key: &'static str, digits: String },
}
