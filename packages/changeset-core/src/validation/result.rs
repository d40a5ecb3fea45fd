use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of validating one attempted write.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    /// The value is accepted
    Valid,
    /// The value is rejected with the given validation
    Invalid(Validation),
}

impl ValidationResult {
    /// Returns `true` for [`ValidationResult::Valid`].
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Folds several results: valid only if all are valid.
    ///
    /// A single failure keeps its validation; several failures are
    /// collected into one message list.
    pub fn combine(results: Vec<ValidationResult>) -> ValidationResult {
        let mut failures: Vec<Validation> = results
            .into_iter()
            .filter_map(|result| match result {
                ValidationResult::Valid => None,
                ValidationResult::Invalid(validation) => Some(validation),
            })
            .collect();

        match failures.len() {
            0 => ValidationResult::Valid,
            1 => ValidationResult::Invalid(failures.remove(0)),
            _ => ValidationResult::Invalid(Validation::Messages(
                failures.into_iter().flat_map(Validation::into_messages).collect(),
            )),
        }
    }
}

impl From<bool> for ValidationResult {
    fn from(valid: bool) -> Self {
        if valid {
            ValidationResult::Valid
        } else {
            ValidationResult::Invalid(Validation::Other(Value::Bool(false)))
        }
    }
}

impl From<&str> for ValidationResult {
    fn from(message: &str) -> Self {
        ValidationResult::Invalid(Validation::Message(message.to_string()))
    }
}

impl From<String> for ValidationResult {
    fn from(message: String) -> Self {
        ValidationResult::Invalid(Validation::Message(message))
    }
}

impl From<Vec<String>> for ValidationResult {
    fn from(messages: Vec<String>) -> Self {
        ValidationResult::Invalid(Validation::Messages(messages))
    }
}

impl From<Validation> for ValidationResult {
    fn from(validation: Validation) -> Self {
        ValidationResult::Invalid(validation)
    }
}

/// Interprets a loosely typed validator return value.
///
/// `true`, `[true]` and `null` accept; a string or a list of strings
/// rejects with those messages; anything else rejects with the value
/// itself.
impl From<Value> for ValidationResult {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::Bool(true) => ValidationResult::Valid,
            Value::Array(ref items) if items.len() == 1 && items[0] == Value::Bool(true) => {
                ValidationResult::Valid
            }
            Value::String(message) => ValidationResult::Invalid(Validation::Message(message)),
            Value::Array(items) if items.iter().all(Value::is_string) => {
                ValidationResult::Invalid(Validation::Messages(
                    items
                        .into_iter()
                        .filter_map(|item| match item {
                            Value::String(message) => Some(message),
                            _ => None,
                        })
                        .collect(),
                ))
            }
            other => ValidationResult::Invalid(Validation::Other(other)),
        }
    }
}

/// Why a value was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Validation {
    /// A single message
    Message(String),
    /// Ordered messages
    Messages(Vec<String>),
    /// Any other rejection value, e.g. a bare `false`
    Other(Value),
}

impl Validation {
    /// The validation as a message list, promoting a single message.
    pub fn into_messages(self) -> Vec<String> {
        match self {
            Validation::Message(message) => vec![message],
            Validation::Messages(messages) => messages,
            Validation::Other(value) => vec![value.to_string()],
        }
    }
}

impl From<&str> for Validation {
    fn from(message: &str) -> Self {
        Validation::Message(message.to_string())
    }
}

impl From<String> for Validation {
    fn from(message: String) -> Self {
        Validation::Message(message)
    }
}

impl From<Vec<String>> for Validation {
    fn from(messages: Vec<String>) -> Self {
        Validation::Messages(messages)
    }
}

/// A rejected pending value and the reason it was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub value: Value,
    pub validation: Validation,
}

impl ErrorRecord {
    pub fn new(value: Value, validation: Validation) -> Self {
        Self { value, validation }
    }
}

/// Argument accepted by `Changeset::add_error`.
///
/// A full record is installed as given; a bare validation is paired with
/// the field's current value.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorInput {
    Record(ErrorRecord),
    Validation(Validation),
}

impl From<ErrorRecord> for ErrorInput {
    fn from(record: ErrorRecord) -> Self {
        ErrorInput::Record(record)
    }
}

impl From<Validation> for ErrorInput {
    fn from(validation: Validation) -> Self {
        ErrorInput::Validation(validation)
    }
}

impl From<&str> for ErrorInput {
    fn from(message: &str) -> Self {
        ErrorInput::Validation(message.into())
    }
}

impl From<String> for ErrorInput {
    fn from(message: String) -> Self {
        ErrorInput::Validation(message.into())
    }
}

impl From<Vec<String>> for ErrorInput {
    fn from(messages: Vec<String>) -> Self {
        ErrorInput::Validation(messages.into())
    }
}
