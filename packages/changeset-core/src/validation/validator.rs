use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::result::ValidationResult;
use crate::content::Content;

/// Validation still in progress.
pub type PendingValidation = Pin<Box<dyn Future<Output = ValidationResult> + Send + 'static>>;

/// What a validator returns: a verdict now, or one later.
pub enum ValidatorOutput {
    Sync(ValidationResult),
    Pending(PendingValidation),
}

impl ValidatorOutput {
    /// Wraps a future verdict.
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = ValidationResult> + Send + 'static,
    {
        ValidatorOutput::Pending(Box::pin(future))
    }

    /// Returns `true` if the verdict is not available yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, ValidatorOutput::Pending(_))
    }

    /// Waits for the verdict.
    pub async fn resolve(self) -> ValidationResult {
        match self {
            ValidatorOutput::Sync(result) => result,
            ValidatorOutput::Pending(future) => future.await,
        }
    }
}

impl fmt::Debug for ValidatorOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorOutput::Sync(result) => f.debug_tuple("Sync").field(result).finish(),
            ValidatorOutput::Pending(_) => f.write_str("Pending"),
        }
    }
}

impl From<ValidationResult> for ValidatorOutput {
    fn from(result: ValidationResult) -> Self {
        ValidatorOutput::Sync(result)
    }
}

impl From<bool> for ValidatorOutput {
    fn from(valid: bool) -> Self {
        ValidatorOutput::Sync(valid.into())
    }
}

impl From<&str> for ValidatorOutput {
    fn from(message: &str) -> Self {
        ValidatorOutput::Sync(message.into())
    }
}

impl From<String> for ValidatorOutput {
    fn from(message: String) -> Self {
        ValidatorOutput::Sync(message.into())
    }
}

impl From<Vec<String>> for ValidatorOutput {
    fn from(messages: Vec<String>) -> Self {
        ValidatorOutput::Sync(messages.into())
    }
}

impl From<Value> for ValidatorOutput {
    fn from(value: Value) -> Self {
        ValidatorOutput::Sync(value.into())
    }
}

/// Everything a validator gets to see about an attempted write.
#[derive(Clone, Copy)]
pub struct ValidationArgs<'a> {
    /// Dotted path being written
    pub key: &'a str,
    /// Attempted value
    pub new_value: &'a Value,
    /// Current content value at `key` (`null` if unset)
    pub old_value: &'a Value,
    /// Pending changes at the time of the write
    pub changes: &'a Map<String, Value>,
    /// The wrapped content
    pub content: &'a dyn Content,
}

type ValidatorFn = dyn Fn(ValidationArgs<'_>) -> ValidatorOutput + Send + Sync;

/// Shared validator function.
#[derive(Clone)]
pub struct Validator(Arc<ValidatorFn>);

impl Validator {
    pub fn new<F>(validate: F) -> Self
    where
        F: Fn(ValidationArgs<'_>) -> ValidatorOutput + Send + Sync + 'static,
    {
        Self(Arc::new(validate))
    }

    /// Runs the validator.
    pub fn validate(&self, args: ValidationArgs<'_>) -> ValidatorOutput {
        (self.0)(args)
    }

    /// Dispatches each write to the validator registered for its key.
    ///
    /// Keys without a registered validator are accepted.
    pub fn lookup(map: ValidationMap) -> Self {
        Self::new(move |args| match map.get(args.key) {
            Some(validator) => validator.validate(args),
            None => ValidatorOutput::Sync(ValidationResult::Valid),
        })
    }

    /// Runs every validator against the same write and combines the verdicts.
    ///
    /// The combined verdict is pending if any individual one is.
    pub fn all(validators: Vec<Validator>) -> Self {
        Self::new(move |args| {
            let outputs: Vec<ValidatorOutput> =
                validators.iter().map(|validator| validator.validate(args)).collect();

            if outputs.iter().any(ValidatorOutput::is_pending) {
                return ValidatorOutput::pending(async move {
                    let mut results = Vec::with_capacity(outputs.len());
                    for output in outputs {
                        results.push(output.resolve().await);
                    }
                    ValidationResult::combine(results)
                });
            }

            let results = outputs
                .into_iter()
                .filter_map(|output| match output {
                    ValidatorOutput::Sync(result) => Some(result),
                    ValidatorOutput::Pending(_) => None,
                })
                .collect();
            ValidatorOutput::Sync(ValidationResult::combine(results))
        })
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

/// Per-field validators, in declaration order.
///
/// Drives `validate_all`/`validate_one`; wrap it with
/// [`Validator::lookup`] to also use it for every write.
#[derive(Clone, Default)]
pub struct ValidationMap {
    validators: IndexMap<String, Validator>,
}

impl ValidationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator for `key`, replacing any previous one.
    ///
    /// # Returns
    /// The replaced validator, if any.
    pub fn insert(&mut self, key: impl Into<String>, validator: Validator) -> Option<Validator> {
        self.validators.insert(key.into(), validator)
    }

    /// Builder form of [`ValidationMap::insert`].
    pub fn with(mut self, key: impl Into<String>, validator: Validator) -> Self {
        self.insert(key, validator);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Validator> {
        self.validators.get(key)
    }

    /// Declared keys, in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl fmt::Debug for ValidationMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.validators.keys()).finish()
    }
}
