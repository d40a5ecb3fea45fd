//! Validation verdicts, error records and validator functions.

mod result;
mod validator;

pub use result::{ErrorInput, ErrorRecord, Validation, ValidationResult};
pub use validator::{PendingValidation, ValidationArgs, ValidationMap, Validator, ValidatorOutput};
