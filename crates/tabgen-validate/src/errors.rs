use std::fmt;

use tabgen_schema::{SchemaError, Violations};
use thiserror::Error;

/// A semantic rule violated by an otherwise well-formed specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadSpecification {
    /// `{table: "<name>", field: "<name>"}` description of where it failed.
    pub context: Option<String>,
    /// Message naming the violated rule.
    pub message: String,
}

impl fmt::Display for BadSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Errors surfaced by specification validation.
#[derive(Debug, Error)]
pub enum SpecError {
    /// The document disagrees with the JSON Schema.
    #[error("specification does not match its schema:\n{0}")]
    Structural(Violations),
    /// A semantic rule failed.
    #[error("bad specification: {0}")]
    BadSpecification(BadSpecification),
    /// A schema reference could not be fetched or resolved.
    #[error("cannot resolve schema reference '{reference}': {reason}")]
    SchemaResolution { reference: String, reason: String },
    /// A schema, or a subschema a rule needs, is malformed or missing.
    #[error("invalid schema '{locator}': {reason}")]
    SchemaStructure { locator: String, reason: String },
    /// A named schema resource does not exist.
    #[error("schema not found: {locator}")]
    NotFound { locator: String },
}

/// How a caller should treat a failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The input is at fault; reject it.
    Rejected,
    /// The service cannot validate right now; the same input may pass later.
    Unavailable,
}

impl SpecError {
    pub(crate) fn bad_specification(context: Option<String>, message: String) -> Self {
        SpecError::BadSpecification(BadSpecification { context, message })
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            SpecError::Structural(_) | SpecError::BadSpecification(_) => Outcome::Rejected,
            SpecError::SchemaResolution { .. }
            | SpecError::SchemaStructure { .. }
            | SpecError::NotFound { .. } => Outcome::Unavailable,
        }
    }

    /// Only resolution failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SpecError::SchemaResolution { .. })
    }
}

impl From<SchemaError> for SpecError {
    fn from(value: SchemaError) -> Self {
        match value {
            SchemaError::StructuralValidation(violations) => SpecError::Structural(violations),
            SchemaError::Resolution { reference, reason } => {
                SpecError::SchemaResolution { reference, reason }
            }
            SchemaError::NotFound { locator } => SpecError::NotFound { locator },
            SchemaError::Structure { locator, reason } => {
                SpecError::SchemaStructure { locator, reason }
            }
            SchemaError::Unidentified => SpecError::SchemaStructure {
                locator: "<anonymous>".to_string(),
                reason: SchemaError::Unidentified.to_string(),
            },
            SchemaError::Io(err) => SpecError::SchemaStructure {
                locator: "<unknown>".to_string(),
                reason: err.to_string(),
            },
            SchemaError::Json(err) => SpecError::SchemaStructure {
                locator: "<unknown>".to_string(),
                reason: err.to_string(),
            },
        }
    }
}
