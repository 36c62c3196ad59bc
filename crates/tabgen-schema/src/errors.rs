use std::fmt;

use thiserror::Error;

/// Errors raised while loading, composing, or applying schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// No schema resource exists for the locator.
    #[error("schema not found: {locator}")]
    NotFound { locator: String },
    /// The schema document, or a requested subschema, is malformed or missing.
    #[error("invalid schema '{locator}': {reason}")]
    Structure { locator: String, reason: String },
    /// The instance does not satisfy the schema.
    #[error("instance does not match schema:\n{0}")]
    StructuralValidation(Violations),
    /// A `$ref` could not be resolved.
    #[error("cannot resolve schema reference '{reference}': {reason}")]
    Resolution { reference: String, reason: String },
    /// The schema has no locator, so no `$id` was synthesized for it.
    #[error("schema has no locator; \"$id\" is not set")]
    Unidentified,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid schema json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for schema results.
pub type Result<T> = std::result::Result<T, SchemaError>;

/// A single structural violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending value in the instance.
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that rejected it.
    pub schema_path: String,
    /// Human-readable description of the expected constraint.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Every violation reported for one instance, in validator order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, violation) in self.violations.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{violation}")?;
        }
        Ok(())
    }
}
