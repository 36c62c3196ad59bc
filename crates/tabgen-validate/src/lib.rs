//! Validation of generation specifications.
//!
//! A specification is first checked against its JSON Schema, then against
//! the semantic rules JSON Schema cannot express: conditional requiredness,
//! foreign key references, primary key cardinality and numeric ordering.

pub mod context;
pub mod errors;
pub mod rules;
pub mod validate;

pub use context::{EACH_FIELD, EACH_TABLE, FieldContext, SpecContext, Specification, TableContext};
pub use errors::{BadSpecification, Outcome, SpecError};
pub use validate::{validate_specification, validate_specification_with};
