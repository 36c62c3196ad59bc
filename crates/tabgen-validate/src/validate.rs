use std::sync::LazyLock;

use serde_json::Value;
use tabgen_core::Validator;
use tabgen_schema::SchemaNode;

use crate::context::Specification;
use crate::errors::SpecError;
use crate::rules;

static RULES: LazyLock<Vec<Validator<Specification>>> = LazyLock::new(rules::all);

/// Validate `document` against `schema`, then against the full rule set.
///
/// Returns the structural failure, or the first failing rule.
pub fn validate_specification(document: &Value, schema: &SchemaNode) -> Result<(), SpecError> {
    validate_specification_with(&RULES, document, schema)
}

/// [`validate_specification`] with a caller-supplied rule set.
pub fn validate_specification_with(
    validators: &[Validator<Specification>],
    document: &Value,
    schema: &SchemaNode,
) -> Result<(), SpecError> {
    let result = schema
        .validate_structure(document)
        .map_err(SpecError::from)
        .and_then(|()| tabgen_core::run(validators, document, Some(schema)));

    match &result {
        Ok(()) => {
            tracing::info!(
                event = "specification_validated",
                schema = %schema.locator(),
                rules = validators.len()
            );
        }
        Err(err) => {
            tracing::warn!(
                event = "specification_rejected",
                schema = %schema.locator(),
                outcome = ?err.outcome(),
                error = %err
            );
        }
    }
    result
}
