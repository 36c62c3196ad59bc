//! Conditional dependencies: payloads that become required once a sibling
//! key takes a particular value, and the narrower schemas those payloads
//! must satisfy when present.

use serde_json::Value;
use tabgen_core::Validator;

use crate::context::{FieldContext, SpecContext, Specification, field_rule};
use crate::errors::SpecError;

pub fn validators() -> Vec<Validator<Specification>> {
    vec![
        field_rule("foreign_key_params_required", foreign_key_params_required),
        field_rule(
            "foreign_key_params_match_schema",
            foreign_key_params_match_schema,
        ),
        field_rule("number_sequence_required", number_sequence_required),
        field_rule(
            "number_sequence_matches_schema",
            number_sequence_matches_schema,
        ),
        field_rule("random_number_required", random_number_required),
        field_rule("random_number_matches_schema", random_number_matches_schema),
        field_rule(
            "looping_sequence_params_required",
            looping_sequence_params_required,
        ),
        field_rule(
            "looping_sequence_params_match_schema",
            looping_sequence_params_match_schema,
        ),
    ]
}

// keySettings.foreignKey == true  =>  keySettings.foreignKeyParams required
fn foreign_key_params_required(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };

    if field.is_foreign_key() && field.foreign_key_params().is_none() {
        return Err(missing(field, "foreignKeyParams", "foreignKey being true"));
    }
    Ok(())
}

fn foreign_key_params_match_schema(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };
    match_subschema(field, field.foreign_key_params(), "foreignKeyParams", &[])
}

// dataType.dataType == "numberSequence"  =>  dataType.numberSequence required
fn number_sequence_required(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };

    if field.data_type() == Some("numberSequence")
        && field.data_type_payload("numberSequence").is_none()
    {
        return Err(missing(
            field,
            "numberSequence",
            "dataType being 'numberSequence'",
        ));
    }
    Ok(())
}

fn number_sequence_matches_schema(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };
    match_subschema(
        field,
        field.data_type_payload("numberSequence"),
        "numberSequence",
        &["loopingSequenceParams"],
    )
}

// dataType.dataType == "randomNumber"  =>  dataType.randomNumber required
fn random_number_required(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };

    if field.data_type() == Some("randomNumber")
        && field.data_type_payload("randomNumber").is_none()
    {
        return Err(missing(field, "randomNumber", "dataType being 'randomNumber'"));
    }
    Ok(())
}

fn random_number_matches_schema(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };
    match_subschema(
        field,
        field.data_type_payload("randomNumber"),
        "randomNumber",
        &[],
    )
}

// numberSequence.sequenceType == "looping"  =>  loopingSequenceParams required
fn looping_sequence_params_required(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };
    if field.data_type() != Some("numberSequence") {
        return Ok(());
    }
    let Some(sequence) = field.data_type_payload("numberSequence") else {
        return Ok(());
    };

    let looping = sequence.get("sequenceType").and_then(Value::as_str) == Some("looping");
    if looping && sequence.get("loopingSequenceParams").is_none() {
        return Err(missing(
            field,
            "loopingSequenceParams",
            "sequenceType being 'looping'",
        ));
    }
    Ok(())
}

fn looping_sequence_params_match_schema(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };
    let params = field
        .data_type_payload("numberSequence")
        .and_then(|sequence| sequence.get("loopingSequenceParams"));
    match_subschema(field, params, "loopingSequenceParams", &[])
}

fn missing(field: &FieldContext<'_>, key: &str, condition: &str) -> SpecError {
    let context = field.describe();
    SpecError::bad_specification(
        Some(context.clone()),
        format!("{key} missing from {context}, despite {condition}"),
    )
}

/// Validate a present payload against `#/definitions/<subschema>` of the
/// specification's schema. Skipped when either is absent.
fn match_subschema(
    field: &FieldContext<'_>,
    payload: Option<&Value>,
    subschema: &str,
    dependencies: &[&str],
) -> Result<(), SpecError> {
    let (Some(payload), Some(schema)) = (payload, field.schema) else {
        return Ok(());
    };

    schema
        .subschema(subschema, dependencies)?
        .validate_structure(payload)?;
    Ok(())
}
