//! Cross-record rules: foreign key targets, primary key cardinality and
//! range ordering.

use std::cmp::Ordering;

use serde_json::{Number, Value};
use tabgen_core::Validator;

use crate::context::{SpecContext, Specification, field_rule, fields_of, table_rule, tables_of};
use crate::errors::SpecError;

pub fn validators() -> Vec<Validator<Specification>> {
    vec![
        field_rule("foreign_key_reference_exists", foreign_key_reference_exists),
        table_rule("one_primary_key_per_table", one_primary_key_per_table),
        field_rule("random_number_ordered", random_number_ordered),
    ]
}

fn foreign_key_reference_exists(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };
    if !field.is_foreign_key() {
        return Ok(());
    }
    // Missing params are reported by foreign_key_params_required.
    let Some(params) = field.foreign_key_params() else {
        return Ok(());
    };

    let target_table = params.get("table").and_then(Value::as_str).unwrap_or("");
    let target_field = params.get("field").and_then(Value::as_str).unwrap_or("");
    let described = field.describe();

    let table = tables_of(field.document)
        .find(|table| table.get("name").and_then(Value::as_str) == Some(target_table))
        .ok_or_else(|| {
            SpecError::bad_specification(
                Some(described.clone()),
                format!(
                    "table '{target_table}' referenced by foreign key in {described} does not exist"
                ),
            )
        })?;

    let found = fields_of(table)
        .any(|candidate| candidate.get("name").and_then(Value::as_str) == Some(target_field));
    if !found {
        return Err(SpecError::bad_specification(
            Some(described.clone()),
            format!("field '{target_field}' referenced by foreign key in {described} does not exist"),
        ));
    }
    Ok(())
}

fn one_primary_key_per_table(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(table) = context.table() else {
        return Ok(());
    };

    let mut primary_keys = 0;
    for field in table.fields() {
        let is_primary = field
            .pointer("/settings/keySettings/primaryKey")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if is_primary {
            primary_keys += 1;
            if primary_keys > 1 {
                break;
            }
        }
    }

    let name = table.name();
    let message = match primary_keys {
        0 => format!("no primary key defined for table '{name}'"),
        1 => return Ok(()),
        _ => format!("multiple primary keys defined for table '{name}'"),
    };
    Err(SpecError::bad_specification(Some(table.describe()), message))
}

fn random_number_ordered(context: &SpecContext<'_>) -> Result<(), SpecError> {
    let Some(field) = context.field() else {
        return Ok(());
    };
    if field.data_type() != Some("randomNumber") {
        return Ok(());
    }
    let Some(range) = field.data_type_payload("randomNumber") else {
        return Ok(());
    };

    let bound = |key: &str| range.get(key).and_then(Value::as_number);
    let (Some(start), Some(end)) = (bound("start"), bound("end")) else {
        return Ok(());
    };

    if compare_numbers(start, end) == Some(Ordering::Greater) {
        let described = field.describe();
        return Err(SpecError::bad_specification(
            Some(described.clone()),
            format!(
                "randomNumber.start ({start}) must not be greater than randomNumber.end ({end}) in {described}"
            ),
        ));
    }
    Ok(())
}

/// Exact for integers of any JSON-representable size; floats compare as f64.
fn compare_numbers(left: &Number, right: &Number) -> Option<Ordering> {
    let integer = |number: &Number| {
        number
            .as_i64()
            .map(i128::from)
            .or_else(|| number.as_u64().map(i128::from))
    };
    match (integer(left), integer(right)) {
        (Some(left), Some(right)) => Some(left.cmp(&right)),
        _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::context::{FieldContext, TableContext};

    fn field_context<'a>(document: &'a Value, table: usize, field: usize) -> SpecContext<'a> {
        let table = &document["tables"][table];
        SpecContext::Field(FieldContext {
            document,
            schema: None,
            table,
            field: &table["fields"][field],
        })
    }

    fn rejection(result: Result<(), SpecError>) -> String {
        match result {
            Err(SpecError::BadSpecification(bad)) => bad.message,
            other => panic!("expected bad specification, got {other:?}"),
        }
    }

    #[test]
    fn primary_key_count_must_be_exactly_one() {
        let document = json!({"tables": [{
            "name": "Users",
            "fields": [
                {"name": "a", "settings": {"keySettings": {"primaryKey": true, "foreignKey": false}}},
                {"name": "b", "settings": {"keySettings": {"primaryKey": true, "foreignKey": false}}}
            ]
        }, {
            "name": "Empty",
            "fields": []
        }]});

        let users = SpecContext::Table(TableContext {
            document: &document,
            schema: None,
            table: &document["tables"][0],
        });
        assert_eq!(
            rejection(one_primary_key_per_table(&users)),
            "multiple primary keys defined for table 'Users'"
        );

        let empty = SpecContext::Table(TableContext {
            document: &document,
            schema: None,
            table: &document["tables"][1],
        });
        assert_eq!(
            rejection(one_primary_key_per_table(&empty)),
            "no primary key defined for table 'Empty'"
        );
    }

    #[test]
    fn reversed_random_range_is_rejected() {
        let document = json!({"tables": [{
            "name": "Orders",
            "fields": [{
                "name": "amount",
                "settings": {"dataType": {
                    "dataType": "randomNumber",
                    "randomNumber": {"start": 10, "end": 1}
                }}
            }, {
                "name": "equal",
                "settings": {"dataType": {
                    "dataType": "randomNumber",
                    "randomNumber": {"start": 3, "end": 3}
                }}
            }]
        }]});

        let message = rejection(random_number_ordered(&field_context(&document, 0, 0)));
        assert!(message.contains("{table: \"Orders\", field: \"amount\"}"), "{message}");
        random_number_ordered(&field_context(&document, 0, 1)).expect("equal bounds pass");
    }

    #[test]
    fn large_integer_bounds_compare_exactly() {
        let document = json!({"tables": [{
            "name": "Orders",
            "fields": [{
                "name": "big",
                "settings": {"dataType": {
                    "dataType": "randomNumber",
                    "randomNumber": {"start": 9007199254740993_u64, "end": 9007199254740992_u64}
                }}
            }, {
                "name": "mixed",
                "settings": {"dataType": {
                    "dataType": "randomNumber",
                    "randomNumber": {"start": -1, "end": 18446744073709551615_u64}
                }}
            }, {
                "name": "fractional",
                "settings": {"dataType": {
                    "dataType": "randomNumber",
                    "randomNumber": {"start": 2.5, "end": 2}
                }}
            }]
        }]});

        let message = rejection(random_number_ordered(&field_context(&document, 0, 0)));
        assert!(message.contains("(9007199254740993)"), "{message}");
        random_number_ordered(&field_context(&document, 0, 1)).expect("signed below unsigned");
        rejection(random_number_ordered(&field_context(&document, 0, 2)));
    }

    #[test]
    fn foreign_key_without_params_is_left_to_requiredness() {
        let document = json!({"tables": [{
            "name": "Orders",
            "fields": [{
                "name": "userId",
                "settings": {"keySettings": {"primaryKey": false, "foreignKey": true}}
            }]
        }]});

        foreign_key_reference_exists(&field_context(&document, 0, 0))
            .expect("absent params are not dereferenced");
    }
}
