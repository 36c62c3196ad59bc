use serde_json::{Map, Value};
use tabgen_core::{CheckFn, ContextFamily, ContextProducer, GlobalContext, ItemIter, Validator};
use tabgen_schema::SchemaNode;

use crate::errors::SpecError;

/// Rule-set family: JSON specification documents checked against a
/// [`SchemaNode`].
pub struct Specification;

impl ContextFamily for Specification {
    type Document = Value;
    type Schema = SchemaNode;
    type Item<'a> = SpecContext<'a>;
    type Error = SpecError;
}

/// Context record handed to each check.
#[derive(Debug, Clone, Copy)]
pub enum SpecContext<'a> {
    Table(TableContext<'a>),
    Field(FieldContext<'a>),
}

impl<'a> SpecContext<'a> {
    pub fn table(&self) -> Option<&TableContext<'a>> {
        match self {
            SpecContext::Table(table) => Some(table),
            SpecContext::Field(_) => None,
        }
    }

    pub fn field(&self) -> Option<&FieldContext<'a>> {
        match self {
            SpecContext::Field(field) => Some(field),
            SpecContext::Table(_) => None,
        }
    }
}

/// One table of the specification.
#[derive(Debug, Clone, Copy)]
pub struct TableContext<'a> {
    pub document: &'a Value,
    pub schema: Option<&'a SchemaNode>,
    pub table: &'a Value,
}

impl<'a> TableContext<'a> {
    pub fn name(&self) -> &'a str {
        name_of(self.table)
    }

    pub fn fields(&self) -> impl Iterator<Item = &'a Value> + 'a {
        fields_of(self.table)
    }

    /// `{table: "<name>"}`, with the name quoted and escaped.
    pub fn describe(&self) -> String {
        format!("{{table: {:?}}}", self.name())
    }
}

/// One field of one table of the specification.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub document: &'a Value,
    pub schema: Option<&'a SchemaNode>,
    pub table: &'a Value,
    pub field: &'a Value,
}

impl<'a> FieldContext<'a> {
    pub fn table_name(&self) -> &'a str {
        name_of(self.table)
    }

    pub fn field_name(&self) -> &'a str {
        name_of(self.field)
    }

    /// `{table: "<name>", field: "<name>"}`
    pub fn describe(&self) -> String {
        format!(
            "{{table: {:?}, field: {:?}}}",
            self.table_name(),
            self.field_name()
        )
    }

    pub fn key_settings(&self) -> Option<&'a Map<String, Value>> {
        self.settings("keySettings")
    }

    pub fn is_primary_key(&self) -> bool {
        flag(self.key_settings(), "primaryKey")
    }

    pub fn is_foreign_key(&self) -> bool {
        flag(self.key_settings(), "foreignKey")
    }

    pub fn foreign_key_params(&self) -> Option<&'a Value> {
        self.key_settings()?.get("foreignKeyParams")
    }

    /// The `dataType` tag, e.g. `"numberSequence"`.
    pub fn data_type(&self) -> Option<&'a str> {
        self.settings("dataType")?.get("dataType")?.as_str()
    }

    /// Payload stored next to the `dataType` tag under `key`.
    pub fn data_type_payload(&self, key: &str) -> Option<&'a Value> {
        self.settings("dataType")?.get(key)
    }

    fn settings(&self, key: &str) -> Option<&'a Map<String, Value>> {
        self.field.get("settings")?.get(key)?.as_object()
    }
}

fn name_of(value: &Value) -> &str {
    value.get("name").and_then(Value::as_str).unwrap_or("")
}

fn flag(settings: Option<&Map<String, Value>>, key: &str) -> bool {
    settings
        .and_then(|settings| settings.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Tables of a specification document, in declaration order.
pub fn tables_of(document: &Value) -> impl Iterator<Item = &Value> {
    document
        .get("tables")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// Fields of a table, in declaration order.
pub fn fields_of(table: &Value) -> impl Iterator<Item = &Value> {
    table
        .get("fields")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn each_table<'a>(global: GlobalContext<'a, Specification>) -> ItemIter<'a, Specification> {
    let GlobalContext { document, schema } = global;
    Box::new(tables_of(document).map(move |table| {
        SpecContext::Table(TableContext {
            document,
            schema,
            table,
        })
    }))
}

fn each_field<'a>(global: GlobalContext<'a, Specification>) -> ItemIter<'a, Specification> {
    let GlobalContext { document, schema } = global;
    Box::new(tables_of(document).flat_map(move |table| {
        fields_of(table).map(move |field| {
            SpecContext::Field(FieldContext {
                document,
                schema,
                table,
                field,
            })
        })
    }))
}

/// Yields a [`TableContext`] per table.
pub static EACH_TABLE: ContextProducer<Specification> =
    ContextProducer::<Specification>::new("each_table", each_table);

/// Yields a [`FieldContext`] per field, table by table.
pub static EACH_FIELD: ContextProducer<Specification> =
    ContextProducer::<Specification>::new("each_field", each_field);

/// Declare a check run once per table.
pub fn table_rule(name: &'static str, check: CheckFn<Specification>) -> Validator<Specification> {
    Validator::<Specification>::define(&EACH_TABLE, name, check)
}

/// Declare a check run once per field.
pub fn field_rule(name: &'static str, check: CheckFn<Specification>) -> Validator<Specification> {
    Validator::<Specification>::define(&EACH_FIELD, name, check)
}
