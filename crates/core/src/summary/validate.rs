use serde_json::{Map, Value};

use super::types::{FileField, TestSummary, ValidationMode};

/// A model record that does not fit the summary schema.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
#[error("Summary at index {index} is invalid: {reason}")]
pub struct SchemaError {
    /// Position of the offending record in the model's array.
    pub index: usize,
    pub reason: String,
}

impl SchemaError {
    fn new(index: usize, reason: impl Into<String>) -> Self {
        Self {
            index,
            reason: reason.into(),
        }
    }
}

/// Validate raw model records and normalize them into [`TestSummary`] values.
///
/// Records are checked in order and the first invalid one aborts the batch.
/// Output order matches input order.
pub fn validate_summaries(
    records: Vec<Value>,
    mode: ValidationMode,
) -> Result<Vec<TestSummary>, SchemaError> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| validate_summary(index, record, mode))
        .collect()
}

fn validate_summary(
    index: usize,
    record: Value,
    mode: ValidationMode,
) -> Result<TestSummary, SchemaError> {
    let Value::Object(mut fields) = record else {
        return Err(SchemaError::new(index, "expected a JSON object"));
    };

    let title = required_string(index, &mut fields, "title")?;
    let description = required_string(index, &mut fields, "description")?;
    let framework = optional_string(index, &mut fields, "framework")?;

    let file = match fields.remove("file") {
        None | Some(Value::Null) => None,
        Some(value) => Some(
            serde_json::from_value::<FileField>(value)
                .map_err(|_| {
                    SchemaError::new(index, "field 'file' must be a string or a list of strings")
                })?
                .normalize(),
        ),
    };

    if file.is_none() && mode == ValidationMode::Strict {
        return Err(SchemaError::new(index, "missing required field 'file'"));
    }

    Ok(TestSummary {
        title,
        description,
        framework,
        file,
    })
}

fn required_string(
    index: usize,
    fields: &mut Map<String, Value>,
    name: &str,
) -> Result<String, SchemaError> {
    match fields.remove(name) {
        Some(Value::String(value)) => Ok(value),
        None | Some(Value::Null) => Err(SchemaError::new(
            index,
            format!("missing required field '{name}'"),
        )),
        Some(_) => Err(SchemaError::new(
            index,
            format!("field '{name}' must be a string"),
        )),
    }
}

fn optional_string(
    index: usize,
    fields: &mut Map<String, Value>,
    name: &str,
) -> Result<Option<String>, SchemaError> {
    match fields.remove(name) {
        Some(Value::String(value)) => Ok(Some(value)),
        None | Some(Value::Null) => Ok(None),
        Some(_) => Err(SchemaError::new(
            index,
            format!("field '{name}' must be a string"),
        )),
    }
}

/// Normalize an already-parsed `file` value. Idempotent on strings.
pub fn normalize_file_field(field: FileField) -> String {
    field.normalize()
}
