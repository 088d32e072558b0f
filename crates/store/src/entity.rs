// Typed records over loosely keyed rows

use std::collections::BTreeMap;
use std::fmt;

use lahimena_io::{first_available, parse_number, CellValue, FieldMap, Number};

use crate::schema::{Extension, FieldSpec};

/// A record kind stored one-per-row in a sheet.
///
/// `from_fields` accepts both decoded rows (keyed by header) and form input
/// (keyed by semantic name or any alias). `to_fields` produces semantic
/// names for schema fields and raw header names for extra columns.
pub trait Entity: Clone + Send + Sync + 'static {
    type Filter: fmt::Debug + Send + Sync;

    /// Cache namespace and log label
    const KIND: &'static str;

    fn fields() -> &'static [FieldSpec];

    /// Column whose first empty cell ends the data region
    fn key_field() -> &'static FieldSpec;

    /// Secondary sheet joined on the key, if any
    fn extension() -> Option<&'static Extension> {
        None
    }

    fn from_fields(fields: &FieldMap) -> Self;

    fn to_fields(&self) -> FieldMap;

    /// Sheet row the record was read from, 0 when not read from a sheet
    fn row_number(&self) -> usize;

    fn set_row_number(&mut self, row: usize);

    fn matches(&self, filter: &Self::Filter) -> bool;

    fn key(&self) -> String {
        self.to_fields()
            .get(Self::key_field().name)
            .map(|v| v.as_text().trim().to_string())
            .unwrap_or_default()
    }
}

/// Resolve a text field, trimmed
pub fn text(fields: &FieldMap, spec: &FieldSpec) -> String {
    first_available(fields, &spec.lookup_keys(), CellValue::Empty)
        .as_text()
        .trim()
        .to_string()
}

/// Resolve a numeric field; unparseable or missing values are zero
pub fn number(fields: &FieldMap, spec: &FieldSpec) -> Number {
    parse_number(&first_available(fields, &spec.lookup_keys(), CellValue::Empty))
}

/// Non-empty entries no spec in `groups` claims, keyed as given
pub fn extra_fields(fields: &FieldMap, groups: &[&[FieldSpec]]) -> BTreeMap<String, CellValue> {
    fields
        .iter()
        .filter(|(key, value)| !value.is_empty() && !crate::schema::is_claimed(groups, key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub fn text_cell(value: &str) -> CellValue {
    let value = value.trim();
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value.to_string())
    }
}

/// Whole amounts are written as integers
pub fn number_cell(value: f64) -> CellValue {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        CellValue::Int(value as i64)
    } else {
        CellValue::Float(value)
    }
}

/// Counts of zero are left blank
pub fn count_cell(value: i64) -> CellValue {
    if value == 0 {
        CellValue::Empty
    } else {
        CellValue::Int(value)
    }
}

/// Start a field map from a record's extra columns
pub fn with_extra(extra: &BTreeMap<String, CellValue>) -> FieldMap {
    extra.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

/// Case- and whitespace-insensitive comparison used by filters
pub fn same_text(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
