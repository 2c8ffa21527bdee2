// src/normalize/mod.rs
//
// Flattens raw remote records into rows matching a module's declared columns.
// Two tiers: a structural copy of scalar top-level fields, then the per-module
// candidate path table for whatever is still missing. Never fails.

mod paths;

use crate::catalog::Module;
use crate::models::FlattenedRow;
use serde_json::{Map, Value};

pub use paths::{candidate_paths, module_paths};

/// Characters stripped from monetary strings before parsing.
const NUMERIC_NOISE: &[char] = &[',', '£', '$', '€'];

/// Normalizes one raw record for `module`.
///
/// The output carries exactly the module's columns, in declared order.
/// Numeric and currency columns always hold a finite number.
pub fn normalize(raw: &Value, module: &Module) -> FlattenedRow {
    let scalars = top_level_scalars(raw);
    let mut row = FlattenedRow::new();

    for column in module.columns {
        let resolved = scalars
            .get(column.key)
            .filter(|v| !is_blank(v))
            .cloned()
            .or_else(|| first_candidate(raw, candidate_paths(module.key, column.key)))
            .or_else(|| scalars.get(column.key).cloned())
            .unwrap_or(Value::Null);

        let value = if column.column_type.is_numeric() {
            number_value(coerce_number(&resolved))
        } else {
            resolved
        };
        row.insert(column.key, value);
    }

    row
}

/// Normalizes a batch of records.
pub fn normalize_all(records: &[Value], module: &Module) -> Vec<FlattenedRow> {
    records.iter().map(|r| normalize(r, module)).collect()
}

/// Walks a dot-separated path (`"rates.0.price"`) into `raw`.
pub fn resolve_path<'a>(raw: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(raw, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Coerces a value to a finite float; anything non-numeric becomes 0.
///
/// Strings lose thousands separators, currency symbols and whitespace first,
/// so `"£1,234.50"` reads as 1234.5.
pub fn coerce_number(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !NUMERIC_NOISE.contains(c) && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|f| f.is_finite()).unwrap_or(0.0)
}

/// JSON number for `f`, integral values as integers so ids render as `42`.
fn number_value(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Value::from(f)
    }
}

fn top_level_scalars(raw: &Value) -> Map<String, Value> {
    match raw {
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| is_scalar(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => Map::new(),
    }
}

fn first_candidate(raw: &Value, paths: &[&str]) -> Option<Value> {
    paths
        .iter()
        .filter_map(|path| resolve_path(raw, path))
        .find(|v| is_scalar(v) && !is_blank(v))
        .cloned()
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Object(_) | Value::Array(_))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}
