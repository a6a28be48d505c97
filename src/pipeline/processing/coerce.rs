use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::table::MergedTable;
use crate::types::CellValue;

/// Scalar type a column can be forced into after merging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Number,
    Integer,
    Text,
    Boolean,
}

/// A configured coercion: force `field` to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionRule {
    pub field: String,
    pub target: TargetType,
}

/// Outcome of coercing one column
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoercionReport {
    pub field: String,
    pub converted: usize,
    /// Non-null values that failed to parse and became null
    pub nulled: usize,
}

/// Force every value of `field` to `target` in place.
///
/// Values that don't parse become the null marker; this never fails. A field
/// absent from the table is left alone and reported with zero counts.
pub fn coerce(table: &mut MergedTable, field: &str, target: TargetType) -> CoercionReport {
    let mut report = CoercionReport {
        field: field.to_string(),
        ..Default::default()
    };
    let Some(column) = table.column_mut(field) else {
        warn!(field, "Coercion target is not a column of the merged table");
        return report;
    };

    for value in column.iter_mut() {
        let was_null = value.is_null();
        let coerced = coerce_value(value, target);
        if coerced.is_null() {
            if !was_null {
                debug!(field, value = %value, "Value failed to parse, replaced with null");
                report.nulled += 1;
            }
        } else {
            report.converted += 1;
        }
        *value = coerced;
    }

    if report.nulled > 0 {
        warn!(field, nulled = report.nulled, ?target, "Coercion replaced unparseable values with null");
    }
    report
}

pub fn coerce_value(value: &CellValue, target: TargetType) -> CellValue {
    match target {
        TargetType::Number => to_number(value).map(CellValue::Number),
        TargetType::Integer => to_integer(value).map(CellValue::Integer),
        TargetType::Text => to_text(value).map(CellValue::Text),
        TargetType::Boolean => to_boolean(value).map(CellValue::Boolean),
    }
    .unwrap_or(CellValue::Null)
}

fn to_number(value: &CellValue) -> Option<f64> {
    let n = match value {
        CellValue::Number(n) => *n,
        CellValue::Integer(i) => *i as f64,
        CellValue::Boolean(b) => f64::from(u8::from(*b)),
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        CellValue::Null | CellValue::Labels(_) => return None,
    };
    n.is_finite().then_some(n)
}

fn to_integer(value: &CellValue) -> Option<i64> {
    match value {
        CellValue::Integer(i) => Some(*i),
        CellValue::Text(s) => s.trim().parse::<i64>().ok().or_else(|| float_to_integer(to_number(value)?)),
        other => float_to_integer(to_number(other)?),
    }
}

/// 2^63, the first float above the `i64` range
const I64_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Whole floats inside the `i64` range; anything else (fractions, NaN,
/// infinities, out of range) is `None` rather than saturated
pub(crate) fn float_to_integer(n: f64) -> Option<i64> {
    (n.fract() == 0.0 && n >= i64::MIN as f64 && n < I64_UPPER_BOUND).then_some(n as i64)
}

fn to_text(value: &CellValue) -> Option<String> {
    match value {
        CellValue::Null => None,
        CellValue::Text(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn to_boolean(value: &CellValue) -> Option<bool> {
    match value {
        CellValue::Boolean(b) => Some(*b),
        CellValue::Integer(0) => Some(false),
        CellValue::Integer(1) => Some(true),
        CellValue::Number(n) if *n == 0.0 => Some(false),
        CellValue::Number(n) if *n == 1.0 => Some(true),
        CellValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
