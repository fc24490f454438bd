// JSON Records
use crate::error::{Error, Result};
use crate::source::Tables;
use crate::timestamps;
use crate::visits::VisitReport;
use polars::prelude::*;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Number, Value};

const INDENT: &[u8] = b"    ";

/// One JSON object per row. Nulls and NaN become `null`; datetimes become text.
pub fn to_records(table: &DataFrame) -> Result<Vec<Value>> {
    let columns = table.get_columns();

    (0..table.height())
        .map(|row| {
            let mut record = Map::with_capacity(columns.len());
            for column in columns {
                let value = to_json(column.get(row)?, column.name())?;
                record.insert(column.name().to_string(), value);
            }
            Ok(Value::Object(record))
        })
        .collect()
}

fn to_json(value: AnyValue, column: &str) -> Result<Value> {
    Ok(match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(v) => Value::Bool(v),
        AnyValue::String(v) => Value::String(v.to_string()),
        AnyValue::StringOwned(v) => Value::String(v.to_string()),
        AnyValue::UInt8(v) => Value::from(v),
        AnyValue::UInt16(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Int8(v) => Value::from(v),
        AnyValue::Int16(v) => Value::from(v),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::Float32(v) => float(f64::from(v)),
        AnyValue::Float64(v) => float(v),
        AnyValue::Date(days) => {
            let date = chrono::NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
                .ok_or_else(|| {
                    Error::Serialization(format!("date {days} in column '{column}' is out of range"))
                })?;
            Value::String(date.format("%Y-%m-%d").to_string())
        }
        AnyValue::Datetime(v, unit, tz) => {
            Value::String(timestamps::format_datetime(v, unit, tz.map(|tz| tz.as_str()))?)
        }
        AnyValue::DatetimeOwned(v, unit, tz) => Value::String(timestamps::format_datetime(
            v,
            unit,
            tz.as_deref().map(|tz| tz.as_str()),
        )?),
        other => {
            return Err(Error::Serialization(format!(
                "column '{column}' holds a {} value with no JSON form",
                other.dtype()
            )));
        }
    })
}

/// Days from 0001-01-01 to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn float(v: f64) -> Value {
    Number::from_f64(v).map_or(Value::Null, Value::Number)
}

/// The visit report mapping: the three tables, both count tables and the stats.
pub fn visit_report(report: &VisitReport) -> Result<Value> {
    let mut out = Map::new();
    out.insert("users".to_string(), Value::Array(to_records(&report.users)?));
    out.insert("visits".to_string(), Value::Array(to_records(&report.visits)?));
    out.insert(
        "restaurants".to_string(),
        Value::Array(to_records(&report.restaurants)?),
    );
    out.insert(
        "complete_counts".to_string(),
        Value::Array(to_records(&report.complete_counts)?),
    );
    out.insert(
        "actual_counts".to_string(),
        Value::Array(to_records(&report.actual_counts)?),
    );
    out.insert("stats".to_string(), serde_json::to_value(report.stats)?);
    Ok(Value::Object(out))
}

/// Every table as records, keyed by entity name in fetch order.
pub fn tables(tables: &Tables) -> Result<Value> {
    tables
        .iter()
        .map(|(name, table)| Ok((name.to_string(), Value::Array(to_records(table)?))))
        .collect::<Result<Map<String, Value>>>()
        .map(Value::Object)
}

/// Four-space indented JSON text.
pub fn to_pretty_json(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| Error::Serialization(e.to_string()))
}
