//! Conversion between Arrow arrays and JSON values.
//!
//! Used by the feature encoding (both directions) and by the row-level value
//! checks of the validator. Dates are written as `YYYY-MM-DD`, timestamps as
//! RFC 3339 in UTC with a `Z` suffix and binaries as lowercase hex.

use std::sync::Arc;

use arrow::array::{
    new_null_array, Array, ArrayRef, AsArray, BinaryArray, BooleanArray, Date32Array,
    Float32Array, Float64Array, ListArray, MapArray, PrimitiveArray, StringArray, StructArray,
    TimestampMillisecondArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer};
use arrow::compute::cast;
use arrow::datatypes::{
    ArrowPrimitiveType, DataType as ArrowType, Date32Type, Field, Fields, Float32Type,
    Float64Type, Int16Type, Int32Type, Int64Type, Int8Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::error::{Result, VecorelError};

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub(crate) static NULL: Value = Value::Null;

/// Convert every row of an array into a JSON value; nulls become `null`
pub fn column_values(array: &dyn Array) -> Result<Vec<Value>> {
    let len = array.len();
    let values = match array.data_type() {
        ArrowType::Null => vec![Value::Null; len],
        ArrowType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map_or(Value::Null, Value::Bool))
            .collect(),
        ArrowType::Int8 => ints(array.as_primitive::<Int8Type>()),
        ArrowType::Int16 => ints(array.as_primitive::<Int16Type>()),
        ArrowType::Int32 => ints(array.as_primitive::<Int32Type>()),
        ArrowType::Int64 => ints(array.as_primitive::<Int64Type>()),
        ArrowType::UInt8 => ints(array.as_primitive::<UInt8Type>()),
        ArrowType::UInt16 => ints(array.as_primitive::<UInt16Type>()),
        ArrowType::UInt32 => ints(array.as_primitive::<UInt32Type>()),
        ArrowType::UInt64 => ints(array.as_primitive::<UInt64Type>()),
        ArrowType::Float32 => array
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| v.map_or(Value::Null, |f| float(f64::from(f))))
            .collect(),
        ArrowType::Float64 => array
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.map_or(Value::Null, float))
            .collect(),
        ArrowType::Utf8 => strings(array.as_string::<i32>().iter()),
        ArrowType::LargeUtf8 => strings(array.as_string::<i64>().iter()),
        ArrowType::Utf8View => strings(array.as_string_view().iter()),
        ArrowType::Binary => binaries(array.as_binary::<i32>().iter()),
        ArrowType::LargeBinary => binaries(array.as_binary::<i64>().iter()),
        ArrowType::BinaryView => binaries(array.as_binary_view().iter()),
        ArrowType::Date32 => array
            .as_primitive::<Date32Type>()
            .iter()
            .map(|v| v.and_then(date_string).map_or(Value::Null, Value::String))
            .collect(),
        ArrowType::Timestamp(unit, _) => timestamps(array, *unit),
        ArrowType::List(_) => {
            let list = array.as_list::<i32>();
            (0..len)
                .map(|row| {
                    if list.is_null(row) {
                        Ok(Value::Null)
                    } else {
                        column_values(list.value(row).as_ref()).map(Value::Array)
                    }
                })
                .collect::<Result<_>>()?
        }
        ArrowType::LargeList(_) => {
            let list = array.as_list::<i64>();
            (0..len)
                .map(|row| {
                    if list.is_null(row) {
                        Ok(Value::Null)
                    } else {
                        column_values(list.value(row).as_ref()).map(Value::Array)
                    }
                })
                .collect::<Result<_>>()?
        }
        ArrowType::Struct(fields) => {
            let structs = array.as_struct();
            let children = structs
                .columns()
                .iter()
                .map(|c| column_values(c.as_ref()))
                .collect::<Result<Vec<_>>>()?;
            (0..len)
                .map(|row| {
                    if structs.is_null(row) {
                        return Value::Null;
                    }
                    let object = fields
                        .iter()
                        .zip(&children)
                        .map(|(field, values)| (field.name().clone(), values[row].clone()))
                        .collect::<Map<_, _>>();
                    Value::Object(object)
                })
                .collect()
        }
        ArrowType::Map(_, _) => {
            let map = array.as_map();
            (0..len)
                .map(|row| {
                    if map.is_null(row) {
                        return Ok(Value::Null);
                    }
                    let entries = map.value(row);
                    let keys = column_values(entries.column(0).as_ref())?;
                    let values = column_values(entries.column(1).as_ref())?;
                    let object = keys
                        .into_iter()
                        .zip(values)
                        .map(|(k, v)| {
                            let key = match k {
                                Value::String(s) => s,
                                other => other.to_string(),
                            };
                            (key, v)
                        })
                        .collect::<Map<_, _>>();
                    Ok(Value::Object(object))
                })
                .collect::<Result<_>>()?
        }
        ArrowType::Dictionary(_, value_type) => {
            let plain = cast(array, value_type)?;
            column_values(plain.as_ref())?
        }
        other => {
            return Err(VecorelError::type_error(format!(
                "Cannot convert {other} values to JSON"
            )));
        }
    };
    Ok(values)
}

fn ints<T>(array: &PrimitiveArray<T>) -> Vec<Value>
where
    T: ArrowPrimitiveType,
    T::Native: Into<Number>,
{
    array
        .iter()
        .map(|v| v.map_or(Value::Null, |n| Value::Number(n.into())))
        .collect()
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn strings<'a>(iter: impl Iterator<Item = Option<&'a str>>) -> Vec<Value> {
    iter.map(|v| v.map_or(Value::Null, |s| Value::String(s.to_string())))
        .collect()
}

fn binaries<'a>(iter: impl Iterator<Item = Option<&'a [u8]>>) -> Vec<Value> {
    iter.map(|v| v.map_or(Value::Null, |b| Value::String(hex::encode(b))))
        .collect()
}

fn date_string(days: i32) -> Option<String> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
        .map(|d| d.format("%Y-%m-%d").to_string())
}

/// RFC 3339 with `Z`, fractional seconds only when present
#[must_use]
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn timestamps(array: &dyn Array, unit: TimeUnit) -> Vec<Value> {
    fn convert(v: Option<i64>, f: impl Fn(i64) -> Option<DateTime<Utc>>) -> Value {
        v.and_then(f)
            .map_or(Value::Null, |dt| Value::String(format_timestamp(&dt)))
    }
    match unit {
        TimeUnit::Second => array
            .as_primitive::<TimestampSecondType>()
            .iter()
            .map(|v| convert(v, |s| DateTime::from_timestamp(s, 0)))
            .collect(),
        TimeUnit::Millisecond => array
            .as_primitive::<TimestampMillisecondType>()
            .iter()
            .map(|v| convert(v, DateTime::from_timestamp_millis))
            .collect(),
        TimeUnit::Microsecond => array
            .as_primitive::<TimestampMicrosecondType>()
            .iter()
            .map(|v| convert(v, DateTime::from_timestamp_micros))
            .collect(),
        TimeUnit::Nanosecond => array
            .as_primitive::<TimestampNanosecondType>()
            .iter()
            .map(|v| convert(v, |n| Some(DateTime::from_timestamp_nanos(n))))
            .collect(),
    }
}

/// Remove `null` members from objects, recursively (array elements stay)
#[must_use]
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

fn type_error(field: &Field, value: &Value) -> VecorelError {
    VecorelError::type_error(format!(
        "Column '{}': cannot store {value} as {}",
        field.name(),
        field.data_type()
    ))
}

fn integer(field: &Field, value: &Value) -> Result<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 1.0e18)
                    .map(|f| f as i128)
            })
            .ok_or_else(|| type_error(field, value)),
        _ => Err(type_error(field, value)),
    }
}

fn build_ints<T>(field: &Field, values: &[&Value]) -> Result<ArrayRef>
where
    T: ArrowPrimitiveType,
    T::Native: TryFrom<i128>,
{
    let natives = values
        .iter()
        .map(|value| match value {
            Value::Null => Ok(None),
            other => {
                let n = integer(field, other)?;
                T::Native::try_from(n).map(Some).map_err(|_| {
                    VecorelError::Value(format!(
                        "Column '{}': {n} is out of range for {}",
                        field.name(),
                        field.data_type()
                    ))
                })
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Arc::new(PrimitiveArray::<T>::from_iter(natives)))
}

fn floats(field: &Field, values: &[&Value]) -> Result<Vec<Option<f64>>> {
    values
        .iter()
        .map(|value| match value {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(n.as_f64()),
            other => Err(type_error(field, other)),
        })
        .collect()
}

fn texts<'a>(field: &Field, values: &[&'a Value]) -> Result<Vec<Option<&'a str>>> {
    values
        .iter()
        .map(|value| match *value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.as_str())),
            other => Err(type_error(field, other)),
        })
        .collect()
}

/// Parse an RFC 3339 timestamp (or a plain date) into milliseconds since epoch
pub fn parse_timestamp_millis(text: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn null_buffer(values: &[&Value]) -> Option<NullBuffer> {
    if values.iter().any(|v| v.is_null()) {
        Some(NullBuffer::from(
            values.iter().map(|v| !v.is_null()).collect::<Vec<bool>>(),
        ))
    } else {
        None
    }
}

fn offsets(lengths: impl Iterator<Item = usize>) -> OffsetBuffer<i32> {
    OffsetBuffer::from_lengths(lengths)
}

/// Build an Arrow array of the field's type from JSON values
pub fn build_array(field: &Field, values: &[&Value]) -> Result<ArrayRef> {
    let array: ArrayRef = match field.data_type() {
        ArrowType::Null => new_null_array(&ArrowType::Null, values.len()),
        ArrowType::Boolean => {
            let bools = values
                .iter()
                .map(|value| match value {
                    Value::Null => Ok(None),
                    Value::Bool(b) => Ok(Some(*b)),
                    other => Err(type_error(field, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(BooleanArray::from(bools))
        }
        ArrowType::Int8 => build_ints::<Int8Type>(field, values)?,
        ArrowType::Int16 => build_ints::<Int16Type>(field, values)?,
        ArrowType::Int32 => build_ints::<Int32Type>(field, values)?,
        ArrowType::Int64 => build_ints::<Int64Type>(field, values)?,
        ArrowType::UInt8 => build_ints::<UInt8Type>(field, values)?,
        ArrowType::UInt16 => build_ints::<UInt16Type>(field, values)?,
        ArrowType::UInt32 => build_ints::<UInt32Type>(field, values)?,
        ArrowType::UInt64 => build_ints::<UInt64Type>(field, values)?,
        ArrowType::Float32 => {
            let floats = floats(field, values)?;
            Arc::new(Float32Array::from_iter(
                floats.into_iter().map(|f| f.map(|f| f as f32)),
            ))
        }
        ArrowType::Float64 => Arc::new(Float64Array::from(floats(field, values)?)),
        ArrowType::Utf8 => Arc::new(StringArray::from(texts(field, values)?)),
        ArrowType::Binary => {
            let bytes = texts(field, values)?
                .into_iter()
                .map(|t| {
                    t.map(|t| {
                        hex::decode(t).map_err(|e| {
                            VecorelError::Value(format!("Column '{}': invalid hex: {e}", field.name()))
                        })
                    })
                    .transpose()
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(BinaryArray::from_iter(bytes))
        }
        ArrowType::Date32 => {
            let days = texts(field, values)?
                .into_iter()
                .map(|t| {
                    t.map(|t| {
                        NaiveDate::parse_from_str(t, "%Y-%m-%d")
                            .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                            .map_err(|e| {
                                VecorelError::Value(format!("Column '{}': invalid date '{t}': {e}", field.name()))
                            })
                    })
                    .transpose()
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(Date32Array::from(days))
        }
        ArrowType::Timestamp(TimeUnit::Millisecond, tz) => {
            let millis = texts(field, values)?
                .into_iter()
                .map(|t| {
                    t.map(|t| {
                        parse_timestamp_millis(t).ok_or_else(|| {
                            VecorelError::Value(format!(
                                "Column '{}': invalid date-time '{t}'",
                                field.name()
                            ))
                        })
                    })
                    .transpose()
                })
                .collect::<Result<Vec<_>>>()?;
            Arc::new(TimestampMillisecondArray::from(millis).with_timezone_opt(tz.clone()))
        }
        ArrowType::List(item) => {
            let mut lengths = Vec::with_capacity(values.len());
            let mut children = Vec::new();
            for value in values {
                match value {
                    Value::Null => lengths.push(0),
                    Value::Array(items) => {
                        lengths.push(items.len());
                        children.extend(items.iter());
                    }
                    other => return Err(type_error(field, other)),
                }
            }
            let child = build_array(item, &children)?;
            Arc::new(ListArray::try_new(
                item.clone(),
                offsets(lengths.into_iter()),
                child,
                null_buffer(values),
            )?)
        }
        ArrowType::Struct(fields) => build_struct(field, fields, values)?,
        ArrowType::Map(entries, sorted) => {
            let ArrowType::Struct(entry_fields) = entries.data_type() else {
                return Err(type_error(field, &Value::Null));
            };
            let mut lengths = Vec::with_capacity(values.len());
            let mut keys = Vec::new();
            let mut items = Vec::new();
            for value in values {
                match value {
                    Value::Null => lengths.push(0),
                    Value::Object(map) => {
                        lengths.push(map.len());
                        for (k, v) in map {
                            keys.push(Value::String(k.clone()));
                            items.push(v);
                        }
                    }
                    other => return Err(type_error(field, other)),
                }
            }
            let key_refs: Vec<&Value> = keys.iter().collect();
            let key_array = build_array(&entry_fields[0], &key_refs)?;
            let value_array = build_array(&entry_fields[1], &items)?;
            let entries_array = StructArray::try_new(
                entry_fields.clone(),
                vec![key_array, value_array],
                None,
            )?;
            Arc::new(MapArray::try_new(
                entries.clone(),
                offsets(lengths.into_iter()),
                entries_array,
                null_buffer(values),
                *sorted,
            )?)
        }
        ArrowType::Dictionary(_, value_type) => {
            let plain_field = Field::new(field.name(), value_type.as_ref().clone(), true);
            let plain = build_array(&plain_field, values)?;
            cast(plain.as_ref(), field.data_type())?
        }
        other => {
            return Err(VecorelError::type_error(format!(
                "Column '{}': unsupported data type {other}",
                field.name()
            )));
        }
    };
    Ok(array)
}

fn build_struct(field: &Field, fields: &Fields, values: &[&Value]) -> Result<ArrayRef> {
    let columns = fields
        .iter()
        .map(|child| {
            let child_values = values
                .iter()
                .map(|value| match *value {
                    Value::Object(map) => Ok(map.get(child.name()).unwrap_or(&NULL)),
                    Value::Null => Ok(&NULL),
                    other => Err(type_error(field, other)),
                })
                .collect::<Result<Vec<_>>>()?;
            build_array(child, &child_values)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Arc::new(StructArray::try_new(
        fields.clone(),
        columns,
        null_buffer(values),
    )?))
}

/// Guess an Arrow type for JSON values of a property without a schema
#[must_use]
pub fn infer_type(values: &[&Value]) -> ArrowType {
    let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return ArrowType::Null;
    }
    if present.iter().all(|v| v.is_boolean()) {
        ArrowType::Boolean
    } else if present.iter().all(|v| v.is_i64()) {
        ArrowType::Int64
    } else if present.iter().all(|v| v.is_number()) {
        ArrowType::Float64
    } else if present.iter().all(|v| v.is_array()) {
        let items: Vec<&Value> = present
            .iter()
            .filter_map(|v| v.as_array())
            .flatten()
            .collect();
        let item_type = match infer_type(&items) {
            ArrowType::Null => ArrowType::Utf8,
            other => other,
        };
        ArrowType::List(Arc::new(Field::new("item", item_type, true)))
    } else if present.iter().all(|v| v.is_object()) {
        let mut names: Vec<&String> = Vec::new();
        for object in present.iter().filter_map(|v| v.as_object()) {
            for key in object.keys() {
                if !names.contains(&key) {
                    names.push(key);
                }
            }
        }
        let fields = names
            .into_iter()
            .map(|name| {
                let child: Vec<&Value> = present
                    .iter()
                    .map(|v| v.get(name.as_str()).unwrap_or(&NULL))
                    .collect();
                let child_type = match infer_type(&child) {
                    ArrowType::Null => ArrowType::Utf8,
                    other => other,
                };
                Field::new(name.as_str(), child_type, true)
            })
            .collect::<Fields>();
        ArrowType::Struct(fields)
    } else {
        ArrowType::Utf8
    }
}
