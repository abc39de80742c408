//! Mapping between abstract Vecorel types and Arrow/Parquet types.
//!
//! The abstract type is the single source of truth. Two Arrow views are
//! derived from it:
//! - the columnar (storage) type written to GeoParquet
//! - the dataframe type used in memory, which dictionary-encodes enums
//!
//! [`check_columnar_type`] is the predicate the validator runs against the
//! stored column types.

use std::sync::Arc;

use arrow::datatypes::{DataType as ArrowType, Field, Fields, TimeUnit};

use crate::error::{Result, VecorelError};
use crate::schema::model::{AdditionalProperties, PropertySchema};
use crate::types::DataType;

/// Field names of the bounding-box struct, in storage order
pub const BBOX_FIELDS: [&str; 4] = ["xmin", "ymin", "xmax", "ymax"];

/// Timezone written for `date-time` columns
pub const UTC: &str = "UTC";

/// `date-time` maps to millisecond timestamps in UTC
#[must_use]
pub fn timestamp_data_type() -> ArrowType {
    ArrowType::Timestamp(TimeUnit::Millisecond, Some(UTC.into()))
}

/// `bounding-box` maps to a struct of four doubles
#[must_use]
pub fn bbox_data_type() -> ArrowType {
    ArrowType::Struct(
        BBOX_FIELDS
            .iter()
            .map(|name| Field::new(*name, ArrowType::Float64, false))
            .collect::<Fields>(),
    )
}

/// Derive the columnar (storage) type for a property
pub fn columnar_type(name: &str, schema: &PropertySchema) -> Result<ArrowType> {
    let data_type = schema.data_type(name)?;
    let arrow_type = match data_type {
        DataType::Boolean => ArrowType::Boolean,
        DataType::Int8 => ArrowType::Int8,
        DataType::Int16 => ArrowType::Int16,
        DataType::Int32 => ArrowType::Int32,
        DataType::Int64 => ArrowType::Int64,
        DataType::UInt8 => ArrowType::UInt8,
        DataType::UInt16 => ArrowType::UInt16,
        DataType::UInt32 => ArrowType::UInt32,
        DataType::UInt64 => ArrowType::UInt64,
        DataType::Float => ArrowType::Float32,
        DataType::Double => ArrowType::Float64,
        DataType::String => ArrowType::Utf8,
        DataType::Binary | DataType::Geometry => ArrowType::Binary,
        DataType::Date => ArrowType::Date32,
        DataType::DateTime => timestamp_data_type(),
        DataType::BoundingBox => bbox_data_type(),
        DataType::Array => {
            let items = schema.items.as_deref().ok_or_else(|| {
                VecorelError::type_error(format!("Array property '{name}' must declare 'items'"))
            })?;
            let item_type = columnar_type(&format!("{name}[]"), items)?;
            ArrowType::List(Arc::new(Field::new("item", item_type, true)))
        }
        DataType::Object => object_type(name, schema)?,
    };
    Ok(arrow_type)
}

fn object_type(name: &str, schema: &PropertySchema) -> Result<ArrowType> {
    if let Some(value_schema) = schema.map_value_schema() {
        return Ok(map_type(&format!("{name}.*"), value_schema)?);
    }

    match &schema.properties {
        Some(properties) if !properties.is_empty() => {
            let fields = properties
                .iter()
                .map(|(field, prop)| {
                    let path = format!("{name}.{field}");
                    Ok(Field::new(
                        field,
                        columnar_type(&path, prop)?,
                        !schema.requires(field),
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ArrowType::Struct(fields.into()))
        }
        _ => match &schema.additional_properties {
            Some(AdditionalProperties::Schema(value_schema)) => {
                map_type(&format!("{name}.*"), value_schema)
            }
            _ => Err(VecorelError::type_error(format!(
                "Object property '{name}' must declare 'properties' or a single 'patternProperties' entry"
            ))),
        },
    }
}

fn map_type(name: &str, value_schema: &PropertySchema) -> Result<ArrowType> {
    let value_type = columnar_type(name, value_schema)?;
    let entries = Field::new(
        "entries",
        ArrowType::Struct(Fields::from(vec![
            Field::new("key", ArrowType::Utf8, false),
            Field::new("value", value_type, true),
        ])),
        false,
    );
    Ok(ArrowType::Map(Arc::new(entries), false))
}

/// Storage field: required properties are non-nullable
pub fn storage_field(name: &str, schema: &PropertySchema, required: bool) -> Result<Field> {
    Ok(Field::new(name, columnar_type(name, schema)?, !required))
}

/// Dataframe field: like the storage field, but enums over strings and
/// integers are dictionary encoded
pub fn frame_field(name: &str, schema: &PropertySchema, required: bool) -> Result<Field> {
    let storage = columnar_type(name, schema)?;
    let data_type = if schema.is_enum() && is_dictionary_candidate(&storage) {
        ArrowType::Dictionary(Box::new(ArrowType::Int32), Box::new(storage))
    } else {
        storage
    };
    Ok(Field::new(name, data_type, !required))
}

const fn is_dictionary_candidate(data_type: &ArrowType) -> bool {
    matches!(
        data_type,
        ArrowType::Utf8
            | ArrowType::Int8
            | ArrowType::Int16
            | ArrowType::Int32
            | ArrowType::Int64
            | ArrowType::UInt8
            | ArrowType::UInt16
            | ArrowType::UInt32
            | ArrowType::UInt64
    )
}

/// Outcome of comparing a stored column type with the declared type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCheck {
    /// The column stores the declared type
    Match,
    /// The column stores a different type
    Mismatch { expected: ArrowType, actual: ArrowType },
    /// A `date-time` column uses a unit other than milliseconds
    TimestampUnit(TimeUnit),
    /// A `date-time` column is not in UTC
    TimestampZone(Option<String>),
}

impl TypeCheck {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    /// Human readable description for validation reports
    #[must_use]
    pub fn describe(&self, column: &str) -> Option<String> {
        match self {
            Self::Match => None,
            Self::Mismatch { expected, actual } => Some(format!(
                "{column}: expected data type {expected}, but got {actual}"
            )),
            Self::TimestampUnit(unit) => Some(format!(
                "{column}: date-time must use millisecond precision, but got {unit:?}"
            )),
            Self::TimestampZone(zone) => Some(format!(
                "{column}: date-time must be stored in UTC, but got timezone {}",
                zone.as_deref().unwrap_or("<none>")
            )),
        }
    }
}

/// Check a stored column type against the declared property schema
pub fn check_columnar_type(
    name: &str,
    schema: &PropertySchema,
    actual: &ArrowType,
) -> Result<TypeCheck> {
    let actual = match actual {
        ArrowType::Dictionary(_, value) => value.as_ref(),
        other => other,
    };

    if schema.data_type(name)? == DataType::DateTime {
        return Ok(match actual {
            ArrowType::Timestamp(TimeUnit::Millisecond, tz) if is_utc(tz.as_deref()) => {
                TypeCheck::Match
            }
            ArrowType::Timestamp(TimeUnit::Millisecond, tz) => {
                TypeCheck::TimestampZone(tz.as_ref().map(ToString::to_string))
            }
            ArrowType::Timestamp(unit, _) => TypeCheck::TimestampUnit(*unit),
            other => TypeCheck::Mismatch {
                expected: timestamp_data_type(),
                actual: other.clone(),
            },
        });
    }

    let expected = columnar_type(name, schema)?;
    if types_equivalent(&expected, actual) {
        Ok(TypeCheck::Match)
    } else {
        Ok(TypeCheck::Mismatch {
            expected,
            actual: actual.clone(),
        })
    }
}

fn is_utc(zone: Option<&str>) -> bool {
    matches!(zone, Some("UTC" | "utc" | "Etc/UTC" | "+00:00" | "Z"))
}

/// Structural type equality that ignores field naming of list/map wrappers
/// and accepts the large/view variants of strings and binaries
#[must_use]
pub fn types_equivalent(expected: &ArrowType, actual: &ArrowType) -> bool {
    match (expected, actual) {
        (ArrowType::Utf8, ArrowType::Utf8 | ArrowType::LargeUtf8 | ArrowType::Utf8View) => true,
        (
            ArrowType::Binary,
            ArrowType::Binary | ArrowType::LargeBinary | ArrowType::BinaryView,
        ) => true,
        (_, ArrowType::Dictionary(_, value)) => types_equivalent(expected, value),
        (ArrowType::List(e), ArrowType::List(a) | ArrowType::LargeList(a)) => {
            types_equivalent(e.data_type(), a.data_type())
        }
        (ArrowType::Map(e, _), ArrowType::Map(a, _)) => {
            match (e.data_type(), a.data_type()) {
                (ArrowType::Struct(ef), ArrowType::Struct(af)) if ef.len() == 2 && af.len() == 2 => {
                    types_equivalent(ef[0].data_type(), af[0].data_type())
                        && types_equivalent(ef[1].data_type(), af[1].data_type())
                }
                _ => false,
            }
        }
        (ArrowType::Struct(ef), ArrowType::Struct(af)) => {
            ef.len() == af.len()
                && ef.iter().all(|e| {
                    af.iter()
                        .find(|a| a.name() == e.name())
                        .is_some_and(|a| types_equivalent(e.data_type(), a.data_type()))
                })
        }
        (e, a) => e == a,
    }
}
