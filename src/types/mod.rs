//! The abstract type vocabulary of the Vecorel format.
//!
//! Every property schema names one of these types. The Arrow mapping in
//! [`columnar`] derives the columnar storage type and the in-memory dataframe type
//! from the abstract type and its constraints.

pub mod columnar;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VecorelError;

pub use self::columnar::{
    BBOX_FIELDS, bbox_data_type, check_columnar_type, columnar_type, frame_field, storage_field,
    timestamp_data_type, TypeCheck,
};

/// Abstract data type of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Binary,
    Date,
    DateTime,
    Array,
    Object,
    Geometry,
    BoundingBox,
}

impl DataType {
    /// All supported types, in declaration order
    pub const ALL: [DataType; 19] = [
        Self::Boolean,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::UInt8,
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Float,
        Self::Double,
        Self::String,
        Self::Binary,
        Self::Date,
        Self::DateTime,
        Self::Array,
        Self::Object,
        Self::Geometry,
        Self::BoundingBox,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Binary => "binary",
            Self::Date => "date",
            Self::DateTime => "date-time",
            Self::Array => "array",
            Self::Object => "object",
            Self::Geometry => "geometry",
            Self::BoundingBox => "bounding-box",
        }
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, Self::Float | Self::Double)
    }

    /// Scalar types can be compared for `uniqueItems`
    #[must_use]
    pub const fn is_scalar(self) -> bool {
        !matches!(
            self,
            Self::Array | Self::Object | Self::Geometry | Self::BoundingBox
        )
    }

    /// Inclusive value range of integer types
    #[must_use]
    pub const fn integer_range(self) -> Option<(i128, i128)> {
        match self {
            Self::Int8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::Int16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::Int32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::Int64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Self::UInt8 => Some((0, u8::MAX as i128)),
            Self::UInt16 => Some((0, u16::MAX as i128)),
            Self::UInt32 => Some((0, u32::MAX as i128)),
            Self::UInt64 => Some((0, u64::MAX as i128)),
            _ => None,
        }
    }
}

impl FromStr for DataType {
    type Err = VecorelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| VecorelError::type_error(format!("Unsupported data type '{s}'")))
    }
}

impl TryFrom<String> for DataType {
    type Error = VecorelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataType> for String {
    fn from(value: DataType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_types() {
        for t in DataType::ALL {
            assert_eq!(t.as_str().parse::<DataType>().unwrap(), t);
        }
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = "decimal".parse::<DataType>().unwrap_err();
        assert!(err.to_string().contains("decimal"));
        assert!(serde_json::from_str::<DataType>("\"int128\"").is_err());
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(DataType::UInt8.integer_range(), Some((0, 255)));
        assert_eq!(DataType::Double.integer_range(), None);
        assert!(DataType::String.is_scalar());
        assert!(!DataType::Array.is_scalar());
    }
}
