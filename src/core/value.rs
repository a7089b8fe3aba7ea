//! Purpose: Closed set of storable cell values, their kinds, and primary keys.
//! Exports: `Kind`, `Value`, `Key`, `NULL_TEXT`.
//! Role: Type model shared by columns, tables, and the text codec.
//! Invariants: A true null is never stored; absence is the text `"null"`.
//! Invariants: `Kind::parse` never guesses; Integer/Decimal use standard numeric parsing.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::core::cell_format::CellFormat;
use crate::core::error::{Error, ErrorKind};

pub const NULL_TEXT: &str = "null";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum Kind {
    Integer,
    Decimal,
    Byte,
    String,
    Unknown,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Integer => "Integer",
            Kind::Decimal => "Decimal",
            Kind::Byte => "Byte",
            Kind::String => "String",
            Kind::Unknown => "Unknown",
        }
    }

    pub fn of(value: &Value) -> Kind {
        value.kind()
    }

    /// Kind implied by a print format's conversion character.
    pub fn from_format(format: &str) -> Result<Kind, Error> {
        CellFormat::parse(format).map(|parsed| parsed.kind())
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Integer | Kind::Decimal)
    }

    /// Print format used when a column is declared without one.
    pub fn default_format(self) -> &'static str {
        match self {
            Kind::Integer => "%d",
            Kind::Decimal => "%f",
            Kind::Byte => "%c",
            Kind::String | Kind::Unknown => "%s",
        }
    }

    /// Converts text to this kind's native representation.
    ///
    /// `String` and `Unknown` keep the text as-is. A failed conversion is an
    /// `Invalid` error; callers that tolerate bad numbers fall back to storing
    /// the original text.
    pub fn parse(self, text: &str) -> Result<Value, Error> {
        match self {
            Kind::Integer => text.trim().parse::<i64>().map(Value::Integer).map_err(|err| {
                Error::new(ErrorKind::Invalid)
                    .with_message(format!("'{text}' is not an Integer"))
                    .with_source(err)
            }),
            Kind::Decimal => text.trim().parse::<f64>().map(Value::Decimal).map_err(|err| {
                Error::new(ErrorKind::Invalid)
                    .with_message(format!("'{text}' is not a Decimal"))
                    .with_source(err)
            }),
            Kind::Byte => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Ok(Value::Byte(ch)),
                    _ => Err(Error::new(ErrorKind::Invalid)
                        .with_message(format!("'{text}' is not a single character"))),
                }
            }
            Kind::String | Kind::Unknown => Ok(Value::String(text.to_string())),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "integer" => Ok(Kind::Integer),
            "decimal" => Ok(Kind::Decimal),
            "byte" => Ok(Kind::Byte),
            "string" => Ok(Kind::String),
            "unknown" => Ok(Kind::Unknown),
            _ => Err(Error::new(ErrorKind::Invalid).with_message(format!("unknown kind '{value}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Decimal(f64),
    Byte(char),
    String(String),
}

impl Value {
    /// The stand-in stored wherever a caller hands over "no value".
    pub fn null() -> Self {
        Value::String(NULL_TEXT.to_string())
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Integer(_) => Kind::Integer,
            Value::Decimal(_) => Kind::Decimal,
            Value::Byte(_) => Kind::Byte,
            Value::String(_) => Kind::String,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::String(text) if text == NULL_TEXT)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view used by whole-column arithmetic.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Decimal(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            // Debug output is the shortest text that parses back to the same f64.
            Value::Decimal(value) => write!(f, "{value:?}"),
            Value::Byte(value) => write!(f, "{value}"),
            Value::String(value) => f.write_str(value),
        }
    }
}

macro_rules! value_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Integer(value as i64)
            }
        })*
    };
}

value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Decimal(f64::from(value))
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Byte(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_else(Value::null)
    }
}

/// Row identity. Sorted tables order every integer key before every text key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Key {
    Integer(i64),
    Text(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Integer(value) => write!(f, "{value}"),
            Key::Text(value) => f.write_str(value),
        }
    }
}

macro_rules! key_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Key {
            fn from(value: $ty) -> Self {
                Key::Integer(value as i64)
            }
        })*
    };
}

key_from_int!(i32, i64, u32, usize);

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}
