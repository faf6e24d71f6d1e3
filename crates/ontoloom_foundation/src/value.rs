//! Typed attribute values.
//!
//! Values are parsed from command literals against a declared
//! [`AttributeType`] and rendered back in the same literal syntax, so a value
//! printed by `get` can be pasted into a `set` command unchanged.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::types::AttributeType;

/// A single attribute value.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    /// UTF-8 text.
    Text(String),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Latitude/longitude in degrees.
    Geo {
        /// Latitude, -90..=90.
        lat: f64,
        /// Longitude, -180..=180.
        lon: f64,
    },
    /// Composite value: field name to primitive value.
    Composite(BTreeMap<String, Value>),
}

/// A literal that does not parse as the expected type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("expected {expected}, got {raw:?}")]
pub struct ParseValueError {
    /// The declared type.
    pub expected: AttributeType,
    /// The literal as given.
    pub raw: String,
}

impl Value {
    /// Parses a literal as a primitive type.
    ///
    /// Composite literals need the composite's field table, which lives in the
    /// schema layer; see [`Value::composite_fields`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseValueError`] if `raw` is not a valid literal of `ty`, or
    /// if `ty` is a composite.
    pub fn parse_primitive(ty: &AttributeType, raw: &str) -> Result<Self, ParseValueError> {
        let fail = || ParseValueError {
            expected: ty.clone(),
            raw: raw.to_string(),
        };
        match ty {
            AttributeType::Text => Ok(Self::Text(raw.to_string())),
            AttributeType::Int => raw.trim().parse().map(Self::Int).map_err(|_| fail()),
            AttributeType::Float => match raw.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(Self::Float(f)),
                _ => Err(fail()),
            },
            AttributeType::Boolean => match raw.trim() {
                "true" => Ok(Self::Boolean(true)),
                "false" => Ok(Self::Boolean(false)),
                _ => Err(fail()),
            },
            AttributeType::DateTime => parse_datetime(raw.trim()).map(Self::DateTime).ok_or_else(fail),
            AttributeType::Geo => parse_geo(raw).ok_or_else(fail),
            AttributeType::Composite(_) => Err(fail()),
        }
    }

    /// Splits a composite literal `{name=value;name=value}` into its fields.
    ///
    /// Returns `None` if the braces are missing or a field has no `=`.
    #[must_use]
    pub fn composite_fields(raw: &str) -> Option<Vec<(&str, &str)>> {
        let inner = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
        if inner.trim().is_empty() {
            return Some(Vec::new());
        }
        inner
            .split(';')
            .map(|field| {
                let (name, value) = field.split_once('=')?;
                Some((name.trim(), value.trim()))
            })
            .collect()
    }

    /// Returns true if this value can occupy a slot of type `ty`.
    #[must_use]
    pub fn fits(&self, ty: &AttributeType) -> bool {
        matches!(
            (self, ty),
            (Self::Text(_), AttributeType::Text)
                | (Self::Int(_), AttributeType::Int)
                | (Self::Float(_), AttributeType::Float)
                | (Self::Boolean(_), AttributeType::Boolean)
                | (Self::DateTime(_), AttributeType::DateTime)
                | (Self::Geo { .. }, AttributeType::Geo)
                | (Self::Composite(_), AttributeType::Composite(_))
        )
    }

    /// Returns the text content if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?))
}

fn parse_geo(raw: &str) -> Option<Value> {
    let (lat, lon) = raw.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }
    Some(Value::Geo { lat, lon })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Secs, true)),
            Self::Geo { lat, lon } => write!(f, "{lat},{lon}"),
            Self::Composite(fields) => {
                f.write_str("{")?;
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write!(f, "{name}={value}")?;
                }
                f.write_str("}")
            }
        }
    }
}
