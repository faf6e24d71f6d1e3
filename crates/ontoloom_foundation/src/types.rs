//! Attribute type descriptors and reference multiplicity.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Declared type of an attribute slot.
///
/// Primitive types are spelled the way schema documents spell them
/// (`text`, `int`, `float`, `datetime`, `boolean`, `pos_geo`). Any other name
/// refers to a declared composite.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttributeType {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Int,
    /// 64-bit floating point.
    Float,
    /// Instant in time, stored as UTC.
    DateTime,
    /// `true` or `false`.
    Boolean,
    /// Latitude/longitude pair.
    Geo,
    /// A named composite value shape.
    Composite(String),
}

impl AttributeType {
    /// Resolves a primitive type name. Returns `None` for anything else.
    #[must_use]
    pub fn primitive(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Self::Text),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            "datetime" => Some(Self::DateTime),
            "boolean" => Some(Self::Boolean),
            "pos_geo" => Some(Self::Geo),
            _ => None,
        }
    }

    /// The name a schema document uses for this type.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Int => "int",
            Self::Float => "float",
            Self::DateTime => "datetime",
            Self::Boolean => "boolean",
            Self::Geo => "pos_geo",
            Self::Composite(name) => name,
        }
    }

    /// Returns true for every type except composites.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        !matches!(self, Self::Composite(_))
    }
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Cardinality of a reference slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Multiplicity {
    /// At most one target.
    Mono,
    /// A set of targets.
    Multi,
}

impl Multiplicity {
    /// Parses `mono` or `multi`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "mono" => Some(Self::Mono),
            "multi" => Some(Self::Multi),
            _ => None,
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mono => f.write_str("mono"),
            Self::Multi => f.write_str("multi"),
        }
    }
}
