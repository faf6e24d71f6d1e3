//! Object identity.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of a runtime object: its concrete class and key attribute value.
///
/// Identities are globally unique across the model. Reference slots hold
/// `ObjectId`s rather than handles, so cyclic object graphs need no shared
/// ownership.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ObjectId {
    /// Concrete class name.
    pub class: Arc<str>,
    /// Key attribute value.
    pub key: Arc<str>,
}

impl ObjectId {
    /// Creates a new identifier.
    #[must_use]
    pub fn new(class: impl Into<Arc<str>>, key: impl Into<Arc<str>>) -> Self {
        Self {
            class: class.into(),
            key: key.into(),
        }
    }

    /// Parses the `Class:key` form produced by [`Display`](fmt::Display).
    ///
    /// Class names never contain `:`, so the split happens at the first one.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let (class, key) = text.split_once(':')?;
        if class.is_empty() || key.is_empty() {
            return None;
        }
        Some(Self::new(class, key))
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}:{})", self.class, self.key)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class, self.key)
    }
}
