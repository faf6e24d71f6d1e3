//! Runtime objects and their reference slots.

use std::sync::Arc;

use im::{OrdMap, Vector};
use ontoloom_foundation::{Error, Multiplicity, ObjectId, ReferenceError, Result, Value};
use ontoloom_schema::TypeDescriptor;

/// Contents of one reference slot.
///
/// Multi slots keep insertion order so enumeration is deterministic; the
/// order carries no meaning beyond that.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefSlot {
    /// At most one target.
    Mono(Option<ObjectId>),
    /// A duplicate-free sequence of targets.
    Multi(Vector<ObjectId>),
}

impl RefSlot {
    /// An empty slot of the given multiplicity.
    #[must_use]
    pub fn empty(multiplicity: Multiplicity) -> Self {
        match multiplicity {
            Multiplicity::Mono => Self::Mono(None),
            Multiplicity::Multi => Self::Multi(Vector::new()),
        }
    }

    /// Iterates over the targets.
    pub fn targets(&self) -> impl Iterator<Item = &ObjectId> {
        let (mono, multi) = match self {
            Self::Mono(target) => (target.as_ref(), None),
            Self::Multi(targets) => (None, Some(targets.iter())),
        };
        mono.into_iter().chain(multi.into_iter().flatten())
    }

    /// Returns true if `id` is a target.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        match self {
            Self::Mono(target) => target.as_ref() == Some(id),
            Self::Multi(targets) => targets.contains(id),
        }
    }

    /// Number of targets.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Mono(target) => usize::from(target.is_some()),
            Self::Multi(targets) => targets.len(),
        }
    }

    /// Returns true if there are no targets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a target. A mono slot gives back the target it displaced.
    pub(crate) fn insert(&mut self, id: ObjectId) -> Option<ObjectId> {
        match self {
            Self::Mono(target) => {
                let old = target.replace(id);
                old.filter(|old| Some(old) != target.as_ref())
            }
            Self::Multi(targets) => {
                if !targets.contains(&id) {
                    targets.push_back(id);
                }
                None
            }
        }
    }

    /// Removes a target. Returns whether it was present.
    pub(crate) fn remove(&mut self, id: &ObjectId) -> bool {
        match self {
            Self::Mono(target) if target.as_ref() == Some(id) => {
                *target = None;
                true
            }
            Self::Mono(_) => false,
            Self::Multi(targets) => match targets.index_of(id) {
                Some(index) => {
                    targets.remove(index);
                    true
                }
                None => false,
            },
        }
    }
}

/// An instance of a concrete class.
///
/// Identity is the class plus the key attribute value. Attribute and
/// reference slots change only through [`WorkingSet`](crate::WorkingSet), which
/// keeps inverse pairs symmetric.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeObject {
    id: ObjectId,
    descriptor: Arc<TypeDescriptor>,
    attributes: OrdMap<String, Value>,
    references: OrdMap<String, RefSlot>,
}

impl RuntimeObject {
    /// Creates an object holding only its key attribute and empty reference slots.
    #[must_use]
    pub fn new(descriptor: Arc<TypeDescriptor>, key: &str) -> Self {
        let id = ObjectId::new(descriptor.name.as_str(), key);
        let mut attributes = OrdMap::new();
        attributes.insert(descriptor.key().name.clone(), Value::Text(key.to_string()));
        let references = descriptor
            .references
            .iter()
            .map(|slot| (slot.name.clone(), RefSlot::empty(slot.multiplicity)))
            .collect();
        Self {
            id,
            descriptor,
            attributes,
            references,
        }
    }

    /// Rebuilds an object from stored attribute values and reference targets.
    ///
    /// Unknown attribute names and values that do not fit their declared type
    /// are rejected, as are unknown reference names and more than one target
    /// in a mono slot.
    ///
    /// # Errors
    ///
    /// Returns the corresponding not-found, attribute, or reference error.
    pub fn hydrate(
        descriptor: Arc<TypeDescriptor>,
        key: &str,
        attributes: impl IntoIterator<Item = (String, Value)>,
        references: impl IntoIterator<Item = (String, Vec<ObjectId>)>,
    ) -> Result<Self> {
        let mut object = Self::new(descriptor, key);
        for (name, value) in attributes {
            let slot = object
                .descriptor
                .attribute(&name)
                .ok_or_else(|| Error::unknown_attribute(&object.descriptor.name, &name))?;
            if slot.is_key {
                continue;
            }
            if !value.fits(&slot.ty) {
                return Err(Error::internal(format!(
                    "stored value {value} does not fit {}.{name} ({})",
                    object.descriptor.name, slot.ty
                )));
            }
            object.attributes.insert(name, value);
        }
        for (name, targets) in references {
            let Some(slot) = object.references.get_mut(&name) else {
                return Err(ReferenceError::UnknownReference {
                    class: object.descriptor.name.clone(),
                    reference: name,
                }
                .into());
            };
            if matches!(slot, RefSlot::Mono(_)) && targets.len() > 1 {
                return Err(ReferenceError::MultiplicityViolation {
                    owner: object.id.clone(),
                    reference: name,
                    found: targets.len(),
                }
                .into());
            }
            for target in targets {
                slot.insert(target);
            }
        }
        Ok(object)
    }

    /// This object's identity.
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// The class descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// The key attribute value.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.id.key
    }

    /// The value of an attribute, if set.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Set attributes in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.descriptor
            .attributes
            .iter()
            .filter_map(|slot| Some((slot.name.as_str(), self.attributes.get(&slot.name)?)))
    }

    /// The contents of a reference slot.
    #[must_use]
    pub fn reference(&self, name: &str) -> Option<&RefSlot> {
        self.references.get(name)
    }

    /// Reference slots in declaration order.
    pub fn references(&self) -> impl Iterator<Item = (&str, &RefSlot)> {
        self.descriptor
            .references
            .iter()
            .filter_map(|slot| Some((slot.name.as_str(), self.references.get(&slot.name)?)))
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: Value) {
        self.attributes.insert(name.to_string(), value);
    }

    pub(crate) fn slot_mut(&mut self, name: &str) -> Option<&mut RefSlot> {
        self.references.get_mut(name)
    }
}
