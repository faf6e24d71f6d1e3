//! Reference integrity engine.
//!
//! All reference-slot mutation goes through [`WorkingSet`]. It stages every
//! change on a private copy of a [`ModelState`], keeps inverse pairs
//! symmetric, and records a logical [`Change`] list for write-through. A
//! failed operation leaves the objects it was asked about untouched; the
//! caller discards the whole working set on any error.

use std::collections::BTreeSet;
use std::sync::Arc;

use ontoloom_foundation::{
    AttributeError, AttributeType, Error, ObjectId, ParseValueError, ReferenceError, Result, Value,
};
use ontoloom_schema::{ObjectModel, ReferenceSlot, TypeDescriptor};
use tracing::warn;

use crate::object::{RefSlot, RuntimeObject};
use crate::state::ModelState;

/// Supplies objects that are not in memory yet, typically from the store.
pub trait ObjectSource {
    /// Loads an object with its attributes and direct reference slots.
    ///
    /// # Errors
    ///
    /// Returns an error if the source itself fails. A missing object is
    /// `Ok(None)`.
    fn fetch(&self, model: &Arc<ObjectModel>, id: &ObjectId) -> Result<Option<RuntimeObject>>;
}

/// A source with nothing in it; every object must already be in memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl ObjectSource for Detached {
    fn fetch(&self, _model: &Arc<ObjectModel>, _id: &ObjectId) -> Result<Option<RuntimeObject>> {
        Ok(None)
    }
}

/// One logical mutation, in the order it happened.
///
/// An inverse pair is one logical edge and is recorded once, from the side
/// the operation named.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    /// The object was created.
    Create(ObjectId),
    /// An attribute changed.
    Upsert(ObjectId),
    /// The object was deleted.
    Delete(ObjectId),
    /// `owner.reference` gained `target`.
    Link {
        /// Slot owner.
        owner: ObjectId,
        /// Reference name.
        reference: String,
        /// New target.
        target: ObjectId,
    },
    /// `owner.reference` lost `target`.
    Unlink {
        /// Slot owner.
        owner: ObjectId,
        /// Reference name.
        reference: String,
        /// Removed target.
        target: ObjectId,
    },
}

/// Result of a completed working set.
#[derive(Clone, Debug)]
pub struct Delta {
    /// The staged snapshot, version bumped if anything changed.
    pub state: ModelState,
    /// Logical changes in order.
    pub changes: Vec<Change>,
    /// Objects created, updated, or whose reference slots changed, still
    /// present.
    pub affected: Vec<ObjectId>,
    /// Objects deleted.
    pub deleted: Vec<ObjectId>,
}

impl Delta {
    /// Returns true if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Staged mutations over a snapshot.
pub struct WorkingSet<'a> {
    state: ModelState,
    source: &'a dyn ObjectSource,
    changes: Vec<Change>,
    /// Objects whose required references must hold at `finish`.
    touched: BTreeSet<ObjectId>,
    /// Every object that changed, including partners a delete detached.
    modified: BTreeSet<ObjectId>,
    deleted: BTreeSet<ObjectId>,
}

impl<'a> WorkingSet<'a> {
    /// Starts staging on a copy of `state`.
    #[must_use]
    pub fn new(state: &ModelState, source: &'a dyn ObjectSource) -> Self {
        Self {
            state: state.clone(),
            source,
            changes: Vec::new(),
            touched: BTreeSet::new(),
            modified: BTreeSet::new(),
            deleted: BTreeSet::new(),
        }
    }

    /// The staged snapshot.
    #[must_use]
    pub fn state(&self) -> &ModelState {
        &self.state
    }

    fn model(&self) -> Arc<ObjectModel> {
        Arc::clone(self.state.model())
    }

    /// Finds an object in memory or faults it in from the source.
    ///
    /// Faulted-in objects join the staged snapshot without being recorded as
    /// changes.
    ///
    /// # Errors
    ///
    /// Propagates source failures.
    pub fn lookup(&mut self, id: &ObjectId) -> Result<Option<&RuntimeObject>> {
        if self.deleted.contains(id) {
            return Ok(None);
        }
        if !self.state.contains(id) {
            let model = self.model();
            if model.get(&id.class).is_none() {
                return Ok(None);
            }
            match self.source.fetch(&model, id)? {
                Some(object) => self.state.insert(object),
                None => return Ok(None),
            }
        }
        Ok(self.state.get(id))
    }

    /// Like [`lookup`](Self::lookup), but a missing object is an error.
    ///
    /// # Errors
    ///
    /// Returns an unknown object error, or propagates source failures.
    pub fn resolve(&mut self, id: &ObjectId) -> Result<&RuntimeObject> {
        self.lookup(id)?
            .ok_or_else(|| Error::unknown_object(id.clone()))
    }

    fn descriptor_of(&mut self, id: &ObjectId) -> Result<Arc<TypeDescriptor>> {
        Ok(Arc::clone(self.resolve(id)?.descriptor()))
    }

    /// Creates an object with the given attribute values.
    ///
    /// # Errors
    ///
    /// - unknown class, or unknown attribute name
    /// - constraint violation if the identity exists in memory or the source
    /// - attribute errors for mistyped values, a key value that disagrees
    ///   with `key`, or a missing required attribute
    pub fn create(&mut self, class: &str, key: &str, attributes: Vec<(String, Value)>) -> Result<ObjectId> {
        let model = self.model();
        let descriptor = Arc::clone(model.descriptor(class)?);
        let id = ObjectId::new(class, key);
        if key.is_empty() {
            return Err(AttributeError::MissingRequired {
                object: id,
                attribute: descriptor.key().name.clone(),
            }
            .into());
        }
        if self.lookup(&id)?.is_some() {
            return Err(Error::constraint_violation(format!("{id} already exists")));
        }

        let mut object = RuntimeObject::new(Arc::clone(&descriptor), key);
        for (name, value) in attributes {
            let slot = descriptor.attribute(&name).ok_or_else(|| {
                if descriptor.reference(&name).is_some() {
                    Error::from(AttributeError::NotAnAttribute {
                        class: class.to_string(),
                        name: name.clone(),
                    })
                } else {
                    Error::unknown_attribute(class, &name)
                }
            })?;
            check_fits(&name, &slot.ty, &value)?;
            if slot.is_key {
                if value.as_text() != Some(key) {
                    return Err(AttributeError::KeyMismatch {
                        class: class.to_string(),
                        key: key.to_string(),
                        given: value.to_string(),
                    }
                    .into());
                }
                continue;
            }
            object.set_attribute(&name, value);
        }
        if let Some(missing) = descriptor
            .attributes
            .iter()
            .find(|slot| slot.required && object.attribute(&slot.name).is_none())
        {
            return Err(AttributeError::MissingRequired {
                object: id,
                attribute: missing.name.clone(),
            }
            .into());
        }

        self.state.insert(object);
        self.touch(&id);
        self.changes.push(Change::Create(id.clone()));
        Ok(id)
    }

    /// Sets one attribute on an existing object.
    ///
    /// # Errors
    ///
    /// Unknown object or attribute, an attempt to change the key, a reference
    /// name, or a mistyped value.
    pub fn set_attribute(&mut self, id: &ObjectId, name: &str, value: Value) -> Result<()> {
        let descriptor = self.descriptor_of(id)?;
        let Some(slot) = descriptor.attribute(name) else {
            if descriptor.reference(name).is_some() {
                return Err(AttributeError::NotAnAttribute {
                    class: descriptor.name.clone(),
                    name: name.to_string(),
                }
                .into());
            }
            return Err(Error::unknown_attribute(&descriptor.name, name));
        };
        if slot.is_key {
            return Err(AttributeError::KeyImmutable {
                object: id.clone(),
                attribute: name.to_string(),
            }
            .into());
        }
        check_fits(name, &slot.ty, &value)?;
        self.state.set_attribute(id, name, value);
        self.touch(id);
        self.changes.push(Change::Upsert(id.clone()));
        Ok(())
    }

    /// Adds `target` to `owner.reference`, and `owner` to the target's
    /// inverse slot if one is declared.
    ///
    /// A mono slot on either side displaces its previous target, detaching
    /// that target's inverse first. Displaced partners are checked for
    /// required references like the two named objects. Linking an existing
    /// pair is a no-op.
    ///
    /// # Errors
    ///
    /// Unknown objects, [`ReferenceError::UnknownReference`], or
    /// [`ReferenceError::TypeMismatch`]. Nothing is mutated on error.
    pub fn link(&mut self, owner: &ObjectId, reference: &str, target: &ObjectId) -> Result<()> {
        let model = self.model();
        let owner_type = self.descriptor_of(owner)?;
        let slot = reference_slot(&owner_type, reference)?.clone();
        let target_type = self.descriptor_of(target)?;
        if !target_type.is_a(&slot.target) {
            return Err(ReferenceError::TypeMismatch {
                owner: owner.clone(),
                reference: reference.to_string(),
                target: target.clone(),
                expected: slot.target.clone(),
            }
            .into());
        }
        let inverse = match &slot.inverse {
            Some(name) => {
                let inverse = reference_slot(&target_type, name)?.clone();
                if !model.is_assignable(&owner.class, &inverse.target) {
                    return Err(ReferenceError::TypeMismatch {
                        owner: target.clone(),
                        reference: name.clone(),
                        target: owner.clone(),
                        expected: inverse.target.clone(),
                    }
                    .into());
                }
                Some(inverse)
            }
            None => None,
        };

        if self.slot(owner, reference)?.contains(target) {
            return Ok(());
        }
        self.touch(owner);
        self.touch(target);

        // Make room in mono slots before adding, so every displaced partner
        // loses its side of the pair too.
        if !slot.is_multi() {
            if let Some(old) = self.mono_target(owner, reference)? {
                self.detach_pair(owner, &slot, &old)?;
                if slot.inverse.is_some() {
                    self.touch(&old);
                }
            }
        }
        if let Some(inverse) = &inverse {
            if !inverse.is_multi() {
                if let Some(old) = self.mono_target(target, &inverse.name)? {
                    if &old != owner {
                        self.detach_pair(target, inverse, &old)?;
                        self.touch(&old);
                    }
                }
            }
        }

        self.state.slot_insert(owner, reference, target);
        if let Some(inverse) = &inverse {
            self.state.slot_insert(target, &inverse.name, owner);
        }
        self.changes.push(Change::Link {
            owner: owner.clone(),
            reference: reference.to_string(),
            target: target.clone(),
        });
        Ok(())
    }

    /// Removes `target` from `owner.reference`, and `owner` from the target's
    /// inverse slot. Removing a link that does not exist is a no-op.
    ///
    /// # Errors
    ///
    /// Unknown owner or [`ReferenceError::UnknownReference`].
    pub fn unlink(&mut self, owner: &ObjectId, reference: &str, target: &ObjectId) -> Result<()> {
        let owner_type = self.descriptor_of(owner)?;
        let slot = reference_slot(&owner_type, reference)?.clone();
        if !self.slot(owner, reference)?.contains(target) {
            return Ok(());
        }
        self.touch(owner);
        if self.lookup(target)?.is_some() {
            self.touch(target);
        }
        self.detach_pair(owner, &slot, target)
    }

    /// Removes every pointer to `id` from in-memory objects, and every
    /// pointer `id` holds.
    ///
    /// Objects whose required slots this empties are logged, not rejected,
    /// but still reported as affected.
    ///
    /// # Errors
    ///
    /// Unknown object, or source failures while faulting in inverse partners.
    pub fn detach_all(&mut self, id: &ObjectId) -> Result<()> {
        self.resolve(id)?;
        for incoming in self.state.incoming(id) {
            let Some(owner) = self.state.get(&incoming.owner) else {
                continue;
            };
            let Some(slot) = owner.descriptor().reference(&incoming.reference).cloned() else {
                continue;
            };
            self.detach_pair(&incoming.owner, &slot, id)?;
            self.warn_if_required_emptied(&incoming.owner, &slot);
        }

        let Some(object) = self.state.get(id) else {
            return Ok(());
        };
        let outgoing: Vec<(ReferenceSlot, ObjectId)> = object
            .references()
            .filter_map(|(name, refs)| {
                let slot = object.descriptor().reference(name)?.clone();
                Some(refs.targets().map(move |t| (slot.clone(), t.clone())))
            })
            .flatten()
            .collect();
        for (slot, target) in outgoing {
            self.detach_pair(id, &slot, &target)?;
            if let Some(inverse) = &slot.inverse {
                if let Some(partner) = self.state.get(&target) {
                    if let Some(inverse_slot) = partner.descriptor().reference(inverse).cloned() {
                        self.warn_if_required_emptied(&target, &inverse_slot);
                    }
                }
            }
        }
        Ok(())
    }

    /// Detaches and removes an object. Never cascades.
    ///
    /// # Errors
    ///
    /// Unknown object, or source failures.
    pub fn delete(&mut self, id: &ObjectId) -> Result<()> {
        self.detach_all(id)?;
        self.state.remove(id);
        self.touched.remove(id);
        self.modified.remove(id);
        self.deleted.insert(id.clone());
        self.changes.push(Change::Delete(id.clone()));
        Ok(())
    }

    /// Checks that every required reference slot of every touched object is
    /// non-empty.
    ///
    /// # Errors
    ///
    /// [`ReferenceError::MultiplicityViolation`] naming the first empty slot.
    pub fn check_required(&self) -> Result<()> {
        for id in &self.touched {
            let Some(object) = self.state.get(id) else {
                continue;
            };
            for slot in &object.descriptor().references {
                if slot.required && object.reference(&slot.name).is_none_or(RefSlot::is_empty) {
                    return Err(ReferenceError::MultiplicityViolation {
                        owner: id.clone(),
                        reference: slot.name.clone(),
                        found: 0,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Validates required references and hands back the staged result.
    ///
    /// # Errors
    ///
    /// See [`check_required`](Self::check_required).
    pub fn finish(self) -> Result<Delta> {
        self.check_required()?;
        let affected: Vec<ObjectId> = self
            .modified
            .iter()
            .filter(|id| self.state.contains(id))
            .cloned()
            .collect();
        let state = if self.changes.is_empty() {
            self.state
        } else {
            self.state.next_version()
        };
        Ok(Delta {
            state,
            changes: self.changes,
            affected,
            deleted: self.deleted.into_iter().collect(),
        })
    }

    fn touch(&mut self, id: &ObjectId) {
        self.touched.insert(id.clone());
        self.modified.insert(id.clone());
    }

    fn slot(&mut self, owner: &ObjectId, reference: &str) -> Result<RefSlot> {
        let object = self.resolve(owner)?;
        object.reference(reference).cloned().ok_or_else(|| {
            ReferenceError::UnknownReference {
                class: owner.class.to_string(),
                reference: reference.to_string(),
            }
            .into()
        })
    }

    fn mono_target(&mut self, owner: &ObjectId, reference: &str) -> Result<Option<ObjectId>> {
        Ok(match self.slot(owner, reference)? {
            RefSlot::Mono(target) => target,
            RefSlot::Multi(_) => None,
        })
    }

    /// Removes one logical edge: `target` from `owner.slot`, and `owner`
    /// from the target's inverse slot when the target is loadable.
    fn detach_pair(&mut self, owner: &ObjectId, slot: &ReferenceSlot, target: &ObjectId) -> Result<()> {
        if !self.state.slot_remove(owner, &slot.name, target) {
            return Ok(());
        }
        self.modified.insert(owner.clone());
        if let Some(inverse) = &slot.inverse {
            if self.lookup(target)?.is_some() && self.state.slot_remove(target, inverse, owner) {
                self.modified.insert(target.clone());
            }
        }
        self.changes.push(Change::Unlink {
            owner: owner.clone(),
            reference: slot.name.clone(),
            target: target.clone(),
        });
        Ok(())
    }

    fn warn_if_required_emptied(&self, owner: &ObjectId, slot: &ReferenceSlot) {
        if !slot.required {
            return;
        }
        let empty = self
            .state
            .get(owner)
            .and_then(|o| o.reference(&slot.name))
            .is_none_or(RefSlot::is_empty);
        if empty {
            warn!(object = %owner, reference = %slot.name, "delete left a required reference empty");
        }
    }
}

fn check_fits(attribute: &str, ty: &AttributeType, value: &Value) -> Result<()> {
    if value.fits(ty) {
        return Ok(());
    }
    Err(AttributeError::InvalidValue {
        attribute: attribute.to_string(),
        error: ParseValueError {
            expected: ty.clone(),
            raw: value.to_string(),
        },
    }
    .into())
}

fn reference_slot<'d>(descriptor: &'d TypeDescriptor, name: &str) -> Result<&'d ReferenceSlot> {
    descriptor.reference(name).ok_or_else(|| {
        ReferenceError::UnknownReference {
            class: descriptor.name.clone(),
            reference: name.to_string(),
        }
        .into()
    })
}
