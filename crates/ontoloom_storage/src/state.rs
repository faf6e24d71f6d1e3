//! Persistent snapshot of every object in memory.
//!
//! `ModelState` is a value: cloning is O(1) through structural sharing, so a
//! command stages its mutations on a clone and the context swaps the clone in
//! only after the store accepted the write.

use std::sync::Arc;

use im::{OrdMap, OrdSet};
use ontoloom_foundation::{ObjectId, Value};
use ontoloom_schema::ObjectModel;

use crate::object::RuntimeObject;

/// One incoming pointer: `owner.reference` holds the indexed object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Incoming {
    /// Object owning the slot.
    pub owner: ObjectId,
    /// Reference name.
    pub reference: String,
}

/// Immutable snapshot of the in-memory object graph.
#[derive(Clone, Debug)]
pub struct ModelState {
    model: Arc<ObjectModel>,
    objects: OrdMap<ObjectId, RuntimeObject>,
    /// Reverse index: target -> every slot pointing at it.
    incoming: OrdMap<ObjectId, OrdSet<Incoming>>,
    version: u64,
}

impl ModelState {
    /// Creates an empty snapshot for `model`.
    #[must_use]
    pub fn new(model: Arc<ObjectModel>) -> Self {
        Self {
            model,
            objects: OrdMap::new(),
            incoming: OrdMap::new(),
            version: 0,
        }
    }

    /// The model every object in this snapshot conforms to.
    #[must_use]
    pub fn model(&self) -> &Arc<ObjectModel> {
        &self.model
    }

    /// Commit counter; bumped once per committed command.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Looks up an object.
    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&RuntimeObject> {
        self.objects.get(id)
    }

    /// Returns true if the object is in memory.
    #[must_use]
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// All objects, ordered by identity.
    pub fn objects(&self) -> impl Iterator<Item = &RuntimeObject> {
        self.objects.values()
    }

    /// Number of objects in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns true if no objects are in memory.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Every slot among in-memory objects that points at `id`.
    #[must_use]
    pub fn incoming(&self, id: &ObjectId) -> Vec<Incoming> {
        self.incoming
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// An empty snapshot of the same model, one version on.
    #[must_use]
    pub fn cleared(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            objects: OrdMap::new(),
            incoming: OrdMap::new(),
            version: self.version + 1,
        }
    }

    pub(crate) fn next_version(mut self) -> Self {
        self.version += 1;
        self
    }

    /// Adds (or replaces) an object and indexes its outgoing pointers.
    pub(crate) fn insert(&mut self, object: RuntimeObject) {
        let id = object.id().clone();
        if self.objects.contains_key(&id) {
            self.remove(&id);
        }
        for (reference, slot) in object.references() {
            for target in slot.targets() {
                self.index(target, &id, reference);
            }
        }
        self.objects.insert(id, object);
    }

    /// Removes an object and its outgoing pointers from the index.
    ///
    /// Pointers *to* the object are left alone; the caller detaches them first.
    pub(crate) fn remove(&mut self, id: &ObjectId) -> Option<RuntimeObject> {
        let object = self.objects.remove(id)?;
        for (reference, slot) in object.references() {
            for target in slot.targets() {
                self.unindex(target, id, reference);
            }
        }
        Some(object)
    }

    /// Sets an attribute on an in-memory object.
    pub(crate) fn set_attribute(&mut self, id: &ObjectId, name: &str, value: Value) {
        if let Some(object) = self.objects.get_mut(id) {
            object.set_attribute(name, value);
        }
    }

    /// Adds `target` to `owner.reference`. Returns the target a mono slot displaced.
    ///
    /// Only the one slot changes; keeping inverses in step is the caller's job.
    pub(crate) fn slot_insert(
        &mut self,
        owner: &ObjectId,
        reference: &str,
        target: &ObjectId,
    ) -> Option<ObjectId> {
        let slot = self.objects.get_mut(owner)?.slot_mut(reference)?;
        if slot.contains(target) {
            return None;
        }
        let displaced = slot.insert(target.clone());
        if let Some(old) = &displaced {
            self.unindex(old, owner, reference);
        }
        self.index(target, owner, reference);
        displaced
    }

    /// Removes `target` from `owner.reference`. Returns whether it was there.
    pub(crate) fn slot_remove(&mut self, owner: &ObjectId, reference: &str, target: &ObjectId) -> bool {
        let removed = self
            .objects
            .get_mut(owner)
            .and_then(|object| object.slot_mut(reference))
            .is_some_and(|slot| slot.remove(target));
        if removed {
            self.unindex(target, owner, reference);
        }
        removed
    }

    fn index(&mut self, target: &ObjectId, owner: &ObjectId, reference: &str) {
        let mut set = self.incoming.get(target).cloned().unwrap_or_default();
        set.insert(Incoming {
            owner: owner.clone(),
            reference: reference.to_string(),
        });
        self.incoming.insert(target.clone(), set);
    }

    fn unindex(&mut self, target: &ObjectId, owner: &ObjectId, reference: &str) {
        let entry = Incoming {
            owner: owner.clone(),
            reference: reference.to_string(),
        };
        let now_empty = match self.incoming.get_mut(target) {
            Some(set) => {
                set.remove(&entry);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.incoming.remove(target);
        }
    }
}

impl PartialEq for ModelState {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
            && self.version == other.version
            && self.objects == other.objects
            && self.incoming == other.incoming
    }
}
