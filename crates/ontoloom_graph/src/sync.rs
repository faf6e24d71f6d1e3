//! Mapping between runtime objects and the graph store.
//!
//! Each object is a node labelled with its class name and identified by its
//! key. Node properties are the attribute values plus the reserved `key` and
//! `collection` properties. Each reference value is an edge labelled with the
//! upper-cased reference name.
//!
//! An inverse pair is one logical edge and is stored once, under the
//! lexicographically smaller of the two reference names. For a reference that
//! is its own inverse the edge runs from the smaller object identity to the
//! larger. Loading reads both directions back from that one edge.

use std::sync::Arc;

use ontoloom_foundation::{Error, ObjectId, Result, Value};
use ontoloom_schema::{ObjectModel, ReferenceSlot, TypeDescriptor};
use ontoloom_storage::{Change, ModelState, ObjectSource, RuntimeObject};
use tracing::{debug, info};

use crate::driver::{GraphDriver, GraphOp, NodeKey, Properties, StoredEdge};

/// Reserved property holding the key value.
pub const KEY_PROPERTY: &str = "key";
/// Reserved property holding the collection name.
pub const COLLECTION_PROPERTY: &str = "collection";

/// The node key for an object.
#[must_use]
pub fn node_key(id: &ObjectId) -> NodeKey {
    NodeKey::new(id.class.as_ref(), id.key.as_ref())
}

/// The edge label for a reference name.
#[must_use]
pub fn edge_label(reference: &str) -> String {
    reference.to_uppercase()
}

/// The stored edge for `owner.slot -> target`.
#[must_use]
pub fn canonical_edge(owner: &ObjectId, slot: &ReferenceSlot, target: &ObjectId) -> StoredEdge {
    let (from, label, to) = match slot.inverse.as_deref() {
        Some(inverse) if inverse == slot.name && target < owner => (target, inverse, owner),
        Some(inverse) if inverse < slot.name.as_str() => (target, inverse, owner),
        _ => (owner, slot.name.as_str(), target),
    };
    StoredEdge {
        from: node_key(from),
        label: edge_label(label),
        to: node_key(to),
    }
}

/// The property map stored for an object.
#[must_use]
pub fn properties(object: &RuntimeObject) -> Properties {
    let mut properties: Properties = object
        .attributes()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();
    properties.insert(KEY_PROPERTY.to_string(), Value::Text(object.key().to_string()));
    properties.insert(
        COLLECTION_PROPERTY.to_string(),
        Value::Text(object.descriptor().collection.clone()),
    );
    properties
}

/// Persists and hydrates objects through a [`GraphDriver`].
#[derive(Clone)]
pub struct GraphSync {
    driver: Arc<dyn GraphDriver>,
}

impl GraphSync {
    /// Wraps a driver.
    #[must_use]
    pub fn new(driver: Arc<dyn GraphDriver>) -> Self {
        Self { driver }
    }

    /// The underlying driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn GraphDriver> {
        &self.driver
    }

    /// Upserts an object's node and attributes. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn persist(&self, object: &RuntimeObject) -> Result<()> {
        self.driver.upsert_node(node_key(object.id()), properties(object))
    }

    /// Stores the edge for `owner.slot -> target`. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a store error, including a constraint violation if either
    /// endpoint is missing.
    pub fn persist_link(&self, owner: &ObjectId, slot: &ReferenceSlot, target: &ObjectId) -> Result<()> {
        self.driver.upsert_edge(canonical_edge(owner, slot, target))
    }

    /// Removes the edge for `owner.slot -> target` if present.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub fn persist_unlink(&self, owner: &ObjectId, slot: &ReferenceSlot, target: &ObjectId) -> Result<()> {
        self.driver.delete_edge(canonical_edge(owner, slot, target))
    }

    /// Hydrates an object with its attributes and direct reference slots.
    /// Referenced objects are not loaded.
    ///
    /// # Errors
    ///
    /// Returns a store error, or an error if the stored node does not match
    /// the class descriptor. Edges written for another class's reference of
    /// the same name are ignored.
    pub fn load(&self, model: &ObjectModel, id: &ObjectId) -> Result<Option<RuntimeObject>> {
        let Some(descriptor) = model.get(&id.class) else {
            return Ok(None);
        };
        let key = node_key(id);
        let Some(node) = self.driver.node(&key)? else {
            return Ok(None);
        };
        let attributes = node
            .properties
            .into_iter()
            .filter(|(name, _)| name != KEY_PROPERTY && name != COLLECTION_PROPERTY);
        let mut references = Vec::with_capacity(descriptor.references.len());
        for slot in &descriptor.references {
            references.push((slot.name.clone(), self.targets(model, descriptor, &key, slot)?));
        }
        RuntimeObject::hydrate(Arc::clone(descriptor), &id.key, attributes, references).map(Some)
    }

    fn targets(
        &self,
        model: &ObjectModel,
        owner: &TypeDescriptor,
        key: &NodeKey,
        slot: &ReferenceSlot,
    ) -> Result<Vec<ObjectId>> {
        let outgoing = |label: &str| -> Result<Vec<NodeKey>> {
            Ok(self.driver.edges_from(key, label)?.into_iter().map(|e| e.to).collect())
        };
        let incoming = |label: &str| -> Result<Vec<NodeKey>> {
            Ok(self.driver.edges_to(key, label)?.into_iter().map(|e| e.from).collect())
        };
        // Incoming edges are stored under the far side's reference name.
        // Other classes may declare a reference with that name too, so only
        // edges whose source declares this pair count.
        let (nodes, stored_by) = match slot.inverse.as_deref() {
            Some(inverse) if inverse == slot.name => {
                let label = edge_label(&slot.name);
                let mut nodes = outgoing(&label)?;
                nodes.extend(incoming(&label)?);
                (nodes, Some(inverse))
            }
            Some(inverse) if inverse < slot.name.as_str() => (incoming(&edge_label(inverse))?, Some(inverse)),
            _ => (outgoing(&edge_label(&slot.name))?, None),
        };
        let mut targets: Vec<ObjectId> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = ObjectId::new(node.label.as_str(), node.key.as_str());
            let belongs = model.is_assignable(&id.class, &slot.target)
                && stored_by.is_none_or(|inverse| declares_pair(model, &id.class, inverse, owner, slot));
            if !belongs {
                debug!(owner = %owner.name, reference = %slot.name, other = %id, "skipping edge of another reference");
                continue;
            }
            if !targets.contains(&id) {
                targets.push(id);
            }
        }
        Ok(targets)
    }

    /// Translates a command's changes into one atomic batch.
    ///
    /// Node properties come from `state`, the snapshot after the changes.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a change names a class the model does not
    /// know.
    pub fn batch(&self, changes: &[Change], state: &ModelState) -> Result<Vec<GraphOp>> {
        let model = state.model();
        let mut batch = Vec::with_capacity(changes.len());
        for change in changes {
            match change {
                Change::Create(id) | Change::Upsert(id) => {
                    let Some(object) = state.get(id) else {
                        continue;
                    };
                    let (id, properties) = (node_key(id), properties(object));
                    batch.push(if matches!(change, Change::Create(_)) {
                        GraphOp::CreateNode { id, properties }
                    } else {
                        GraphOp::UpsertNode { id, properties }
                    });
                }
                Change::Delete(id) => batch.push(GraphOp::DeleteNode(node_key(id))),
                Change::Link {
                    owner,
                    reference,
                    target,
                } => {
                    let slot = reference_slot(model, owner, reference)?;
                    batch.push(GraphOp::UpsertEdge(canonical_edge(owner, slot, target)));
                }
                Change::Unlink {
                    owner,
                    reference,
                    target,
                } => {
                    let slot = reference_slot(model, owner, reference)?;
                    batch.push(GraphOp::DeleteEdge(canonical_edge(owner, slot, target)));
                }
            }
        }
        Ok(batch)
    }

    /// Writes a command's changes through to the store as one batch.
    ///
    /// # Errors
    ///
    /// Returns a store error; nothing was written when this fails.
    pub fn write_through(&self, changes: &[Change], state: &ModelState) -> Result<()> {
        let batch = self.batch(changes, state)?;
        if batch.is_empty() {
            return Ok(());
        }
        self.driver.execute(&batch)?;
        debug!(ops = batch.len(), "wrote changes through");
        Ok(())
    }

    /// Removes everything from the store.
    ///
    /// # Errors
    ///
    /// Returns a store error; the store is unchanged when this fails.
    pub fn wipe(&self) -> Result<()> {
        self.driver.execute(&[GraphOp::Clear])?;
        info!("wiped graph store");
        Ok(())
    }

    /// Creates the key and attribute indexes for `model` and records its
    /// fingerprint as the schema marker, in one batch.
    ///
    /// # Errors
    ///
    /// Returns a store error; neither indexes nor marker exist when this
    /// fails on a fresh store.
    pub fn initialize_schema(&self, model: &ObjectModel) -> Result<()> {
        let mut batch: Vec<GraphOp> = model
            .indexes()
            .into_iter()
            .map(|(label, property)| GraphOp::CreateIndex { label, property })
            .collect();
        let indexes = batch.len();
        batch.push(GraphOp::SetSchemaMarker(Some(model.fingerprint())));
        self.driver.execute(&batch)?;
        info!(indexes, "initialized graph schema");
        Ok(())
    }
}

impl ObjectSource for GraphSync {
    fn fetch(&self, model: &Arc<ObjectModel>, id: &ObjectId) -> Result<Option<RuntimeObject>> {
        self.load(model, id)
    }
}

/// Whether `class.inverse` is the reciprocal of `owner.slot`.
fn declares_pair(model: &ObjectModel, class: &str, inverse: &str, owner: &TypeDescriptor, slot: &ReferenceSlot) -> bool {
    model
        .get(class)
        .and_then(|descriptor| descriptor.reference(inverse))
        .is_some_and(|reciprocal| {
            reciprocal.inverse.as_deref() == Some(slot.name.as_str())
                && model.is_assignable(&owner.name, &reciprocal.target)
        })
}

fn reference_slot<'m>(model: &'m ObjectModel, owner: &ObjectId, reference: &str) -> Result<&'m ReferenceSlot> {
    model
        .get(&owner.class)
        .and_then(|descriptor| descriptor.reference(reference))
        .ok_or_else(|| Error::internal(format!("no reference {reference} on {}", owner.class)))
}
