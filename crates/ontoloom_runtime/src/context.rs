//! The active model and its object snapshot.
//!
//! [`ModelContext`] owns the single writer region: every mutating command and
//! every administrative operation holds the write lock from staging until the
//! store has accepted the write. Readers see the last committed snapshot.

use std::path::Path;
use std::sync::Arc;

use ontoloom_foundation::{Error, ErrorContext, ErrorKind, ObjectId, Result};
use ontoloom_graph::{BlobStore, GraphDriver, GraphSync, RetryPolicy};
use ontoloom_schema::ObjectModel;
use ontoloom_storage::{Delta, ModelState, ObjectSource, RuntimeObject, WorkingSet};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::status::{SchemaStatus, StatusReport, StoreStatus};

struct Loaded {
    name: String,
    state: ModelState,
}

/// Store reads with the context's retry policy applied.
struct Retrying<'a> {
    sync: &'a GraphSync,
    retry: RetryPolicy,
}

impl ObjectSource for Retrying<'_> {
    fn fetch(&self, model: &Arc<ObjectModel>, id: &ObjectId) -> Result<Option<RuntimeObject>> {
        self.retry.run("load", || self.sync.load(model, id))
    }
}

/// Holds the active object model, the in-memory snapshot, and the store.
pub struct ModelContext {
    loaded: RwLock<Option<Loaded>>,
    sync: GraphSync,
    blobs: Arc<dyn BlobStore>,
    retry: RetryPolicy,
}

impl ModelContext {
    /// Creates a context with no schema loaded.
    #[must_use]
    pub fn new(driver: Arc<dyn GraphDriver>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            loaded: RwLock::new(None),
            sync: GraphSync::new(driver),
            blobs,
            retry: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy for store calls.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The store mapping.
    #[must_use]
    pub fn sync(&self) -> &GraphSync {
        &self.sync
    }

    /// The blob store.
    #[must_use]
    pub fn blobs(&self) -> &Arc<dyn BlobStore> {
        &self.blobs
    }

    /// Reads schema text from the blob store and loads it.
    ///
    /// # Errors
    ///
    /// See [`load_schema_text`](Self::load_schema_text); also a not-found
    /// error if there is no such resource.
    pub fn load_schema(&self, name: &str) -> Result<Arc<ObjectModel>> {
        let text = self.blobs.read(name)?;
        self.load_schema_text(name, &text)
    }

    /// Compiles schema text and makes it the active model.
    ///
    /// The generated artifact is written to the blob store as
    /// `<stem>.model`. Loading replaces the in-memory snapshot; objects
    /// already in the store stay there and are hydrated on demand.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every issue, or a blob store error.
    /// The previously active model stays active on any error.
    pub fn load_schema_text(&self, name: &str, text: &str) -> Result<Arc<ObjectModel>> {
        let model = match ObjectModel::compile(text) {
            Ok(model) => Arc::new(model),
            Err(err) => {
                if let ErrorKind::Validation(issues) = &err.kind {
                    warn!(schema = name, issues = issues.len(), "schema rejected");
                }
                return Err(err.with_context(ErrorContext::new().with_source(name)));
            }
        };
        let mut loaded = self.loaded.write();
        self.blobs.write(&artifact_name(name), &model.artifact())?;
        *loaded = Some(Loaded {
            name: name.to_string(),
            state: ModelState::new(Arc::clone(&model)),
        });
        info!(
            schema = name,
            classes = model.class_count(),
            composites = model.composite_count(),
            fingerprint = %model.fingerprint(),
            "schema loaded"
        );
        Ok(model)
    }

    /// Drops the active model and the in-memory snapshot.
    ///
    /// Returns false if nothing was loaded.
    pub fn unload(&self) -> bool {
        let previous = self.loaded.write().take();
        if let Some(loaded) = &previous {
            info!(schema = %loaded.name, "schema unloaded");
        }
        previous.is_some()
    }

    /// The active model.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NoModelLoaded`] if no schema is loaded.
    pub fn model(&self) -> Result<Arc<ObjectModel>> {
        self.loaded
            .read()
            .as_ref()
            .map(|loaded| Arc::clone(loaded.state.model()))
            .ok_or_else(|| Error::new(ErrorKind::NoModelLoaded))
    }

    /// The last committed snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::NoModelLoaded`] if no schema is loaded.
    pub fn snapshot(&self) -> Result<ModelState> {
        self.loaded
            .read()
            .as_ref()
            .map(|loaded| loaded.state.clone())
            .ok_or_else(|| Error::new(ErrorKind::NoModelLoaded))
    }

    /// Finds an object in memory, or hydrates it from the store without
    /// caching it.
    ///
    /// # Errors
    ///
    /// Unknown class or object, no model loaded, or a store error.
    pub fn get(&self, id: &ObjectId) -> Result<RuntimeObject> {
        let guard = self.loaded.read();
        let loaded = guard.as_ref().ok_or_else(|| Error::new(ErrorKind::NoModelLoaded))?;
        let model = loaded.state.model();
        model.descriptor(&id.class)?;
        if let Some(object) = loaded.state.get(id) {
            return Ok(object.clone());
        }
        self.retry
            .run("load", || self.sync.load(model, id))?
            .ok_or_else(|| Error::unknown_object(id.clone()))
    }

    /// Runs `apply` against a working set, writes the resulting changes
    /// through to the store, and only then commits the new snapshot.
    ///
    /// Nothing changes in memory or in the store if any step fails.
    ///
    /// # Errors
    ///
    /// No model loaded, whatever `apply` returns, a required-reference
    /// violation, or a store error after retries.
    pub fn write<T>(&self, apply: impl FnOnce(&mut WorkingSet<'_>) -> Result<T>) -> Result<(T, Delta)> {
        let mut guard = self.loaded.write();
        let loaded = guard.as_mut().ok_or_else(|| Error::new(ErrorKind::NoModelLoaded))?;
        let source = Retrying {
            sync: &self.sync,
            retry: self.retry,
        };
        let mut ws = WorkingSet::new(&loaded.state, &source);
        let value = apply(&mut ws)?;
        let delta = ws.finish()?;
        if !delta.is_empty() {
            self.retry
                .run("write-through", || self.sync.write_through(&delta.changes, &delta.state))?;
            loaded.state = delta.state.clone();
        }
        Ok((value, delta))
    }

    /// Removes everything from the store and clears the in-memory snapshot.
    ///
    /// # Errors
    ///
    /// Returns a store error; nothing changes when this fails.
    pub fn wipe(&self) -> Result<()> {
        let mut loaded = self.loaded.write();
        self.retry.run("wipe", || self.sync.wipe())?;
        if let Some(loaded) = loaded.as_mut() {
            loaded.state = loaded.state.cleared();
        }
        Ok(())
    }

    /// Creates the store indexes for the active model and records its
    /// fingerprint.
    ///
    /// # Errors
    ///
    /// No model loaded, or a store error.
    pub fn initialize_schema(&self) -> Result<()> {
        let loaded = self.loaded.write();
        let loaded = loaded.as_ref().ok_or_else(|| Error::new(ErrorKind::NoModelLoaded))?;
        self.retry
            .run("initialize schema", || self.sync.initialize_schema(loaded.state.model()))
    }

    /// Reports schema, snapshot, and store state. Never fails; an unreachable
    /// store is reported as unhealthy.
    #[must_use]
    pub fn status(&self) -> StatusReport {
        let (schema, objects, version) = {
            let loaded = self.loaded.read();
            match loaded.as_ref() {
                Some(loaded) => {
                    let model = loaded.state.model();
                    let schema = SchemaStatus {
                        name: loaded.name.clone(),
                        fingerprint: model.fingerprint(),
                        classes: model.class_count(),
                        abstract_classes: model.abstract_classes().len(),
                        composites: model.composite_count(),
                    };
                    (Some(schema), loaded.state.len(), loaded.state.version())
                }
                None => (None, 0, 0),
            }
        };
        let driver = self.sync.driver();
        let store = match driver
            .health()
            .and_then(|()| Ok((driver.counts()?, driver.schema_marker()?)))
        {
            Ok((counts, marker)) => StoreStatus {
                healthy: true,
                error: None,
                nodes: counts.nodes,
                edges: counts.edges,
                indexes: counts.indexes,
                marker,
            },
            Err(err) => StoreStatus {
                error: Some(err.to_string()),
                ..StoreStatus::default()
            },
        };
        StatusReport {
            schema,
            objects,
            version,
            store,
        }
    }
}

/// `regions.xml` becomes `regions.model`.
fn artifact_name(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name);
    format!("{stem}.model")
}
