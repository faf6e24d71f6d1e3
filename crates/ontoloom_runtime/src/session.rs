//! Command sessions.
//!
//! A [`Session`] turns one command line into one [`CommandResponse`]. Every
//! mutating command is all-or-nothing: operands are resolved, the change is
//! staged on a working set, written through to the store, and only then
//! committed. Any failure along the way discards the working set.

use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::sync::Arc;

use ontoloom_foundation::{
    AttributeError, AttributeType, Error, ErrorKind, ObjectId, ReferenceError, Result, Value,
};
use ontoloom_schema::{ObjectModel, ReferenceSlot, TypeDescriptor};
use ontoloom_storage::{Delta, RuntimeObject, WorkingSet};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::command::{Command, USAGE};
use crate::context::ModelContext;

/// Where a session is in its command cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Waiting for a command.
    Idle,
    /// Running a command.
    Executing,
    /// The last command succeeded.
    Committed,
    /// The last command failed and was rolled back.
    Failed,
}

/// How a command ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// A mutating command was applied and written through.
    Committed,
    /// A read-only command completed.
    Done,
    /// The command failed; nothing changed.
    Failed,
}

/// Error details for a failed command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    /// Taxonomy category, e.g. `ReferenceError`.
    pub category: String,
    /// Specific kind, e.g. `MultiplicityViolation`.
    pub kind: String,
    /// Offending identifiers.
    pub identifiers: Vec<String>,
}

impl From<&Error> for ErrorReport {
    fn from(err: &Error) -> Self {
        Self {
            category: err.kind.category().to_string(),
            kind: err.kind.name().to_string(),
            identifiers: err.identifiers(),
        }
    }
}

/// A rendered object.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ObjectView {
    /// `Class:key`.
    pub id: String,
    /// Class name.
    pub class: String,
    /// Attribute values by name.
    pub attributes: BTreeMap<String, Value>,
    /// Reference targets by name. A target of the declared class is shown by
    /// key alone, anything else as `Class:key`.
    pub references: BTreeMap<String, Vec<String>>,
}

impl ObjectView {
    /// Renders an object.
    #[must_use]
    pub fn of(object: &RuntimeObject) -> Self {
        let descriptor = object.descriptor();
        let references = object
            .references()
            .map(|(name, slot)| {
                let declared = descriptor.reference(name).map(|r| r.target.as_str());
                let targets = slot
                    .targets()
                    .map(|t| {
                        if Some(&*t.class) == declared {
                            t.key.to_string()
                        } else {
                            t.to_string()
                        }
                    })
                    .collect();
                (name.to_string(), targets)
            })
            .collect();
        Self {
            id: object.id().to_string(),
            class: descriptor.name.clone(),
            attributes: object
                .attributes()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
            references,
        }
    }
}

impl fmt::Display for ObjectView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for (name, value) in &self.attributes {
            write!(f, " {name}={value}")?;
        }
        for (name, targets) in &self.references {
            write!(f, " {name}=[{}]", targets.join(", "))?;
        }
        Ok(())
    }
}

/// The structured result of one command.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandResponse {
    /// The command line as given.
    pub echo: String,
    /// How it ended.
    pub outcome: Outcome,
    /// Human-readable summary or error message.
    pub message: String,
    /// Error details on failure.
    pub error: Option<ErrorReport>,
    /// Affected (or requested) objects, grouped by collection.
    pub objects: BTreeMap<String, Vec<ObjectView>>,
    /// Identities deleted by the command.
    pub deleted: Vec<String>,
}

impl CommandResponse {
    pub(crate) fn done(echo: &str, message: impl Into<String>) -> Self {
        Self {
            echo: echo.to_string(),
            outcome: Outcome::Done,
            message: message.into(),
            error: None,
            objects: BTreeMap::new(),
            deleted: Vec::new(),
        }
    }

    pub(crate) fn failed(echo: &str, err: &Error) -> Self {
        let mut message = err.to_string();
        if let Some(context) = &err.context {
            if context.line.is_some() {
                let _ = write!(message, " ({context})");
            }
        }
        if let ErrorKind::Validation(issues) = &err.kind {
            for issue in issues {
                let _ = write!(message, "\n  {issue}");
            }
        }
        Self {
            error: Some(ErrorReport::from(err)),
            outcome: Outcome::Failed,
            ..Self::done(echo, message)
        }
    }

    fn with_object(mut self, collection: &str, object: &RuntimeObject) -> Self {
        self.objects
            .entry(collection.to_string())
            .or_default()
            .push(ObjectView::of(object));
        self
    }

    /// Returns true unless the command failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome != Outcome::Failed
    }

    /// Renders the response as JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization error.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            Error::new(ErrorKind::SerializationError(e.to_string()))
        })
    }
}

impl fmt::Display for CommandResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            Some(report) => write!(f, "{}: {}", report.kind, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        for (collection, objects) in &self.objects {
            write!(f, "\n{collection}:")?;
            for object in objects {
                write!(f, "\n  {object}")?;
            }
        }
        for id in &self.deleted {
            write!(f, "\ndeleted {id}")?;
        }
        Ok(())
    }
}

/// Executes commands against a shared [`ModelContext`], one at a time.
pub struct Session {
    context: Arc<ModelContext>,
    state: SessionState,
    last: Option<Outcome>,
}

impl Session {
    /// Creates an idle session.
    #[must_use]
    pub fn new(context: Arc<ModelContext>) -> Self {
        Self {
            context,
            state: SessionState::Idle,
            last: None,
        }
    }

    /// The shared context.
    #[must_use]
    pub fn context(&self) -> &Arc<ModelContext> {
        &self.context
    }

    /// The current state; `Idle` between commands.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// How the last command ended.
    #[must_use]
    pub const fn last_outcome(&self) -> Option<Outcome> {
        self.last
    }

    /// Parses and runs one command line.
    pub fn execute(&mut self, line: &str) -> CommandResponse {
        let echo = line.trim();
        self.transition(SessionState::Executing);
        let response = match Command::parse(echo) {
            Ok(command) => match self.run(echo, &command) {
                Ok(response) => {
                    debug!(verb = command.verb(), "command succeeded");
                    response
                }
                Err(err) => {
                    warn!(verb = command.verb(), kind = err.kind.name(), error = %err, "command failed");
                    CommandResponse::failed(echo, &err)
                }
            },
            Err(err) => CommandResponse::failed(echo, &err),
        };
        self.transition(if response.is_success() {
            SessionState::Committed
        } else {
            SessionState::Failed
        });
        self.last = Some(response.outcome);
        self.transition(SessionState::Idle);
        response
    }

    fn transition(&mut self, next: SessionState) {
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    fn run(&self, echo: &str, command: &Command) -> Result<CommandResponse> {
        match command {
            Command::Get(id) => {
                let object = self.context.get(id)?;
                let collection = object.descriptor().collection.clone();
                Ok(CommandResponse::done(echo, format!("found {id}")).with_object(&collection, &object))
            }
            Command::Describe(class) => {
                let model = self.context.model()?;
                let descriptor = model.descriptor(class)?;
                let mut message = format!("{} (collection {})", descriptor.name, descriptor.collection);
                for line in descriptor.summary() {
                    let _ = write!(message, "\n  {line}");
                }
                Ok(CommandResponse::done(echo, message))
            }
            Command::Status => Ok(CommandResponse::done(echo, self.context.status().to_string())),
            Command::Help => Ok(CommandResponse::done(echo, USAGE.join("\n"))),
            mutating => self.commit(echo, mutating),
        }
    }

    fn commit(&self, echo: &str, command: &Command) -> Result<CommandResponse> {
        let (message, delta) = self.context.write(|ws| {
            let model = Arc::clone(ws.state().model());
            apply(ws, &model, command)
        })?;
        info!(verb = command.verb(), version = delta.state.version(), changes = delta.changes.len(), "command committed");
        Ok(response(echo, message, &delta))
    }
}

fn response(echo: &str, message: String, delta: &Delta) -> CommandResponse {
    let mut response = CommandResponse {
        outcome: Outcome::Committed,
        deleted: delta.deleted.iter().map(ToString::to_string).collect(),
        ..CommandResponse::done(echo, message)
    };
    for id in &delta.affected {
        if let Some(object) = delta.state.get(id) {
            response = response.with_object(&object.descriptor().collection, object);
        }
    }
    response
}

/// Applies one mutating command to a working set.
fn apply(ws: &mut WorkingSet<'_>, model: &ObjectModel, command: &Command) -> Result<String> {
    match command {
        Command::Create {
            class,
            key,
            assignments,
        } => {
            let descriptor = model.descriptor(class)?;
            let mut attributes = Vec::new();
            let mut references = Vec::new();
            for (name, raw) in assignments {
                if let Some(slot) = descriptor.attribute(name) {
                    attributes.push((name.clone(), parse_value(model, name, &slot.ty, raw)?));
                } else if let Some(slot) = descriptor.reference(name) {
                    let id = ObjectId::new(class.as_str(), key.as_str());
                    references.push((slot, reference_targets(model, &id, slot, raw)?));
                } else {
                    return Err(Error::unknown_attribute(class, name));
                }
            }
            let id = ws.create(class, key, attributes)?;
            for (slot, targets) in references {
                for target in targets {
                    ws.link(&id, &slot.name, &target)?;
                }
            }
            Ok(format!("created {id}"))
        }
        Command::Set {
            id,
            attribute,
            value,
        } => {
            let descriptor = owner_descriptor(ws, model, id)?;
            let Some(slot) = descriptor.attribute(attribute) else {
                if descriptor.reference(attribute).is_some() {
                    return Err(AttributeError::NotAnAttribute {
                        class: descriptor.name.clone(),
                        name: attribute.clone(),
                    }
                    .into());
                }
                return Err(Error::unknown_attribute(&descriptor.name, attribute));
            };
            let value = parse_value(model, attribute, &slot.ty, value)?;
            ws.set_attribute(id, attribute, value)?;
            Ok(format!("updated {id}.{attribute}"))
        }
        Command::Link {
            owner,
            reference,
            target,
        } => {
            owner_descriptor(ws, model, owner)?;
            model.descriptor(&target.class)?;
            ws.link(owner, reference, target)?;
            Ok(format!("linked {owner}.{reference} -> {target}"))
        }
        Command::Unlink {
            owner,
            reference,
            target,
        } => {
            owner_descriptor(ws, model, owner)?;
            model.descriptor(&target.class)?;
            ws.unlink(owner, reference, target)?;
            Ok(format!("unlinked {owner}.{reference} -> {target}"))
        }
        Command::Delete(id) => {
            owner_descriptor(ws, model, id)?;
            ws.delete(id)?;
            Ok(format!("deleted {id}"))
        }
        Command::Get(_) | Command::Describe(_) | Command::Status | Command::Help => {
            Err(Error::internal(format!("{} is not a mutating command", command.verb())))
        }
    }
}

/// Resolves a class and then an object, in that order.
fn owner_descriptor(ws: &mut WorkingSet<'_>, model: &ObjectModel, id: &ObjectId) -> Result<Arc<TypeDescriptor>> {
    model.descriptor(&id.class)?;
    Ok(Arc::clone(ws.resolve(id)?.descriptor()))
}

fn parse_value(
    model: &ObjectModel,
    attribute: &str,
    ty: &AttributeType,
    raw: &str,
) -> Result<Value> {
    model.parse_value(ty, raw).map_err(|error| {
        AttributeError::InvalidValue {
            attribute: attribute.to_string(),
            error,
        }
        .into()
    })
}

/// Parses `Class:key` or bare `key` targets, comma-separated.
fn reference_targets(model: &ObjectModel, owner: &ObjectId, slot: &ReferenceSlot, raw: &str) -> Result<Vec<ObjectId>> {
    let mut targets = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = if item.contains(':') {
            ObjectId::parse(item).ok_or_else(|| Error::syntax(format!("malformed target {item:?}")))?
        } else {
            let class = model.sole_concrete(&slot.target).ok_or_else(|| {
                Error::syntax(format!(
                    "{} targets {}, which has several concrete classes; write Class:{item}",
                    slot.name, slot.target
                ))
            })?;
            ObjectId::new(class.name.as_str(), item)
        };
        model.descriptor(&id.class)?;
        targets.push(id);
    }
    if !slot.is_multi() && targets.len() > 1 {
        return Err(ReferenceError::MultiplicityViolation {
            owner: owner.clone(),
            reference: slot.name.clone(),
            found: targets.len(),
        }
        .into());
    }
    Ok(targets)
}
