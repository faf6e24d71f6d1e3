//! Error types for the Ontoloom system.
//!
//! Every fallible operation returns [`Error`]. Its [`ErrorKind`] groups into a
//! small set of user-visible categories (see [`ErrorKind::category`]), and
//! [`Error::identifiers`] names whatever the failure was about, so a command
//! front end can always report both.

use std::fmt;

use thiserror::Error;

use crate::id::ObjectId;
use crate::value::ParseValueError;

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Ontoloom operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a schema validation error carrying every issue found.
    #[must_use]
    pub fn validation(issues: Vec<ValidationIssue>) -> Self {
        Self::new(ErrorKind::Validation(issues))
    }

    /// Creates a command syntax error.
    #[must_use]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax {
            message: message.into(),
        })
    }

    /// Creates an unknown class error.
    #[must_use]
    pub fn unknown_class(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound(NotFound::Class(name.into())))
    }

    /// Creates an unknown object error.
    #[must_use]
    pub fn unknown_object(id: ObjectId) -> Self {
        Self::new(ErrorKind::NotFound(NotFound::Object(id)))
    }

    /// Creates an unknown attribute error.
    #[must_use]
    pub fn unknown_attribute(class: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound(NotFound::Attribute {
            class: class.into(),
            name: name.into(),
        }))
    }

    /// Creates a missing resource error.
    #[must_use]
    pub fn resource_not_found(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound(NotFound::Resource(name.into())))
    }

    /// Creates a transient store failure.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store(StoreError::Unavailable(message.into())))
    }

    /// Creates a permanent store constraint failure.
    #[must_use]
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Store(StoreError::ConstraintViolation(
            message.into(),
        )))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Returns true if retrying the same operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Store(StoreError::Unavailable(_)))
    }

    /// The identifiers this error is about, for user-facing reports.
    #[must_use]
    pub fn identifiers(&self) -> Vec<String> {
        match &self.kind {
            ErrorKind::Validation(issues) => {
                let mut names: Vec<String> = Vec::new();
                for issue in issues {
                    let name = match (&issue.class, &issue.field) {
                        (Some(class), Some(field)) => format!("{class}.{field}"),
                        (Some(class), None) => class.clone(),
                        _ => continue,
                    };
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                names
            }
            ErrorKind::Reference(err) => err.identifiers(),
            ErrorKind::NotFound(err) => match err {
                NotFound::Class(name) | NotFound::Resource(name) => vec![name.clone()],
                NotFound::Object(id) => vec![id.to_string()],
                NotFound::Attribute { class, name } => vec![format!("{class}.{name}")],
            },
            ErrorKind::Attribute(err) => match err {
                AttributeError::MissingRequired { object, attribute }
                | AttributeError::KeyImmutable { object, attribute } => {
                    vec![object.to_string(), attribute.clone()]
                }
                AttributeError::InvalidValue { attribute, .. } => vec![attribute.clone()],
                AttributeError::NotAnAttribute { class, name } => vec![format!("{class}.{name}")],
                AttributeError::KeyMismatch { class, key, .. } => vec![format!("{class}:{key}")],
            },
            ErrorKind::Syntax { .. }
            | ErrorKind::Store(_)
            | ErrorKind::NoModelLoaded
            | ErrorKind::IoError(_)
            | ErrorKind::SerializationError(_)
            | ErrorKind::ConfigError(_)
            | ErrorKind::Internal(_) => Vec::new(),
        }
    }
}

impl From<ValidationIssue> for Error {
    fn from(issue: ValidationIssue) -> Self {
        Self::validation(vec![issue])
    }
}

impl From<ReferenceError> for Error {
    fn from(err: ReferenceError) -> Self {
        Self::new(ErrorKind::Reference(err))
    }
}

impl From<AttributeError> for Error {
    fn from(err: AttributeError) -> Self {
        Self::new(ErrorKind::Attribute(err))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The schema document is inconsistent; nothing was loaded.
    #[error("schema validation failed with {} issue(s)", .0.len())]
    Validation(Vec<ValidationIssue>),

    /// A reference operation broke a typing or multiplicity rule.
    #[error("{0}")]
    Reference(ReferenceError),

    /// The backing store rejected or could not take a write.
    #[error("{0}")]
    Store(StoreError),

    /// A command could not be parsed.
    #[error("syntax error: {message}")]
    Syntax {
        /// What was wrong.
        message: String,
    },

    /// A class, object, attribute, or resource does not exist.
    #[error("{0}")]
    NotFound(NotFound),

    /// An attribute value or assignment was rejected.
    #[error("{0}")]
    Attribute(AttributeError),

    /// A command needs a schema but none is active.
    #[error("no schema model is loaded")]
    NoModelLoaded,

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ErrorKind {
    /// The user-visible error category.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Reference(_) => "ReferenceError",
            Self::Store(_) => "StoreError",
            Self::Syntax { .. } => "SyntaxError",
            Self::NotFound(_) => "NotFoundError",
            Self::Attribute(_) => "AttributeError",
            Self::NoModelLoaded => "NoModelLoaded",
            Self::IoError(_) => "IoError",
            Self::SerializationError(_) => "SerializationError",
            Self::ConfigError(_) => "ConfigError",
            Self::Internal(_) => "InternalError",
        }
    }

    /// The specific error name within its category.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reference(err) => match err {
                ReferenceError::TypeMismatch { .. } => "TypeMismatch",
                ReferenceError::MultiplicityViolation { .. } => "MultiplicityViolation",
                ReferenceError::UnknownReference { .. } => "UnknownReference",
            },
            Self::Store(err) => match err {
                StoreError::Unavailable(_) => "StoreUnavailable",
                StoreError::ConstraintViolation(_) => "ConstraintViolation",
            },
            Self::NotFound(err) => match err {
                NotFound::Class(_) => "UnknownClass",
                NotFound::Object(_) => "UnknownObject",
                NotFound::Attribute { .. } => "UnknownAttribute",
                NotFound::Resource(_) => "UnknownResource",
            },
            Self::Attribute(err) => match err {
                AttributeError::MissingRequired { .. } => "MissingRequiredAttribute",
                AttributeError::InvalidValue { .. } => "InvalidValue",
                AttributeError::KeyImmutable { .. } => "KeyImmutable",
                AttributeError::NotAnAttribute { .. } => "NotAnAttribute",
                AttributeError::KeyMismatch { .. } => "KeyMismatch",
            },
            other => other.category(),
        }
    }
}

/// Reference integrity failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The target's class is not assignable to the declared target class.
    TypeMismatch {
        /// Object owning the reference slot.
        owner: ObjectId,
        /// Reference name.
        reference: String,
        /// The rejected target.
        target: ObjectId,
        /// Declared target class.
        expected: String,
    },
    /// A slot would hold more values than allowed, or a required slot is empty.
    MultiplicityViolation {
        /// Object owning the reference slot.
        owner: ObjectId,
        /// Reference name.
        reference: String,
        /// Number of targets the slot would hold.
        found: usize,
    },
    /// The class declares no reference with that name.
    UnknownReference {
        /// Class that was asked.
        class: String,
        /// Reference name.
        reference: String,
    },
}

impl ReferenceError {
    /// Returns true if this is an empty required slot.
    #[must_use]
    pub const fn is_required_missing(&self) -> bool {
        matches!(self, Self::MultiplicityViolation { found: 0, .. })
    }

    fn identifiers(&self) -> Vec<String> {
        match self {
            Self::TypeMismatch {
                owner,
                reference,
                target,
                ..
            } => vec![owner.to_string(), reference.clone(), target.to_string()],
            Self::MultiplicityViolation {
                owner, reference, ..
            } => vec![owner.to_string(), reference.clone()],
            Self::UnknownReference { class, reference } => vec![format!("{class}.{reference}")],
        }
    }
}

impl fmt::Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                owner,
                reference,
                target,
                expected,
            } => write!(
                f,
                "type mismatch: {owner}.{reference} expects {expected}, got {target}"
            ),
            Self::MultiplicityViolation {
                owner,
                reference,
                found: 0,
            } => write!(
                f,
                "multiplicity violation: required reference {owner}.{reference} is empty"
            ),
            Self::MultiplicityViolation {
                owner,
                reference,
                found,
            } => write!(
                f,
                "multiplicity violation: mono reference {owner}.{reference} cannot hold {found} targets"
            ),
            Self::UnknownReference { class, reference } => {
                write!(f, "unknown reference: {reference} on {class}")
            }
        }
    }
}

impl std::error::Error for ReferenceError {}

/// Backing store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transient; the caller may retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Permanent; retrying will fail the same way.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
    /// No such class in the active model.
    #[error("unknown class: {0}")]
    Class(String),
    /// No such object in memory or in the store.
    #[error("unknown object: {0}")]
    Object(ObjectId),
    /// The class has no attribute or reference with that name.
    #[error("unknown attribute: {name} on {class}")]
    Attribute {
        /// Class that was asked.
        class: String,
        /// Field name.
        name: String,
    },
    /// No such named resource.
    #[error("resource not found: {0}")]
    Resource(String),
}

/// Attribute assignment failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// A required attribute has no value.
    #[error("missing required attribute {attribute} on {object}")]
    MissingRequired {
        /// Object being created.
        object: ObjectId,
        /// Attribute name.
        attribute: String,
    },
    /// A literal does not parse as the declared type.
    #[error("invalid value for {attribute}: {error}")]
    InvalidValue {
        /// Attribute name.
        attribute: String,
        /// Parse failure.
        error: ParseValueError,
    },
    /// Key attributes cannot change once an object exists.
    #[error("updating the key attribute {attribute} of {object} is not allowed")]
    KeyImmutable {
        /// Object being updated.
        object: ObjectId,
        /// Key attribute name.
        attribute: String,
    },
    /// The name is a reference; it changes through link and unlink.
    #[error("{name} on {class} is a reference, use link or unlink")]
    NotAnAttribute {
        /// Class that was asked.
        class: String,
        /// Reference name.
        name: String,
    },
    /// The positional key disagrees with an explicit key assignment.
    #[error("key {key} does not match key attribute value {given} on {class}")]
    KeyMismatch {
        /// Class being created.
        class: String,
        /// Positional key.
        key: String,
        /// Explicitly assigned key value.
        given: String,
    },
}

/// Codes for schema validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueCode {
    /// The document is not well-formed or has an unexpected shape.
    StructuralError,
    /// Two classes or composites share a name.
    DuplicateClassName,
    /// `extends` names an undefined class.
    UnknownBaseClass,
    /// The `extends` chain loops.
    InheritanceCycle,
    /// A class names more than one parent.
    MultipleInheritance,
    /// A descendant redefines an inherited field with a different type.
    ConflictingOverride,
    /// A class declares the same field name twice.
    DuplicateField,
    /// A concrete class has no key attribute.
    MissingKeyAttribute,
    /// A class has more than one key attribute.
    ExtraKeyAttribute,
    /// A key attribute is not text.
    WrongKeyType,
    /// An attribute type is neither primitive nor a declared composite.
    InvalidAttributeType,
    /// A composite field is not a plain primitive attribute.
    InvalidCompositeField,
    /// A reference targets an undefined class.
    DanglingReferenceTarget,
    /// An inverse has no reciprocal declaration pointing back.
    AsymmetricInverse,
    /// An abstract class declares a collection.
    AbstractInstantiationRule,
    /// A concrete class has no collection.
    MissingCollection,
}

impl IssueCode {
    /// The code name as shown to users.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StructuralError => "StructuralError",
            Self::DuplicateClassName => "DuplicateClassName",
            Self::UnknownBaseClass => "UnknownBaseClass",
            Self::InheritanceCycle => "InheritanceCycle",
            Self::MultipleInheritance => "MultipleInheritance",
            Self::ConflictingOverride => "ConflictingOverride",
            Self::DuplicateField => "DuplicateField",
            Self::MissingKeyAttribute => "MissingKeyAttribute",
            Self::ExtraKeyAttribute => "ExtraKeyAttribute",
            Self::WrongKeyType => "WrongKeyType",
            Self::InvalidAttributeType => "InvalidAttributeType",
            Self::InvalidCompositeField => "InvalidCompositeField",
            Self::DanglingReferenceTarget => "DanglingReferenceTarget",
            Self::AsymmetricInverse => "AsymmetricInverse",
            Self::AbstractInstantiationRule => "AbstractInstantiationRule",
            Self::MissingCollection => "MissingCollection",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found while validating a schema document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// What kind of problem.
    pub code: IssueCode,
    /// Offending class or composite, if any.
    pub class: Option<String>,
    /// Offending field, if any.
    pub field: Option<String>,
    /// Line in the document (1-based), if known.
    pub line: Option<usize>,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    /// Creates an issue with no location.
    #[must_use]
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            class: None,
            field: None,
            line: None,
            message: message.into(),
        }
    }

    /// Sets the offending class.
    #[must_use]
    pub fn in_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    /// Sets the offending field.
    #[must_use]
    pub fn on_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Sets the document line.
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)?;
        match (&self.class, &self.field) {
            (Some(class), Some(field)) => write!(f, " in {class}.{field}")?,
            (Some(class), None) => write!(f, " in {class}")?,
            _ => {}
        }
        if let Some(line) = self.line {
            write!(f, " (line {line})")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Schema name, command text, or resource name.
    pub source: Option<String>,
    /// Line number in source.
    pub line: Option<usize>,
    /// Column number in source.
    pub column: Option<usize>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the line and column.
    #[must_use]
    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "at {source}")?;
            if let (Some(line), Some(col)) = (self.line, self.column) {
                write!(f, ":{line}:{col}")?;
            }
        }
        Ok(())
    }
}
