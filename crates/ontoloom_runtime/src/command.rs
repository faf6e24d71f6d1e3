//! Command parsing.
//!
//! A command line is split into whitespace-separated tokens; double quotes
//! group a token that contains spaces, with `\"` and `\\` as escapes. The
//! first token selects the verb.

use ontoloom_foundation::{Error, ErrorContext, ObjectId, Result};

/// A parsed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `create <class> <key> [name=value]*`
    Create {
        /// Concrete class.
        class: String,
        /// Key value.
        key: String,
        /// Raw `name=value` assignments, attributes or references.
        assignments: Vec<(String, String)>,
    },
    /// `set <class> <key> <attribute> <value>`
    Set {
        /// Object to update.
        id: ObjectId,
        /// Attribute name.
        attribute: String,
        /// Raw value literal.
        value: String,
    },
    /// `link <class> <key> <reference> <class2> <key2>`
    Link {
        /// Slot owner.
        owner: ObjectId,
        /// Reference name.
        reference: String,
        /// Target.
        target: ObjectId,
    },
    /// `unlink <class> <key> <reference> <class2> <key2>`
    Unlink {
        /// Slot owner.
        owner: ObjectId,
        /// Reference name.
        reference: String,
        /// Target.
        target: ObjectId,
    },
    /// `delete <class> <key>`
    Delete(ObjectId),
    /// `get <class> <key>`
    Get(ObjectId),
    /// `describe <class>`
    Describe(String),
    /// `status`
    Status,
    /// `help`
    Help,
}

/// One-line usage for every verb.
pub const USAGE: &[&str] = &[
    "create <class> <key> [name=value]...",
    "set <class> <key> <attribute> <value>",
    "link <class> <key> <reference> <class2> <key2>",
    "unlink <class> <key> <reference> <class2> <key2>",
    "delete <class> <key>",
    "get <class> <key>",
    "describe <class>",
    "status",
    "help",
];

impl Command {
    /// Parses one command line.
    ///
    /// # Errors
    ///
    /// Returns a syntax error for unknown verbs, wrong arity, malformed
    /// assignments, and unterminated quotes.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens = tokenize(line)?;
        let Some((verb, args)) = tokens.split_first() else {
            return Err(Error::syntax("empty command"));
        };
        let command = match (verb.as_str(), args) {
            ("create", [class, key, rest @ ..]) => Self::Create {
                class: class.clone(),
                key: key.clone(),
                assignments: rest
                    .iter()
                    .map(|token| assignment(token))
                    .collect::<Result<_>>()?,
            },
            ("set", [class, key, attribute, value]) => Self::Set {
                id: ObjectId::new(class.as_str(), key.as_str()),
                attribute: attribute.clone(),
                value: value.clone(),
            },
            ("link", [class, key, reference, class2, key2]) => Self::Link {
                owner: ObjectId::new(class.as_str(), key.as_str()),
                reference: reference.clone(),
                target: ObjectId::new(class2.as_str(), key2.as_str()),
            },
            ("unlink", [class, key, reference, class2, key2]) => Self::Unlink {
                owner: ObjectId::new(class.as_str(), key.as_str()),
                reference: reference.clone(),
                target: ObjectId::new(class2.as_str(), key2.as_str()),
            },
            ("delete", [class, key]) => Self::Delete(ObjectId::new(class.as_str(), key.as_str())),
            ("get", [class, key]) => Self::Get(ObjectId::new(class.as_str(), key.as_str())),
            ("describe", [class]) => Self::Describe(class.clone()),
            ("status", []) => Self::Status,
            ("help", []) => Self::Help,
            (verb, _) => {
                return Err(match USAGE.iter().find(|u| u.split(' ').next() == Some(verb)) {
                    Some(usage) => Error::syntax(format!("usage: {usage}")),
                    None => Error::syntax(format!("unknown command {verb:?}, try help")),
                });
            }
        };
        Ok(command)
    }

    /// The command verb.
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Set { .. } => "set",
            Self::Link { .. } => "link",
            Self::Unlink { .. } => "unlink",
            Self::Delete(_) => "delete",
            Self::Get(_) => "get",
            Self::Describe(_) => "describe",
            Self::Status => "status",
            Self::Help => "help",
        }
    }

    /// Returns true if the command changes the model.
    #[must_use]
    pub const fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Create { .. } | Self::Set { .. } | Self::Link { .. } | Self::Unlink { .. } | Self::Delete(_)
        )
    }
}

fn assignment(token: &str) -> Result<(String, String)> {
    match token.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(Error::syntax(format!("expected name=value, got {token:?}"))),
    }
}

/// Splits a command line into tokens.
///
/// # Errors
///
/// Returns a syntax error, positioned at the opening quote, if a quoted
/// token is not terminated.
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote_start = None;
    let mut chars = line.char_indices();

    while let Some((at, c)) = chars.next() {
        match (c, quote_start) {
            ('"', None) => {
                quote_start = Some(at);
                in_token = true;
            }
            ('"', Some(_)) => quote_start = None,
            ('\\', Some(_)) => match chars.next() {
                Some((_, escaped @ ('"' | '\\'))) => current.push(escaped),
                Some((_, other)) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            (c, None) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (c, _) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(at) = quote_start {
        return Err(Error::syntax("unterminated quote")
            .with_context(ErrorContext::new().with_source(line).with_position(1, at + 1)));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
