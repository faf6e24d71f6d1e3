//! Compiled object model: one immutable descriptor per concrete class.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ontoloom_foundation::{
    AttributeType, Error, Multiplicity, ParseValueError, Result, ValidationIssue, Value,
};
use tracing::debug;

use crate::artifact;
use crate::document::{AttributeDef, ReferenceDef, SchemaDocument};
use crate::hierarchy::Hierarchy;
use crate::validate::validate;

/// Attribute slot in a generated class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeSlot {
    /// Attribute name.
    pub name: String,
    /// Declared type.
    pub ty: AttributeType,
    /// Whether a value must be present.
    pub required: bool,
    /// Whether this slot is the identity key.
    pub is_key: bool,
    /// Whether the store indexes this slot.
    pub indexed: bool,
}

impl From<&AttributeDef> for AttributeSlot {
    fn from(def: &AttributeDef) -> Self {
        Self {
            name: def.name.clone(),
            ty: def.ty.clone(),
            required: def.required,
            is_key: def.is_key,
            indexed: def.indexed,
        }
    }
}

/// Reference slot in a generated class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceSlot {
    /// Reference name.
    pub name: String,
    /// Declared target class (may be abstract).
    pub target: String,
    /// Cardinality.
    pub multiplicity: Multiplicity,
    /// Whether the slot must be non-empty.
    pub required: bool,
    /// Reciprocal reference on the target, if any.
    pub inverse: Option<String>,
}

impl ReferenceSlot {
    /// Returns true for multi-valued slots.
    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.multiplicity == Multiplicity::Multi
    }
}

impl From<&ReferenceDef> for ReferenceSlot {
    fn from(def: &ReferenceDef) -> Self {
        Self {
            name: def.name.clone(),
            target: def.target.clone(),
            multiplicity: def.multiplicity,
            required: def.required,
            inverse: def.inverse.clone(),
        }
    }
}

/// Immutable descriptor shared by every instance of a concrete class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Class name.
    pub name: String,
    /// Storage partition.
    pub collection: String,
    /// Attribute slots, inherited first.
    pub attributes: Vec<AttributeSlot>,
    /// Reference slots, inherited first.
    pub references: Vec<ReferenceSlot>,
    /// This class followed by its ancestors, nearest first.
    pub lineage: Vec<String>,
    key: usize,
}

impl TypeDescriptor {
    /// Looks up an attribute slot.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeSlot> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up a reference slot.
    #[must_use]
    pub fn reference(&self, name: &str) -> Option<&ReferenceSlot> {
        self.references.iter().find(|r| r.name == name)
    }

    /// The key attribute slot.
    #[must_use]
    pub fn key(&self) -> &AttributeSlot {
        &self.attributes[self.key]
    }

    /// Returns true if this class is `class` or descends from it.
    #[must_use]
    pub fn is_a(&self, class: &str) -> bool {
        self.lineage.iter().any(|c| c == class)
    }

    /// One line per slot, e.g. `name (key) : text (required)`.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        let attributes = self.attributes.iter().map(|a| {
            format!(
                "{}{} : {} ({})",
                a.name,
                if a.is_key { " (key)" } else { "" },
                a.ty,
                if a.required { "required" } else { "optional" }
            )
        });
        let references = self.references.iter().map(|r| {
            let mut line = format!(
                "{} : {} ({}) ({})",
                r.name,
                r.target,
                if r.required { "required" } else { "optional" },
                r.multiplicity
            );
            if let Some(inverse) = &r.inverse {
                line.push_str(" Inverse: ");
                line.push_str(inverse);
            }
            line
        });
        attributes.chain(references).collect()
    }
}

/// Descriptor of a composite value shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeDescriptor {
    /// Composite name.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<AttributeSlot>,
}

/// A validated, compiled schema.
#[derive(Clone, Debug)]
pub struct ObjectModel {
    order: Vec<String>,
    descriptors: HashMap<String, Arc<TypeDescriptor>>,
    abstracts: Vec<String>,
    composites: HashMap<String, CompositeDescriptor>,
}

impl ObjectModel {
    /// Reads, validates, and compiles an XML schema document.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every structural and semantic issue
    /// if the document is not a consistent schema. No partial model is ever
    /// returned.
    pub fn compile(source: &str) -> Result<Self> {
        let (doc, mut issues) = SchemaDocument::read(source);
        match Self::build(&doc) {
            Ok(model) if issues.is_empty() => Ok(model),
            Ok(_) => Err(Error::validation(issues)),
            Err(more) => {
                issues.extend(more);
                Err(Error::validation(issues))
            }
        }
    }

    /// Validates and compiles a schema document built in code.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every issue found.
    pub fn from_document(doc: &SchemaDocument) -> Result<Self> {
        Self::build(doc).map_err(Error::validation)
    }

    fn build(doc: &SchemaDocument) -> std::result::Result<Self, Vec<ValidationIssue>> {
        let (hierarchy, mut issues) = Hierarchy::resolve(doc);
        issues.extend(validate(doc, &hierarchy));
        if !issues.is_empty() {
            return Err(issues);
        }

        let mut model = Self {
            order: Vec::new(),
            descriptors: HashMap::new(),
            abstracts: Vec::new(),
            composites: HashMap::new(),
        };
        for name in hierarchy.order() {
            let Some(class) = doc.classes.iter().find(|c| &c.name == name) else {
                continue;
            };
            if class.is_abstract {
                model.abstracts.push(name.clone());
                continue;
            }
            let (Some(table), Some(collection)) = (hierarchy.table(name), &class.collection)
            else {
                continue;
            };
            let attributes: Vec<AttributeSlot> =
                table.attributes.iter().map(AttributeSlot::from).collect();
            let Some(key) = attributes.iter().position(|a| a.is_key) else {
                continue;
            };
            let descriptor = TypeDescriptor {
                name: name.clone(),
                collection: collection.clone(),
                attributes,
                references: table.references.iter().map(ReferenceSlot::from).collect(),
                lineage: hierarchy.lineage(name),
                key,
            };
            model.order.push(name.clone());
            model.descriptors.insert(name.clone(), Arc::new(descriptor));
        }
        for composite in &doc.composites {
            model.composites.insert(
                composite.name.clone(),
                CompositeDescriptor {
                    name: composite.name.clone(),
                    fields: composite.attributes.iter().map(AttributeSlot::from).collect(),
                },
            );
        }
        debug!(
            classes = model.order.len(),
            composites = model.composites.len(),
            "compiled object model"
        );
        Ok(model)
    }

    /// The descriptor of a concrete class.
    #[must_use]
    pub fn get(&self, class: &str) -> Option<&Arc<TypeDescriptor>> {
        self.descriptors.get(class)
    }

    /// The descriptor of a concrete class, or an unknown class error.
    ///
    /// Abstract classes have no descriptor; they are unknown as far as
    /// instantiation goes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::unknown_class`] if `class` is not a concrete class.
    pub fn descriptor(&self, class: &str) -> Result<&Arc<TypeDescriptor>> {
        self.get(class).ok_or_else(|| Error::unknown_class(class))
    }

    /// Concrete class descriptors, ancestors before descendants.
    pub fn classes(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.order.iter().filter_map(|name| self.descriptors.get(name))
    }

    /// Names of abstract classes.
    #[must_use]
    pub fn abstract_classes(&self) -> &[String] {
        &self.abstracts
    }

    /// Number of generated (concrete) classes.
    #[must_use]
    pub fn class_count(&self) -> usize {
        self.order.len()
    }

    /// Number of declared composites.
    #[must_use]
    pub fn composite_count(&self) -> usize {
        self.composites.len()
    }

    /// Composite descriptors, in no particular order.
    pub fn composites(&self) -> impl Iterator<Item = &CompositeDescriptor> {
        self.composites.values()
    }

    /// Looks up a composite descriptor.
    #[must_use]
    pub fn composite(&self, name: &str) -> Option<&CompositeDescriptor> {
        self.composites.get(name)
    }

    /// Returns true if an instance of concrete class `actual` may occupy a
    /// slot declared to hold `declared`.
    #[must_use]
    pub fn is_assignable(&self, actual: &str, declared: &str) -> bool {
        self.get(actual).is_some_and(|d| d.is_a(declared))
    }

    /// The unique concrete class assignable to `declared`, if there is exactly one.
    #[must_use]
    pub fn sole_concrete(&self, declared: &str) -> Option<&Arc<TypeDescriptor>> {
        let mut matches = self.classes().filter(|d| d.is_a(declared));
        let first = matches.next()?;
        matches.next().is_none().then_some(first)
    }

    /// Parses a literal for a slot of type `ty`, including composite literals.
    ///
    /// # Errors
    ///
    /// Returns [`ParseValueError`] for malformed literals, unknown composite
    /// fields, and missing required composite fields.
    pub fn parse_value(&self, ty: &AttributeType, raw: &str) -> std::result::Result<Value, ParseValueError> {
        let AttributeType::Composite(name) = ty else {
            return Value::parse_primitive(ty, raw);
        };
        let fail = || ParseValueError {
            expected: ty.clone(),
            raw: raw.to_string(),
        };
        let composite = self.composite(name).ok_or_else(fail)?;
        let given = Value::composite_fields(raw).ok_or_else(fail)?;
        let mut fields = BTreeMap::new();
        for (field, text) in given {
            let slot = composite
                .fields
                .iter()
                .find(|f| f.name == field)
                .ok_or_else(fail)?;
            let value = Value::parse_primitive(&slot.ty, text).map_err(|_| fail())?;
            fields.insert(field.to_string(), value);
        }
        if composite
            .fields
            .iter()
            .any(|f| f.required && !fields.contains_key(&f.name))
        {
            return Err(fail());
        }
        Ok(Value::Composite(fields))
    }

    /// Every index the store needs: one per concrete class key plus one per
    /// indexed attribute, as `(class, attribute)` pairs.
    #[must_use]
    pub fn indexes(&self) -> Vec<(String, String)> {
        let mut indexes = Vec::new();
        for descriptor in self.classes() {
            for slot in &descriptor.attributes {
                if slot.is_key || slot.indexed {
                    indexes.push((descriptor.name.clone(), slot.name.clone()));
                }
            }
        }
        indexes
    }

    /// Deterministic textual listing of the compiled model.
    #[must_use]
    pub fn artifact(&self) -> String {
        artifact::render(self)
    }

    /// Stable fingerprint of the compiled model.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        artifact::fingerprint(&self.artifact())
    }
}
