//! Schema document: the declared classes and composites, before resolution.
//!
//! A [`SchemaDocument`] can be read from XML or built in code with the
//! `with_*` builders. Reading collects every structural problem instead of
//! stopping at the first one.

use ontoloom_foundation::{AttributeType, IssueCode, Multiplicity, ValidationIssue};

use crate::xml::{self, Element, Node};

/// Declared attribute of a class or composite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDef {
    /// Attribute name.
    pub name: String,
    /// Declared type.
    pub ty: AttributeType,
    /// Whether a value must be present.
    pub required: bool,
    /// Whether this is the identifying key.
    pub is_key: bool,
    /// Whether the store indexes this attribute.
    pub indexed: bool,
    /// Document line, if read from a document.
    pub line: Option<usize>,
}

impl AttributeDef {
    /// Creates an optional, unindexed attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: AttributeType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            is_key: false,
            indexed: false,
            line: None,
        }
    }

    /// Creates a text key attribute.
    #[must_use]
    pub fn key(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Text).as_key()
    }

    /// Marks this attribute as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks this attribute as the key. Keys are always required.
    #[must_use]
    pub fn as_key(mut self) -> Self {
        self.is_key = true;
        self.required = true;
        self
    }

    /// Marks this attribute as indexed.
    #[must_use]
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// Declared reference of a class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceDef {
    /// Reference name.
    pub name: String,
    /// Declared target class.
    pub target: String,
    /// Cardinality.
    pub multiplicity: Multiplicity,
    /// Whether the slot must be non-empty.
    pub required: bool,
    /// Name of the reciprocal reference on the target, if any.
    pub inverse: Option<String>,
    /// Document line, if read from a document.
    pub line: Option<usize>,
}

impl ReferenceDef {
    /// Creates an optional reference without inverse.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            multiplicity,
            required: false,
            inverse: None,
            line: None,
        }
    }

    /// Marks this reference as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Declares the reciprocal reference on the target class.
    #[must_use]
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }
}

/// Declared class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    /// Class name, unique across classes and composites.
    pub name: String,
    /// Abstract classes have no instances and no collection.
    pub is_abstract: bool,
    /// Parent class, if any.
    pub extends: Option<String>,
    /// Collection (storage partition) for concrete classes.
    pub collection: Option<String>,
    /// Own attributes in declaration order.
    pub attributes: Vec<AttributeDef>,
    /// Own references in declaration order.
    pub references: Vec<ReferenceDef>,
    /// Document line, if read from a document.
    pub line: Option<usize>,
}

impl ClassDef {
    /// Creates an empty concrete class.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_abstract: false,
            extends: None,
            collection: None,
            attributes: Vec::new(),
            references: Vec::new(),
            line: None,
        }
    }

    /// Marks this class as abstract.
    #[must_use]
    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Sets the parent class.
    #[must_use]
    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Sets the collection.
    #[must_use]
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds a reference.
    #[must_use]
    pub fn with_reference(mut self, reference: ReferenceDef) -> Self {
        self.references.push(reference);
        self
    }
}

/// Declared identity-less value shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompositeDef {
    /// Composite name.
    pub name: String,
    /// Fields in declaration order.
    pub attributes: Vec<AttributeDef>,
    /// Document line, if read from a document.
    pub line: Option<usize>,
}

impl CompositeDef {
    /// Creates an empty composite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            line: None,
        }
    }

    /// Adds a field.
    #[must_use]
    pub fn with_attribute(mut self, attribute: AttributeDef) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Root container of class and composite declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaDocument {
    /// Classes in document order.
    pub classes: Vec<ClassDef>,
    /// Composites in document order.
    pub composites: Vec<CompositeDef>,
}

const ROOT_ELEMENTS: &[&str] = &["Classes", "Entities", "Schema"];
const CLASS_ELEMENTS: &[&str] = &["Class", "ModelObject"];

impl SchemaDocument {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class.
    #[must_use]
    pub fn with_class(mut self, class: ClassDef) -> Self {
        self.classes.push(class);
        self
    }

    /// Adds a composite.
    #[must_use]
    pub fn with_composite(mut self, composite: CompositeDef) -> Self {
        self.composites.push(composite);
        self
    }

    /// Reads a document from XML text.
    ///
    /// Returns the declarations that could be read together with every
    /// structural issue found. A document that is not well-formed XML yields
    /// an empty document and a single issue.
    #[must_use]
    pub fn read(source: &str) -> (Self, Vec<ValidationIssue>) {
        let mut issues = Vec::new();
        let root = match xml::parse(source) {
            Ok(root) => root,
            Err(err) => {
                issues.push(
                    ValidationIssue::new(IssueCode::StructuralError, err.message)
                        .at_line(err.line),
                );
                return (Self::default(), issues);
            }
        };

        let mut doc = Self::default();
        if !ROOT_ELEMENTS.contains(&root.name.as_str()) {
            issues.push(
                ValidationIssue::new(
                    IssueCode::StructuralError,
                    format!("unexpected root element <{}>", root.name),
                )
                .at_line(root.line),
            );
            return (doc, issues);
        }
        check_no_stray_text(&root, None, &mut issues);

        for element in root.elements() {
            if CLASS_ELEMENTS.contains(&element.name.as_str()) {
                if let Some(class) = read_class(element, &mut issues) {
                    doc.classes.push(class);
                }
            } else if element.name == "Composite" {
                if let Some(composite) = read_composite(element, &mut issues) {
                    doc.composites.push(composite);
                }
            } else {
                issues.push(
                    ValidationIssue::new(
                        IssueCode::StructuralError,
                        format!("unexpected element <{}>", element.name),
                    )
                    .at_line(element.line),
                );
            }
        }
        (doc, issues)
    }
}

fn structural(message: impl Into<String>, line: usize) -> ValidationIssue {
    ValidationIssue::new(IssueCode::StructuralError, message).at_line(line)
}

fn check_no_stray_text(element: &Element, class: Option<&str>, issues: &mut Vec<ValidationIssue>) {
    for node in &element.children {
        if let Node::Text(text) = node {
            if !text.trim().is_empty() {
                let mut issue = structural(
                    format!("unexpected text {:?} in <{}>", text.trim(), element.name),
                    element.line,
                );
                if let Some(class) = class {
                    issue = issue.in_class(class);
                }
                issues.push(issue);
                return;
            }
        }
    }
}

fn check_attributes(
    element: &Element,
    allowed: &[&str],
    class: Option<&str>,
    issues: &mut Vec<ValidationIssue>,
) {
    for (name, _) in &element.attributes {
        if !allowed.contains(&name.as_str()) {
            let mut issue = structural(
                format!("unexpected attribute '{name}' on <{}>", element.name),
                element.line,
            );
            if let Some(class) = class {
                issue = issue.in_class(class);
            }
            issues.push(issue);
        }
    }
}

/// Reads an optional `true`/`false` flag. Anything else is an issue.
fn read_flag(
    element: &Element,
    name: &str,
    class: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<bool> {
    match element.attribute(name)? {
        "true" => Some(true),
        "false" => Some(false),
        other => {
            issues.push(
                structural(
                    format!("invalid value '{other}' for '{name}', expected true or false"),
                    element.line,
                )
                .in_class(class),
            );
            None
        }
    }
}

fn read_class(element: &Element, issues: &mut Vec<ValidationIssue>) -> Option<ClassDef> {
    let Some(name) = element.attribute("name").filter(|n| !n.trim().is_empty()) else {
        issues.push(structural(
            format!("<{}> is missing its 'name' attribute", element.name),
            element.line,
        ));
        return None;
    };
    let name = name.trim();
    check_attributes(element, &["name", "is_abstract", "extends"], Some(name), issues);
    check_no_stray_text(element, Some(name), issues);

    let mut class = ClassDef::new(name);
    class.line = Some(element.line);
    class.is_abstract = read_flag(element, "is_abstract", name, issues).unwrap_or(false);

    if let Some(extends) = element.attribute("extends") {
        let parents: Vec<&str> = extends
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        match parents.as_slice() {
            [] => issues.push(structural("empty 'extends' attribute", element.line).in_class(name)),
            [parent] => class.extends = Some((*parent).to_string()),
            [first, ..] => {
                issues.push(
                    ValidationIssue::new(
                        IssueCode::MultipleInheritance,
                        format!("extends {} classes: {}", parents.len(), parents.join(", ")),
                    )
                    .in_class(name)
                    .at_line(element.line),
                );
                class.extends = Some((*first).to_string());
            }
        }
    }

    for child in element.elements() {
        match child.name.as_str() {
            "Collection" => {
                check_attributes(child, &[], Some(name), issues);
                if child.elements().next().is_some() {
                    issues.push(
                        structural("unexpected sub-elements in <Collection>", child.line)
                            .in_class(name),
                    );
                }
                let text = child.text();
                if text.is_empty() {
                    issues.push(
                        structural("missing text content in <Collection>", child.line)
                            .in_class(name),
                    );
                } else if class.collection.is_some() {
                    issues.push(
                        structural("more than one <Collection>", child.line).in_class(name),
                    );
                } else {
                    class.collection = Some(text);
                }
            }
            "Attribute" => {
                if let Some(attribute) = read_attribute(child, name, true, issues) {
                    class.attributes.push(attribute);
                }
            }
            "Reference" => {
                if let Some(reference) = read_reference(child, name, issues) {
                    class.references.push(reference);
                }
            }
            other => issues.push(
                structural(format!("unexpected element <{other}>"), child.line).in_class(name),
            ),
        }
    }
    Some(class)
}

fn read_attribute(
    element: &Element,
    owner: &str,
    in_class: bool,
    issues: &mut Vec<ValidationIssue>,
) -> Option<AttributeDef> {
    let allowed: &[&str] = if in_class {
        &["type", "is_key", "required", "indexed"]
    } else {
        &["type", "required", "indexed"]
    };
    check_attributes(element, allowed, Some(owner), issues);

    let name = element.text();
    if name.is_empty() {
        issues.push(
            structural("missing attribute name (text content) in <Attribute>", element.line)
                .in_class(owner),
        );
        return None;
    }
    let Some(type_name) = element.attribute("type") else {
        issues.push(
            structural("missing 'type' on <Attribute>", element.line)
                .in_class(owner)
                .on_field(&name),
        );
        return None;
    };
    let ty = AttributeType::primitive(type_name)
        .unwrap_or_else(|| AttributeType::Composite(type_name.to_string()));

    let is_key = read_flag(element, "is_key", owner, issues).unwrap_or(false);
    let required = read_flag(element, "required", owner, issues);
    let indexed = read_flag(element, "indexed", owner, issues).unwrap_or(false);

    let required = match (is_key, required) {
        (true, Some(false)) => {
            issues.push(
                structural("key attribute cannot be optional", element.line)
                    .in_class(owner)
                    .on_field(&name),
            );
            true
        }
        (true, _) => true,
        (false, Some(required)) => required,
        (false, None) if in_class && element.attribute("required").is_none() => {
            issues.push(
                structural("missing 'required' on non-key <Attribute>", element.line)
                    .in_class(owner)
                    .on_field(&name),
            );
            false
        }
        (false, None) => false,
    };

    Some(AttributeDef {
        name,
        ty,
        required,
        is_key,
        indexed,
        line: Some(element.line),
    })
}

fn read_reference(
    element: &Element,
    owner: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<ReferenceDef> {
    check_attributes(
        element,
        &["type", "multiplicity", "required", "inverse"],
        Some(owner),
        issues,
    );
    let name = element.text();
    if name.is_empty() {
        issues.push(
            structural("missing reference name (text content) in <Reference>", element.line)
                .in_class(owner),
        );
        return None;
    }

    let mut complete = true;
    for required in ["type", "multiplicity", "required"] {
        if element.attribute(required).is_none() {
            issues.push(
                structural(format!("missing '{required}' on <Reference>"), element.line)
                    .in_class(owner)
                    .on_field(&name),
            );
            complete = false;
        }
    }
    let multiplicity = match element.attribute("multiplicity") {
        Some(raw) => match Multiplicity::parse(raw) {
            Some(m) => Some(m),
            None => {
                issues.push(
                    structural(
                        format!("invalid multiplicity '{raw}', expected mono or multi"),
                        element.line,
                    )
                    .in_class(owner)
                    .on_field(&name),
                );
                None
            }
        },
        None => None,
    };
    let required = read_flag(element, "required", owner, issues);
    let (Some(target), Some(multiplicity), Some(required), true) =
        (element.attribute("type"), multiplicity, required, complete)
    else {
        return None;
    };

    Some(ReferenceDef {
        name,
        target: target.to_string(),
        multiplicity,
        required,
        inverse: element
            .attribute("inverse")
            .filter(|i| !i.trim().is_empty())
            .map(|i| i.trim().to_string()),
        line: Some(element.line),
    })
}

fn read_composite(element: &Element, issues: &mut Vec<ValidationIssue>) -> Option<CompositeDef> {
    let Some(name) = element.attribute("name").filter(|n| !n.trim().is_empty()) else {
        issues.push(structural(
            "<Composite> is missing its 'name' attribute",
            element.line,
        ));
        return None;
    };
    let name = name.trim();
    check_attributes(element, &["name"], Some(name), issues);
    check_no_stray_text(element, Some(name), issues);

    let mut composite = CompositeDef::new(name);
    composite.line = Some(element.line);
    for child in element.elements() {
        if child.name == "Attribute" {
            if let Some(attribute) = read_attribute(child, name, false, issues) {
                composite.attributes.push(attribute);
            }
        } else {
            issues.push(
                structural(format!("unexpected element <{}> in <Composite>", child.name), child.line)
                    .in_class(name),
            );
        }
    }
    Some(composite)
}
