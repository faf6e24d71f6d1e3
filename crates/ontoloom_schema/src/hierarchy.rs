//! Class hierarchy resolution.
//!
//! Builds the single-parent inheritance forest, detects cycles, orders classes
//! ancestors-first, and flattens each class's field table (inherited fields
//! first, own fields after, compatible overrides replaced in place).

use std::collections::{HashMap, HashSet};

use ontoloom_foundation::{IssueCode, ValidationIssue};

use crate::document::{AttributeDef, ClassDef, ReferenceDef, SchemaDocument};

/// Flattened attribute and reference definitions of one class.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldTable {
    /// Attributes, root ancestor's first.
    pub attributes: Vec<AttributeDef>,
    /// References, root ancestor's first.
    pub references: Vec<ReferenceDef>,
}

impl FieldTable {
    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDef> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Looks up a reference by name.
    #[must_use]
    pub fn reference(&self, name: &str) -> Option<&ReferenceDef> {
        self.references.iter().find(|r| r.name == name)
    }
}

/// The resolved inheritance forest.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    order: Vec<String>,
    parents: HashMap<String, String>,
    tables: HashMap<String, FieldTable>,
}

impl Hierarchy {
    /// Resolves the hierarchy of `doc`.
    ///
    /// Classes caught in a cycle, or descending from one, get no field table.
    /// A class whose parent is undefined is treated as a root so its own
    /// fields are still checked.
    #[must_use]
    pub fn resolve(doc: &SchemaDocument) -> (Self, Vec<ValidationIssue>) {
        let mut issues = Vec::new();
        let mut classes: HashMap<&str, &ClassDef> = HashMap::new();
        for class in &doc.classes {
            classes.entry(class.name.as_str()).or_insert(class);
        }

        let mut parents = HashMap::new();
        for class in &doc.classes {
            let Some(parent) = &class.extends else {
                continue;
            };
            if classes.contains_key(parent.as_str()) {
                parents
                    .entry(class.name.clone())
                    .or_insert_with(|| parent.clone());
            } else {
                issues.push(located(
                    ValidationIssue::new(
                        IssueCode::UnknownBaseClass,
                        format!("extends undefined class {parent}"),
                    )
                    .in_class(&class.name),
                    class.line,
                ));
            }
        }

        let cyclic = find_cycles(doc, &parents, &mut issues);

        let mut hierarchy = Self {
            order: Vec::new(),
            parents,
            tables: HashMap::new(),
        };
        let mut placed: HashSet<String> = HashSet::new();
        for class in &doc.classes {
            let mut chain = vec![class.name.as_str()];
            let mut broken = cyclic.contains(class.name.as_str());
            while let Some(parent) = hierarchy.parents.get(*chain.last().unwrap_or(&"")) {
                if cyclic.contains(parent.as_str()) {
                    broken = true;
                    break;
                }
                chain.push(parent);
            }
            if broken {
                continue;
            }
            for name in chain.into_iter().rev() {
                if placed.insert(name.to_string()) {
                    hierarchy.order.push(name.to_string());
                }
            }
        }

        for name in hierarchy.order.clone() {
            let Some(class) = classes.get(name.as_str()) else {
                continue;
            };
            let inherited = hierarchy
                .parents
                .get(&name)
                .and_then(|p| hierarchy.tables.get(p))
                .cloned()
                .unwrap_or_default();
            let table = flatten(class, inherited, &mut issues);
            hierarchy.tables.insert(name, table);
        }

        (hierarchy, issues)
    }

    /// Class names ordered so that every ancestor precedes its descendants.
    #[must_use]
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// The direct parent of `class`.
    #[must_use]
    pub fn parent(&self, class: &str) -> Option<&str> {
        self.parents.get(class).map(String::as_str)
    }

    /// `class` followed by its ancestors, nearest first.
    #[must_use]
    pub fn lineage(&self, class: &str) -> Vec<String> {
        let mut lineage = vec![class.to_string()];
        let mut current = class;
        while let Some(parent) = self.parent(current) {
            if lineage.iter().any(|c| c == parent) {
                break;
            }
            lineage.push(parent.to_string());
            current = parent;
        }
        lineage
    }

    /// The flattened field table of `class`, if it resolved.
    #[must_use]
    pub fn table(&self, class: &str) -> Option<&FieldTable> {
        self.tables.get(class)
    }
}

fn located(issue: ValidationIssue, line: Option<usize>) -> ValidationIssue {
    match line {
        Some(line) => issue.at_line(line),
        None => issue,
    }
}

/// Walks every parent chain once and reports each cycle a single time.
fn find_cycles(
    doc: &SchemaDocument,
    parents: &HashMap<String, String>,
    issues: &mut Vec<ValidationIssue>,
) -> HashSet<String> {
    let mut visited: HashMap<&str, usize> = HashMap::new();
    let mut cyclic = HashSet::new();

    for (walk, class) in doc.classes.iter().enumerate() {
        let mut path: Vec<&str> = Vec::new();
        let mut current = Some(class.name.as_str());
        while let Some(name) = current {
            match visited.get(name) {
                Some(&seen) if seen == walk => {
                    let start = path.iter().position(|c| *c == name).unwrap_or(0);
                    let mut members: Vec<&str> = path[start..].to_vec();
                    members.sort_unstable();
                    for member in &members {
                        cyclic.insert((*member).to_string());
                    }
                    let line = doc
                        .classes
                        .iter()
                        .find(|c| c.name == members[0])
                        .and_then(|c| c.line);
                    issues.push(located(
                        ValidationIssue::new(
                            IssueCode::InheritanceCycle,
                            format!("inheritance cycle: {}", members.join(" -> ")),
                        )
                        .in_class(members[0]),
                        line,
                    ));
                    break;
                }
                Some(_) => break,
                None => {
                    visited.insert(name, walk);
                    path.push(name);
                    current = parents.get(name).map(String::as_str);
                }
            }
        }
    }
    cyclic
}

fn flatten(class: &ClassDef, mut table: FieldTable, issues: &mut Vec<ValidationIssue>) -> FieldTable {
    let mut own: HashSet<&str> = HashSet::new();

    for attribute in &class.attributes {
        if !own.insert(&attribute.name) {
            issues.push(duplicate_field(class, &attribute.name, attribute.line));
            continue;
        }
        if table.reference(&attribute.name).is_some() {
            issues.push(conflicting(class, &attribute.name, attribute.line, "inherited as a reference"));
            continue;
        }
        match table.attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(inherited) if inherited.ty == attribute.ty => *inherited = attribute.clone(),
            Some(inherited) => {
                let reason = format!("inherited as {}, redefined as {}", inherited.ty, attribute.ty);
                issues.push(conflicting(class, &attribute.name, attribute.line, &reason));
            }
            None => table.attributes.push(attribute.clone()),
        }
    }

    for reference in &class.references {
        if !own.insert(&reference.name) {
            issues.push(duplicate_field(class, &reference.name, reference.line));
            continue;
        }
        if table.attribute(&reference.name).is_some() {
            issues.push(conflicting(class, &reference.name, reference.line, "inherited as an attribute"));
            continue;
        }
        match table.references.iter_mut().find(|r| r.name == reference.name) {
            Some(inherited)
                if inherited.target == reference.target
                    && inherited.multiplicity == reference.multiplicity =>
            {
                *inherited = reference.clone();
            }
            Some(inherited) => {
                let reason = format!(
                    "inherited as {} {}, redefined as {} {}",
                    inherited.multiplicity, inherited.target, reference.multiplicity, reference.target
                );
                issues.push(conflicting(class, &reference.name, reference.line, &reason));
            }
            None => table.references.push(reference.clone()),
        }
    }
    table
}

fn duplicate_field(class: &ClassDef, field: &str, line: Option<usize>) -> ValidationIssue {
    located(
        ValidationIssue::new(IssueCode::DuplicateField, format!("{field} is declared twice"))
            .in_class(&class.name)
            .on_field(field),
        line,
    )
}

fn conflicting(class: &ClassDef, field: &str, line: Option<usize>, reason: &str) -> ValidationIssue {
    located(
        ValidationIssue::new(IssueCode::ConflictingOverride, format!("{field} {reason}"))
            .in_class(&class.name)
            .on_field(field),
        line,
    )
}
