//! Semantic checks over a resolved schema.
//!
//! Every check runs and every issue is collected; callers decide whether the
//! list is empty.

use std::collections::HashMap;

use ontoloom_foundation::{AttributeType, IssueCode, ValidationIssue};

use crate::document::{ClassDef, ReferenceDef, SchemaDocument};
use crate::hierarchy::Hierarchy;

/// Runs all semantic checks on `doc` resolved as `hierarchy`.
#[must_use]
pub fn validate(doc: &SchemaDocument, hierarchy: &Hierarchy) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    check_names(doc, &mut issues);
    check_composites(doc, &mut issues);

    let classes: HashMap<&str, &ClassDef> = doc
        .classes
        .iter()
        .map(|c| (c.name.as_str(), c))
        .rev()
        .collect();

    for class in &doc.classes {
        check_collection(class, &mut issues);
        check_attribute_types(doc, class, &mut issues);
        check_reference_targets(&classes, class, &mut issues);
    }
    for name in hierarchy.order() {
        let Some(class) = classes.get(name.as_str()) else {
            continue;
        };
        check_keys(class, hierarchy, &mut issues);
        check_inverses(class, hierarchy, &mut issues);
        check_reference_case(class, hierarchy, &mut issues);
    }
    issues
}

fn issue(code: IssueCode, message: String, class: &str, line: Option<usize>) -> ValidationIssue {
    let issue = ValidationIssue::new(code, message).in_class(class);
    match line {
        Some(line) => issue.at_line(line),
        None => issue,
    }
}

fn check_names(doc: &SchemaDocument, issues: &mut Vec<ValidationIssue>) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let declared = doc
        .classes
        .iter()
        .map(|c| (c.name.as_str(), c.line))
        .chain(doc.composites.iter().map(|c| (c.name.as_str(), c.line)));
    for (name, line) in declared {
        let count = seen.entry(name).or_insert(0);
        *count += 1;
        if *count == 2 {
            issues.push(issue(
                IssueCode::DuplicateClassName,
                format!("{name} is declared more than once"),
                name,
                line,
            ));
        }
    }
}

fn check_composites(doc: &SchemaDocument, issues: &mut Vec<ValidationIssue>) {
    for composite in &doc.composites {
        let mut names = Vec::new();
        for field in &composite.attributes {
            if names.contains(&field.name.as_str()) {
                issues.push(
                    issue(
                        IssueCode::DuplicateField,
                        format!("{} is declared twice", field.name),
                        &composite.name,
                        field.line,
                    )
                    .on_field(&field.name),
                );
            }
            names.push(field.name.as_str());
            if !field.ty.is_primitive() {
                issues.push(
                    issue(
                        IssueCode::InvalidCompositeField,
                        format!("composite field {} must have a primitive type, not {}", field.name, field.ty),
                        &composite.name,
                        field.line,
                    )
                    .on_field(&field.name),
                );
            }
        }
    }
}

fn check_collection(class: &ClassDef, issues: &mut Vec<ValidationIssue>) {
    match (class.is_abstract, &class.collection) {
        (true, Some(collection)) => issues.push(issue(
            IssueCode::AbstractInstantiationRule,
            format!("abstract class declares collection {collection}"),
            &class.name,
            class.line,
        )),
        (false, None) => issues.push(issue(
            IssueCode::MissingCollection,
            "concrete class has no collection".to_string(),
            &class.name,
            class.line,
        )),
        _ => {}
    }
}

fn check_attribute_types(doc: &SchemaDocument, class: &ClassDef, issues: &mut Vec<ValidationIssue>) {
    for attribute in &class.attributes {
        if let AttributeType::Composite(name) = &attribute.ty {
            if !doc.composites.iter().any(|c| &c.name == name) {
                issues.push(
                    issue(
                        IssueCode::InvalidAttributeType,
                        format!("{name} is neither a primitive type nor a declared composite"),
                        &class.name,
                        attribute.line,
                    )
                    .on_field(&attribute.name),
                );
                continue;
            }
        }
        if attribute.is_key && attribute.ty != AttributeType::Text {
            issues.push(
                issue(
                    IssueCode::WrongKeyType,
                    format!("key attribute must be text, not {}", attribute.ty),
                    &class.name,
                    attribute.line,
                )
                .on_field(&attribute.name),
            );
        }
    }
}

fn check_reference_targets(
    classes: &HashMap<&str, &ClassDef>,
    class: &ClassDef,
    issues: &mut Vec<ValidationIssue>,
) {
    for reference in &class.references {
        if !classes.contains_key(reference.target.as_str()) {
            issues.push(
                issue(
                    IssueCode::DanglingReferenceTarget,
                    format!("reference targets undefined class {}", reference.target),
                    &class.name,
                    reference.line,
                )
                .on_field(&reference.name),
            );
        }
    }
}

fn check_keys(class: &ClassDef, hierarchy: &Hierarchy, issues: &mut Vec<ValidationIssue>) {
    let Some(table) = hierarchy.table(&class.name) else {
        return;
    };
    let keys: Vec<&str> = table
        .attributes
        .iter()
        .filter(|a| a.is_key)
        .map(|a| a.name.as_str())
        .collect();
    let declares_key = class.attributes.iter().any(|a| a.is_key);
    if keys.len() > 1 && declares_key {
        issues.push(issue(
            IssueCode::ExtraKeyAttribute,
            format!("{} key attributes: {}", keys.len(), keys.join(", ")),
            &class.name,
            class.line,
        ));
    } else if keys.is_empty() && !class.is_abstract {
        issues.push(issue(
            IssueCode::MissingKeyAttribute,
            "concrete class has no key attribute".to_string(),
            &class.name,
            class.line,
        ));
    }
}

fn check_inverses(class: &ClassDef, hierarchy: &Hierarchy, issues: &mut Vec<ValidationIssue>) {
    let lineage = hierarchy.lineage(&class.name);
    for reference in &class.references {
        let Some(inverse) = &reference.inverse else {
            continue;
        };
        let Some(target) = hierarchy.table(&reference.target) else {
            continue;
        };
        let problem = match target.reference(inverse) {
            None => Some(format!("{} declares no reference {inverse}", reference.target)),
            Some(reciprocal) if reciprocal.inverse.as_deref() != Some(reference.name.as_str()) => {
                Some(format!(
                    "{}.{inverse} does not declare {} as its inverse",
                    reference.target, reference.name
                ))
            }
            Some(reciprocal) if !lineage.contains(&reciprocal.target) => Some(format!(
                "{}.{inverse} targets {}, not {}",
                reference.target, reciprocal.target, class.name
            )),
            Some(_) => None,
        };
        if let Some(message) = problem {
            issues.push(
                issue(IssueCode::AsymmetricInverse, message, &class.name, reference.line)
                    .on_field(&reference.name),
            );
        }
    }
}

/// Edge labels are upper-cased reference names, so two references on one
/// class may not differ only in case.
fn check_reference_case(class: &ClassDef, hierarchy: &Hierarchy, issues: &mut Vec<ValidationIssue>) {
    let Some(table) = hierarchy.table(&class.name) else {
        return;
    };
    let declared = |names: &[ReferenceDef], name: &str| names.iter().any(|r| r.name == name);
    for (index, reference) in class.references.iter().enumerate() {
        let label = reference.name.to_uppercase();
        // Inherited names, or own names declared earlier, so each clash is
        // reported once.
        let clash = table.references.iter().find(|other| {
            other.name != reference.name
                && other.name.to_uppercase() == label
                && (declared(&class.references[..index], &other.name)
                    || !declared(&class.references, &other.name))
        });
        if let Some(other) = clash {
            issues.push(
                issue(
                    IssueCode::DuplicateField,
                    format!("{} differs from {} only in case", reference.name, other.name),
                    &class.name,
                    reference.line,
                )
                .on_field(&reference.name),
            );
        }
    }
}
