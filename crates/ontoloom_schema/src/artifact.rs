//! Generated model artifact.
//!
//! A plain-text listing of the compiled model, written next to the schema in
//! the blob store after every successful load. The same text feeds the model
//! fingerprint used as the store's schema marker.

use std::fmt::Write;

use crate::model::ObjectModel;

/// Renders the artifact for `model`.
#[must_use]
pub fn render(model: &ObjectModel) -> String {
    let mut out = String::new();
    for descriptor in model.classes() {
        let _ = write!(out, "class {}", descriptor.name);
        if descriptor.lineage.len() > 1 {
            let _ = write!(out, " extends {}", descriptor.lineage[1..].join(" < "));
        }
        let _ = writeln!(out, "\n  collection {}", descriptor.collection);
        for slot in &descriptor.attributes {
            let _ = write!(out, "  attribute {} {}", slot.name, slot.ty);
            for (flag, set) in [
                ("key", slot.is_key),
                ("required", slot.required),
                ("indexed", slot.indexed),
            ] {
                if set {
                    let _ = write!(out, " {flag}");
                }
            }
            out.push('\n');
        }
        for slot in &descriptor.references {
            let _ = write!(
                out,
                "  reference {} {} {}",
                slot.name, slot.multiplicity, slot.target
            );
            if slot.required {
                out.push_str(" required");
            }
            if let Some(inverse) = &slot.inverse {
                let _ = write!(out, " inverse {inverse}");
            }
            out.push('\n');
        }
    }

    for name in model.abstract_classes() {
        let _ = writeln!(out, "abstract {name}");
    }

    let mut composites: Vec<_> = model.composites().collect();
    composites.sort_by(|a, b| a.name.cmp(&b.name));
    for composite in composites {
        let _ = writeln!(out, "composite {}", composite.name);
        for field in &composite.fields {
            let _ = write!(out, "  field {} {}", field.name, field.ty);
            if field.required {
                out.push_str(" required");
            }
            out.push('\n');
        }
    }
    out
}

/// 64-bit FNV-1a digest of `text`, as 16 hex digits.
#[must_use]
pub fn fingerprint(text: &str) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    format!("{hash:016x}")
}
