use crate::ir::DocumentSpec;
use crate::targets::TargetIndex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const W_LINK_DANGLING: &str = "W_LINK_DANGLING";
pub const W_LINK_UNANCHORED: &str = "W_LINK_UNANCHORED";
pub const W_TARGET_DUPLICATE: &str = "W_TARGET_DUPLICATE";
pub const W_BOOKMARK_DUPLICATE: &str = "W_BOOKMARK_DUPLICATE";
pub const W_BOOKMARK_ID_COLLISION: &str = "W_BOOKMARK_ID_COLLISION";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// Bookmark or link target the diagnostic is about.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn warning(code: &'static str, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{level}[{}]: {}", self.code, self.message)
    }
}

/// Checks links against targets and bookmarks against each other.
pub fn validate(targets: &TargetIndex, document: &DocumentSpec) -> Vec<Diagnostic> {
    let mut out = Vec::new();

    let bookmarks = document.bookmarks();
    let bookmark_names: BTreeSet<&str> = bookmarks.iter().map(|b| b.name.as_str()).collect();

    let mut seen_links = BTreeSet::new();
    for (_, anchor) in document.internal_links() {
        if !seen_links.insert(anchor) {
            continue;
        }
        if !targets.contains(anchor) {
            out.push(Diagnostic::warning(
                W_LINK_DANGLING,
                anchor,
                format!("link to `#{anchor}` has no matching id or anchor name"),
            ));
        } else if !bookmark_names.contains(anchor) {
            out.push(Diagnostic::warning(
                W_LINK_UNANCHORED,
                anchor,
                format!("`#{anchor}` is defined in the HTML but no bookmark was emitted for it"),
            ));
        }
    }

    for (name, target) in targets.iter() {
        if target.definitions > 1 {
            out.push(Diagnostic::warning(
                W_TARGET_DUPLICATE,
                name,
                format!(
                    "`{name}` is defined by {} elements; the last one wins",
                    target.definitions
                ),
            ));
        }
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut by_id: BTreeMap<u32, BTreeSet<&str>> = BTreeMap::new();
    for b in &bookmarks {
        *counts.entry(b.name.as_str()).or_default() += 1;
        by_id.entry(b.id).or_default().insert(b.name.as_str());
    }
    for (name, count) in counts {
        if count > 1 {
            out.push(Diagnostic::warning(
                W_BOOKMARK_DUPLICATE,
                name,
                format!("bookmark `{name}` is emitted {count} times"),
            ));
        }
    }
    for (id, names) in by_id {
        if names.len() > 1 {
            let list: Vec<&str> = names.into_iter().collect();
            out.push(Diagnostic::warning(
                W_BOOKMARK_ID_COLLISION,
                list.join(","),
                format!("bookmarks {} share id {id}", list.join(", ")),
            ));
        }
    }

    for d in &out {
        tracing::warn!(code = d.code, subject = %d.subject, "{}", d.message);
    }
    out
}
