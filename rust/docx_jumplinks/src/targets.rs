use crate::html::{attr, has_class, is_anchor, tag_lower};
use crate::options::ConvertOptions;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::collections::BTreeMap;
use std::rc::Rc;

/// An element that defines a jump target.
#[derive(Clone)]
pub struct Target {
    pub tag: String,
    pub element: Handle,
    /// How many elements define this name.
    pub definitions: usize,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("tag", &self.tag)
            .field("definitions", &self.definitions)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TargetIndex {
    targets: BTreeMap<String, Target>,
}

impl TargetIndex {
    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Target)> {
        self.targets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether `name` resolves to `node` itself.
    pub fn resolves_to(&self, name: &str, node: &Handle) -> bool {
        self.targets
            .get(name)
            .is_some_and(|t| Rc::ptr_eq(&t.element, node))
    }

    fn define(&mut self, name: String, node: &Handle, tag: &str) {
        let definitions = self.targets.get(&name).map_or(0, |t| t.definitions) + 1;
        self.targets.insert(
            name,
            Target {
                tag: tag.to_string(),
                element: node.clone(),
                definitions,
            },
        );
    }
}

/// `<span class="bookmark" name="...">`: a bookmark named by `name`.
pub fn is_bookmark_span(node: &Handle) -> bool {
    tag_lower(node).as_deref() == Some("span") && has_class(node, "bookmark")
}

/// `<span class="anchor" id="...">`: a point bookmark ahead of its content.
pub fn is_anchor_span(node: &Handle) -> bool {
    tag_lower(node).as_deref() == Some("span") && has_class(node, "anchor")
}

fn normalized(node: &Handle, name: &str, options: &ConvertOptions) -> Option<String> {
    let value = options.normalize_name(&attr(node, name)?);
    (!value.is_empty()).then_some(value)
}

/// Identifiers an element defines: its `id`, then `name` on anchors and
/// bookmark spans. Empty values define nothing.
pub fn element_identifiers(node: &Handle, options: &ConvertOptions) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(id) = normalized(node, "id", options) {
        out.push(id);
    }
    if is_anchor(node) || is_bookmark_span(node) {
        if let Some(name) = normalized(node, "name", options) {
            if !out.contains(&name) {
                out.push(name);
            }
        }
    }
    out
}

/// Names the element is bookmarked under. A bookmark span is marked with
/// its `name` alone (its `id` only serves link lookup); other elements use
/// every identifier.
pub fn bookmark_names(node: &Handle, options: &ConvertOptions) -> Vec<String> {
    if is_bookmark_span(node) {
        let name = normalized(node, "name", options).or_else(|| normalized(node, "id", options));
        if let Some(name) = name {
            return vec![name];
        }
    }
    element_identifiers(node, options)
}

/// Walks the whole tree in document order. Later definitions of a name
/// replace earlier ones.
pub fn collect_targets(dom: &RcDom, options: &ConvertOptions) -> TargetIndex {
    fn walk(node: &Handle, options: &ConvertOptions, index: &mut TargetIndex) {
        if let NodeData::Element { .. } = &node.data {
            let tag = tag_lower(node).unwrap_or_default();
            for name in element_identifiers(node, options) {
                tracing::trace!(%name, %tag, "target");
                index.define(name, node, &tag);
            }
        }
        for c in node.children.borrow().iter() {
            walk(c, options, index);
        }
    }

    let mut index = TargetIndex::default();
    walk(&dom.document, options, &mut index);
    tracing::debug!(targets = index.len(), "collected jump targets");
    index
}
