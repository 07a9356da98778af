use crate::ir::{BookmarkSpec, ParagraphSpec, RunSpec};
use crate::options::{BookmarkIds, DuplicatePolicy};
use crate::targets::TargetIndex;
use markup5ever_rcdom::Handle;
use std::collections::BTreeMap;

const NAME_HASH_MODULUS: u64 = 1_000_000;

/// FNV-1a over the UTF-8 bytes of `name`, reduced modulo 1,000,000.
pub fn name_hash_id(name: &str) -> u32 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in name.as_bytes() {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % NAME_HASH_MODULUS) as u32
}

/// Per-conversion state for bookmark emission.
#[derive(Debug)]
pub struct ConversionContext {
    ids: BookmarkIds,
    duplicates: DuplicatePolicy,
    targets: TargetIndex,
    next_id: u32,
    emitted: BTreeMap<String, usize>,
}

impl ConversionContext {
    pub fn new(ids: BookmarkIds, duplicates: DuplicatePolicy, targets: TargetIndex) -> Self {
        Self {
            ids,
            duplicates,
            targets,
            next_id: 0,
            emitted: BTreeMap::new(),
        }
    }

    pub fn targets(&self) -> &TargetIndex {
        &self.targets
    }

    fn allocate(&mut self, name: &str) -> u32 {
        match self.ids {
            BookmarkIds::Sequential => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
            BookmarkIds::NameHash => name_hash_id(name),
        }
    }

    /// Whether `node` gets the marker pair for `name` under the duplicate
    /// policy. With `LastWins` only the element the name resolves to does.
    pub fn marks(&self, node: &Handle, name: &str) -> bool {
        match self.duplicates {
            DuplicatePolicy::Keep => true,
            DuplicatePolicy::LastWins => self.targets.resolves_to(name, node),
        }
    }

    /// Wraps the runs of `node` in a marker pair named `name`, or returns them
    /// unchanged when the duplicate policy gives the name to another element.
    pub fn bookmark_element(
        &mut self,
        node: &Handle,
        name: &str,
        runs: Vec<RunSpec>,
    ) -> Vec<RunSpec> {
        if self.marks(node, name) {
            return self.bookmark(name, runs);
        }
        tracing::debug!(%name, "name resolves to a later element; keeping text only");
        *self.emitted.entry(name.to_string()).or_default() += 1;
        runs
    }

    /// Wraps `runs` in a marker pair named `name`.
    pub fn bookmark(&mut self, name: &str, runs: Vec<RunSpec>) -> Vec<RunSpec> {
        *self.emitted.entry(name.to_string()).or_default() += 1;
        let id = self.allocate(name);
        tracing::trace!(%name, id, "bookmark");
        vec![RunSpec::Bookmarked {
            bookmark: BookmarkSpec {
                id,
                name: name.to_string(),
            },
            runs,
        }]
    }

    /// Names that were requested as bookmarks, with how often.
    pub fn requested_bookmarks(&self) -> &BTreeMap<String, usize> {
        &self.emitted
    }

    pub fn emit_bookmark(&mut self, paragraph: &mut ParagraphSpec, name: &str, text: &str) {
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![RunSpec::Text(text.to_string())]
        };
        let wrapped = self.bookmark(name, runs);
        paragraph.runs.extend(wrapped);
    }
}

pub fn emit_internal_link(paragraph: &mut ParagraphSpec, display_text: &str, target_name: &str) {
    paragraph.runs.push(RunSpec::InternalLink {
        text: display_text.to_string(),
        anchor: target_name.to_string(),
    });
}

pub fn emit_external_link(paragraph: &mut ParagraphSpec, display_text: &str, url: &str) {
    paragraph.runs.push(RunSpec::ExternalLink {
        text: display_text.to_string(),
        url: url.to_string(),
    });
}

pub fn emit_text(paragraph: &mut ParagraphSpec, text: &str) {
    if !text.is_empty() {
        paragraph.runs.push(RunSpec::Text(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{body_children, parse_html};
    use crate::ir::ParagraphStyle;
    use crate::options::ConvertOptions;
    use crate::targets::collect_targets;

    fn context(ids: BookmarkIds, duplicates: DuplicatePolicy) -> ConversionContext {
        ConversionContext::new(ids, duplicates, TargetIndex::default())
    }

    #[test]
    fn bookmark_wraps_the_text_run() {
        let mut ctx = context(BookmarkIds::Sequential, DuplicatePolicy::Keep);
        let mut p = ParagraphSpec::new(ParagraphStyle::Normal);
        ctx.emit_bookmark(&mut p, "intro", "Introduction");
        assert_eq!(
            p.runs,
            vec![RunSpec::Bookmarked {
                bookmark: BookmarkSpec {
                    id: 0,
                    name: "intro".into()
                },
                runs: vec![RunSpec::Text("Introduction".into())],
            }]
        );
    }

    #[test]
    fn sequential_ids_follow_emission_order() {
        let mut ctx = context(BookmarkIds::Sequential, DuplicatePolicy::Keep);
        let mut p = ParagraphSpec::new(ParagraphStyle::Normal);
        ctx.emit_bookmark(&mut p, "b", "");
        ctx.emit_bookmark(&mut p, "a", "");
        let ids: Vec<u32> = p
            .runs
            .iter()
            .filter_map(|r| match r {
                RunSpec::Bookmarked { bookmark, .. } => Some(bookmark.id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn name_hash_is_pure_and_bounded() {
        assert_eq!(name_hash_id("details"), name_hash_id("details"));
        assert!(name_hash_id("details") < 1_000_000);
        assert_ne!(name_hash_id("intro"), name_hash_id("details"));
    }

    #[test]
    fn last_wins_marks_only_the_resolved_element() {
        let dom = parse_html(r#"<p id="x">one</p><p id="x">two</p>"#);
        let targets = collect_targets(&dom, &ConvertOptions::default());
        let mut ctx =
            ConversionContext::new(BookmarkIds::Sequential, DuplicatePolicy::LastWins, targets);
        let children = body_children(&dom);

        let first = ctx.bookmark_element(&children[0], "x", vec![RunSpec::Text("one".into())]);
        let second = ctx.bookmark_element(&children[1], "x", vec![RunSpec::Text("two".into())]);
        assert_eq!(first, vec![RunSpec::Text("one".into())]);
        assert_eq!(
            second,
            vec![RunSpec::Bookmarked {
                bookmark: BookmarkSpec {
                    id: 0,
                    name: "x".into()
                },
                runs: vec![RunSpec::Text("two".into())],
            }]
        );
        assert_eq!(ctx.requested_bookmarks()["x"], 2);
    }

    #[test]
    fn keep_marks_every_element() {
        let dom = parse_html(r#"<p id="x">one</p><p id="x">two</p>"#);
        let targets = collect_targets(&dom, &ConvertOptions::default());
        let ctx = ConversionContext::new(BookmarkIds::Sequential, DuplicatePolicy::Keep, targets);
        let children = body_children(&dom);
        assert!(ctx.marks(&children[0], "x"));
        assert!(ctx.marks(&children[1], "x"));
    }

    #[test]
    fn duplicate_names_repeat_under_keep() {
        let mut ctx = context(BookmarkIds::NameHash, DuplicatePolicy::Keep);
        let mut p = ParagraphSpec::new(ParagraphStyle::Normal);
        ctx.emit_bookmark(&mut p, "x", "one");
        ctx.emit_bookmark(&mut p, "x", "two");
        assert_eq!(p.runs.len(), 2);
        assert!(p
            .runs
            .iter()
            .all(|r| matches!(r, RunSpec::Bookmarked { bookmark, .. } if bookmark.id == name_hash_id("x"))));
    }

    #[test]
    fn internal_link_is_not_checked() {
        let mut p = ParagraphSpec::new(ParagraphStyle::Normal);
        emit_internal_link(&mut p, "Go", "nowhere");
        assert_eq!(
            p.runs,
            vec![RunSpec::InternalLink {
                text: "Go".into(),
                anchor: "nowhere".into()
            }]
        );
    }
}
