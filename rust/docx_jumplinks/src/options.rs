use clap::ValueEnum;

/// Word refuses bookmark names longer than this.
pub const MAX_BOOKMARK_NAME_LEN: usize = 40;

pub const DEFAULT_TITLE: &str = "Converted Document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TraversalMode {
    /// One paragraph per body child; nested anchors become plain text.
    #[default]
    TopLevel,
    /// Recurse into body children, keeping nested links and bookmarks.
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BookmarkIds {
    /// 0, 1, 2, ... in emission order.
    #[default]
    Sequential,
    /// Hash of the name modulo 1,000,000. Distinct names may collide.
    NameHash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DuplicatePolicy {
    /// Emit a marker pair for every occurrence.
    #[default]
    Keep,
    /// Only the element the name resolves to (its last definition) gets
    /// markers; earlier definitions keep their text.
    LastWins,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Overrides the `<title>` of the input.
    pub title: Option<String>,
    pub title_heading: bool,
    pub traversal: TraversalMode,
    pub bookmark_ids: BookmarkIds,
    pub duplicates: DuplicatePolicy,
    /// Turn non-fragment hrefs into external hyperlinks instead of plain text.
    pub external_links: bool,
    /// `None` disables truncation.
    pub max_bookmark_name_len: Option<usize>,
    /// Fail on any diagnostic.
    pub strict: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            title: None,
            title_heading: false,
            traversal: TraversalMode::default(),
            bookmark_ids: BookmarkIds::default(),
            duplicates: DuplicatePolicy::default(),
            external_links: false,
            max_bookmark_name_len: Some(MAX_BOOKMARK_NAME_LEN),
            strict: false,
        }
    }
}

impl ConvertOptions {
    /// Applies the bookmark name length limit. Used on both bookmark names
    /// and link targets so the two keep matching.
    pub fn normalize_name(&self, name: &str) -> String {
        match self.max_bookmark_name_len {
            Some(max) if name.chars().count() > max => name.chars().take(max).collect(),
            _ => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated() {
        let opts = ConvertOptions::default();
        let long = "a".repeat(45);
        assert_eq!(opts.normalize_name(&long).len(), MAX_BOOKMARK_NAME_LEN);
        assert_eq!(opts.normalize_name("intro"), "intro");
    }

    #[test]
    fn truncation_can_be_disabled() {
        let opts = ConvertOptions {
            max_bookmark_name_len: None,
            ..Default::default()
        };
        let long = "b".repeat(60);
        assert_eq!(opts.normalize_name(&long), long);
    }
}
