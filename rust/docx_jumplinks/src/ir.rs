//! Document structure produced by the transcriber and consumed by the
//! serialization adapters. Nothing here knows about the output container.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkSpec {
    pub id: u32,
    pub name: String,
}

/// Character formatting carried by a [`RunSpec::Styled`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl RunStyle {
    pub fn is_plain(&self) -> bool {
        *self == RunStyle::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSpec {
    Text(String),
    Styled { text: String, style: RunStyle },
    /// Runs enclosed by a start/end marker pair. May be empty (a point bookmark).
    Bookmarked {
        bookmark: BookmarkSpec,
        runs: Vec<RunSpec>,
    },
    /// Jump to a bookmark by name.
    InternalLink { text: String, anchor: String },
    ExternalLink { text: String, url: String },
}

impl RunSpec {
    /// A `Text` run when `style` is plain, otherwise `Styled`.
    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        if style.is_plain() {
            RunSpec::Text(text.into())
        } else {
            RunSpec::Styled {
                text: text.into(),
                style,
            }
        }
    }

    pub fn plain_text(&self) -> String {
        match self {
            RunSpec::Text(text) | RunSpec::Styled { text, .. } => text.clone(),
            RunSpec::InternalLink { text, .. } | RunSpec::ExternalLink { text, .. } => text.clone(),
            RunSpec::Bookmarked { runs, .. } => runs.iter().map(RunSpec::plain_text).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Normal,
    Title,
    Heading(u8),
}

impl ParagraphStyle {
    pub fn for_tag(tag: &str) -> Self {
        match tag {
            "h1" => ParagraphStyle::Heading(1),
            "h2" => ParagraphStyle::Heading(2),
            "h3" => ParagraphStyle::Heading(3),
            "h4" => ParagraphStyle::Heading(4),
            "h5" => ParagraphStyle::Heading(5),
            "h6" => ParagraphStyle::Heading(6),
            _ => ParagraphStyle::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphSpec {
    pub style: ParagraphStyle,
    pub runs: Vec<RunSpec>,
}

impl ParagraphSpec {
    pub fn new(style: ParagraphStyle) -> Self {
        Self {
            style,
            runs: Vec::new(),
        }
    }

    pub fn plain_text(&self) -> String {
        self.runs.iter().map(RunSpec::plain_text).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSpec {
    pub title: String,
    pub paragraphs: Vec<ParagraphSpec>,
}

impl DocumentSpec {
    /// Every marker pair in document order, outer before inner.
    pub fn bookmarks(&self) -> Vec<&BookmarkSpec> {
        fn walk<'a>(runs: &'a [RunSpec], out: &mut Vec<&'a BookmarkSpec>) {
            for run in runs {
                if let RunSpec::Bookmarked { bookmark, runs } = run {
                    out.push(bookmark);
                    walk(runs, out);
                }
            }
        }
        let mut out = Vec::new();
        for p in &self.paragraphs {
            walk(&p.runs, &mut out);
        }
        out
    }

    /// `(display text, anchor)` for every internal link in document order.
    pub fn internal_links(&self) -> Vec<(&str, &str)> {
        fn walk<'a>(runs: &'a [RunSpec], out: &mut Vec<(&'a str, &'a str)>) {
            for run in runs {
                match run {
                    RunSpec::InternalLink { text, anchor } => out.push((text.as_str(), anchor.as_str())),
                    RunSpec::Bookmarked { runs, .. } => walk(runs, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        for p in &self.paragraphs {
            walk(&p.runs, &mut out);
        }
        out
    }

    pub fn external_urls(&self) -> Vec<&str> {
        fn walk<'a>(runs: &'a [RunSpec], out: &mut Vec<&'a str>) {
            for run in runs {
                match run {
                    RunSpec::ExternalLink { url, .. } => out.push(url.as_str()),
                    RunSpec::Bookmarked { runs, .. } => walk(runs, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        for p in &self.paragraphs {
            walk(&p.runs, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_descend_into_bookmarks() {
        let doc = DocumentSpec {
            title: "t".into(),
            paragraphs: vec![ParagraphSpec {
                style: ParagraphStyle::Normal,
                runs: vec![RunSpec::Bookmarked {
                    bookmark: BookmarkSpec {
                        id: 0,
                        name: "outer".into(),
                    },
                    runs: vec![
                        RunSpec::Text("see ".into()),
                        RunSpec::InternalLink {
                            text: "here".into(),
                            anchor: "x".into(),
                        },
                        RunSpec::Bookmarked {
                            bookmark: BookmarkSpec {
                                id: 1,
                                name: "inner".into(),
                            },
                            runs: vec![],
                        },
                    ],
                }],
            }],
        };
        let names: Vec<_> = doc.bookmarks().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
        assert_eq!(doc.internal_links(), vec![("here", "x")]);
        assert_eq!(doc.paragraphs[0].plain_text(), "see here");
    }

    #[test]
    fn plain_style_collapses_to_text() {
        assert_eq!(
            RunSpec::styled("x", RunStyle::default()),
            RunSpec::Text("x".into())
        );
        let bold = RunStyle {
            bold: true,
            ..Default::default()
        };
        let run = RunSpec::styled("y", bold);
        assert_eq!(
            run,
            RunSpec::Styled {
                text: "y".into(),
                style: bold
            }
        );
        assert_eq!(run.plain_text(), "y");
    }
}
