use crate::emit::{emit_external_link, emit_internal_link, emit_text, ConversionContext};
use crate::html::{
    anchor_href, class_tokens, collapse_ws, flatten_text, has_class, is_anchor, sanitize_href,
    tag_lower,
};
use crate::ir::{ParagraphSpec, ParagraphStyle, RunSpec, RunStyle};
use crate::options::{ConvertOptions, TraversalMode};
use crate::targets::{bookmark_names, is_anchor_span, TargetIndex};
use markup5ever_rcdom::{Handle, NodeData};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Href {
    /// Bookmark name, already normalized.
    Internal(String),
    External(String),
}

/// `<a class="sec-2 anchor-link">` jumps to the element whose id is the first
/// other class token (or the href fragment), under that element's bookmark
/// name. Unknown ids are linked as-is.
fn anchor_link_target(
    node: &Handle,
    targets: &TargetIndex,
    options: &ConvertOptions,
) -> Option<String> {
    let id = class_tokens(node)
        .into_iter()
        .find(|c| c != "anchor-link")
        .or_else(|| anchor_href(node)?.strip_prefix('#').map(str::to_string))?;
    let id = options.normalize_name(&id);
    if id.is_empty() {
        return None;
    }
    let resolved = targets
        .get(&id)
        .and_then(|t| bookmark_names(&t.element, options).into_iter().next());
    Some(resolved.unwrap_or(id))
}

fn link_href(node: &Handle, targets: &TargetIndex, options: &ConvertOptions) -> Option<Href> {
    if !is_anchor(node) {
        return None;
    }
    if has_class(node, "anchor-link") {
        if let Some(name) = anchor_link_target(node, targets, options) {
            return Some(Href::Internal(name));
        }
    }
    let href = anchor_href(node)?;
    if let Some(target) = href.strip_prefix('#') {
        // a bare `#` names no bookmark
        let target = options.normalize_name(target);
        return (!target.is_empty()).then_some(Href::Internal(target));
    }
    if !options.external_links {
        return None;
    }
    sanitize_href(&href).map(Href::External)
}

fn link_run(node: &Handle, href: Href) -> RunSpec {
    let text = flatten_text(node);
    match href {
        Href::Internal(anchor) => RunSpec::InternalLink {
            text: if text.is_empty() { anchor.clone() } else { text },
            anchor,
        },
        Href::External(url) => RunSpec::ExternalLink {
            text: if text.is_empty() { url.clone() } else { text },
            url,
        },
    }
}

/// Wraps the runs of `node` in one marker pair per name, first name outermost.
fn wrap_bookmarks(
    ctx: &mut ConversionContext,
    node: &Handle,
    names: &[String],
    runs: Vec<RunSpec>,
) -> Vec<RunSpec> {
    names
        .iter()
        .rev()
        .fold(runs, |runs, name| ctx.bookmark_element(node, name, runs))
}

fn text_paragraph(raw: &str) -> Option<ParagraphSpec> {
    let text = collapse_ws(raw);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let mut p = ParagraphSpec::new(ParagraphStyle::Normal);
    emit_text(&mut p, text);
    Some(p)
}

/// Converts the children of `<body>` into paragraphs, one per text or
/// element child. Whitespace-only text and comments produce nothing.
pub fn transcribe(
    body_children: &[Handle],
    ctx: &mut ConversionContext,
    options: &ConvertOptions,
) -> Vec<ParagraphSpec> {
    let mut paragraphs = Vec::new();
    for child in body_children {
        let paragraph = match &child.data {
            NodeData::Text { contents } => text_paragraph(&contents.borrow()),
            NodeData::Element { .. } => Some(match options.traversal {
                TraversalMode::TopLevel => transcribe_top_level(child, ctx, options),
                TraversalMode::Nested => transcribe_nested(child, ctx, options),
            }),
            _ => None,
        };
        if let Some(p) = paragraph {
            tracing::trace!(style = ?p.style, runs = p.runs.len(), "paragraph");
            paragraphs.push(p);
        }
    }
    tracing::debug!(paragraphs = paragraphs.len(), mode = ?options.traversal, "transcribed body");
    paragraphs
}

fn transcribe_top_level(
    node: &Handle,
    ctx: &mut ConversionContext,
    options: &ConvertOptions,
) -> ParagraphSpec {
    let tag = tag_lower(node).unwrap_or_default();
    let mut paragraph = ParagraphSpec::new(ParagraphStyle::for_tag(&tag));

    match link_href(node, ctx.targets(), options) {
        Some(Href::Internal(target)) => {
            let text = flatten_text(node);
            let display = if text.is_empty() { target.as_str() } else { text.as_str() };
            emit_internal_link(&mut paragraph, display, &target);
        }
        Some(Href::External(url)) => {
            let text = flatten_text(node);
            let display = if text.is_empty() { url.as_str() } else { text.as_str() };
            let mut link = ParagraphSpec::new(paragraph.style);
            emit_external_link(&mut link, display, &url);
            paragraph.runs = wrap_bookmarks(ctx, node, &bookmark_names(node, options), link.runs);
        }
        None => {
            let text = flatten_text(node);
            let names = bookmark_names(node, options);
            match names.as_slice() {
                [] => emit_text(&mut paragraph, &text),
                [name] if ctx.marks(node, name) => ctx.emit_bookmark(&mut paragraph, name, &text),
                _ => {
                    let mut inner = ParagraphSpec::new(paragraph.style);
                    emit_text(&mut inner, &text);
                    paragraph.runs = wrap_bookmarks(ctx, node, &names, inner.runs);
                }
            }
        }
    }
    paragraph
}

/// How the recursive transcriber treats a node.
enum NodeKind {
    Text(String),
    Link(Href),
    Container { tag: String },
    Skip,
}

fn classify(node: &Handle, targets: &TargetIndex, options: &ConvertOptions) -> NodeKind {
    match &node.data {
        NodeData::Text { contents } => NodeKind::Text(contents.borrow().to_string()),
        NodeData::Element { .. } => {
            let tag = tag_lower(node).unwrap_or_default();
            if matches!(tag.as_str(), "script" | "style" | "template" | "head") {
                return NodeKind::Skip;
            }
            match link_href(node, targets, options) {
                Some(href) => NodeKind::Link(href),
                None => NodeKind::Container { tag },
            }
        }
        _ => NodeKind::Skip,
    }
}

fn is_block(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "nav"
            | "aside"
            | "main"
            | "blockquote"
            | "pre"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "li"
            | "dl"
            | "dt"
            | "dd"
            | "table"
            | "tr"
            | "td"
            | "th"
            | "figure"
            | "figcaption"
            | "br"
            | "hr"
    )
}

/// Tracks inter-word spacing and character formatting while runs are
/// produced across nesting levels.
#[derive(Default)]
struct InlineBuilder {
    has_content: bool,
    trailing_space: bool,
    pending_space: bool,
    bold_depth: u32,
    italic_depth: u32,
    underline_depth: u32,
}

impl InlineBuilder {
    fn style(&self) -> RunStyle {
        RunStyle {
            bold: self.bold_depth > 0,
            italic: self.italic_depth > 0,
            underline: self.underline_depth > 0,
        }
    }

    fn enter(&mut self, tag: &str) {
        match tag {
            "b" | "strong" => self.bold_depth += 1,
            "i" | "em" => self.italic_depth += 1,
            "u" => self.underline_depth += 1,
            _ => {}
        }
    }

    fn leave(&mut self, tag: &str) {
        match tag {
            "b" | "strong" => self.bold_depth = self.bold_depth.saturating_sub(1),
            "i" | "em" => self.italic_depth = self.italic_depth.saturating_sub(1),
            "u" => self.underline_depth = self.underline_depth.saturating_sub(1),
            _ => {}
        }
    }

    /// Appends text, extending the previous run when its style matches.
    fn push_str(out: &mut Vec<RunSpec>, text: &str, style: RunStyle) {
        let merged = match out.last_mut() {
            Some(RunSpec::Text(last)) if style.is_plain() => {
                last.push_str(text);
                true
            }
            Some(RunSpec::Styled { text: last, style: s }) if *s == style => {
                last.push_str(text);
                true
            }
            _ => false,
        };
        if !merged {
            out.push(RunSpec::styled(text, style));
        }
    }

    fn push_run(out: &mut Vec<RunSpec>, run: RunSpec) {
        match run {
            RunSpec::Text(text) => Self::push_str(out, &text, RunStyle::default()),
            RunSpec::Styled { text, style } => Self::push_str(out, &text, style),
            other => out.push(other),
        }
    }

    fn text(&mut self, out: &mut Vec<RunSpec>, raw: &str) {
        let collapsed = collapse_ws(raw);
        let mut text = if !self.has_content || self.trailing_space {
            collapsed.trim_start().to_string()
        } else {
            collapsed
        };
        if text.is_empty() {
            return;
        }
        if self.pending_space && !text.starts_with(' ') {
            text.insert(0, ' ');
        }
        self.pending_space = false;
        self.has_content = true;
        self.trailing_space = text.ends_with(' ');
        Self::push_str(out, &text, self.style());
    }

    fn inline(&mut self, out: &mut Vec<RunSpec>, run: RunSpec) {
        if self.pending_space && !self.trailing_space {
            Self::push_str(out, " ", self.style());
        }
        self.pending_space = false;
        self.has_content = true;
        self.trailing_space = false;
        out.push(run);
    }

    fn boundary(&mut self) {
        if self.has_content {
            self.pending_space = true;
        }
    }

    fn walk_children(
        &mut self,
        node: &Handle,
        ctx: &mut ConversionContext,
        options: &ConvertOptions,
        out: &mut Vec<RunSpec>,
    ) {
        for c in node.children.borrow().iter() {
            self.walk(c, ctx, options, out);
        }
    }

    fn walk(
        &mut self,
        node: &Handle,
        ctx: &mut ConversionContext,
        options: &ConvertOptions,
        out: &mut Vec<RunSpec>,
    ) {
        match classify(node, ctx.targets(), options) {
            NodeKind::Skip => {}
            NodeKind::Text(raw) => self.text(out, &raw),
            NodeKind::Link(href) => {
                let names = bookmark_names(node, options);
                let runs = wrap_bookmarks(ctx, node, &names, vec![link_run(node, href)]);
                for run in runs {
                    self.inline(out, run);
                }
            }
            NodeKind::Container { tag } => {
                let block = is_block(&tag);
                if block {
                    self.boundary();
                }
                self.enter(&tag);
                let names = bookmark_names(node, options);
                if names.is_empty() {
                    self.walk_children(node, ctx, options, out);
                } else if is_anchor_span(node) {
                    out.extend(wrap_bookmarks(ctx, node, &names, Vec::new()));
                    self.walk_children(node, ctx, options, out);
                } else {
                    let mut inner = Vec::new();
                    self.walk_children(node, ctx, options, &mut inner);
                    for run in wrap_bookmarks(ctx, node, &names, inner) {
                        Self::push_run(out, run);
                    }
                }
                self.leave(&tag);
                if block {
                    self.boundary();
                }
            }
        }
    }
}

/// Drops trailing whitespace from the last text leaf, leaving point
/// bookmarks in place.
fn trim_trailing(runs: &mut Vec<RunSpec>) {
    while let Some(last) = runs.last_mut() {
        match last {
            RunSpec::Text(text) | RunSpec::Styled { text, .. } => {
                let trimmed = text.trim_end().len();
                text.truncate(trimmed);
                if text.is_empty() {
                    runs.pop();
                    continue;
                }
                return;
            }
            RunSpec::Bookmarked { runs: inner, .. } => {
                trim_trailing(inner);
                return;
            }
            _ => return,
        }
    }
}

fn transcribe_nested(
    node: &Handle,
    ctx: &mut ConversionContext,
    options: &ConvertOptions,
) -> ParagraphSpec {
    let tag = tag_lower(node).unwrap_or_default();
    let mut paragraph = ParagraphSpec::new(ParagraphStyle::for_tag(&tag));
    let mut builder = InlineBuilder::default();
    builder.walk(node, ctx, options, &mut paragraph.runs);
    trim_trailing(&mut paragraph.runs);
    paragraph
}
