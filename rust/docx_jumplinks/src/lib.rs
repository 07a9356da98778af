//! Converts HTML into a `.docx` document whose in-page links survive as
//! bookmarks and internal hyperlinks.
//!
//! The pipeline is: parse, collect jump targets, transcribe body children
//! into [`ir::ParagraphSpec`]s, validate cross references, serialize.

pub mod docx;
pub mod emit;
pub mod error;
pub mod html;
pub mod ir;
pub mod options;
pub mod targets;
pub mod transcribe;
pub mod validate;

pub use error::ConvertError;
pub use ir::{BookmarkSpec, DocumentSpec, ParagraphSpec, ParagraphStyle, RunSpec, RunStyle};
pub use options::{BookmarkIds, ConvertOptions, DuplicatePolicy, TraversalMode};
pub use validate::{Diagnostic, Severity};

use emit::{emit_text, ConversionContext};
use std::path::Path;

/// Result of a successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub document: DocumentSpec,
    /// Every identifier found in the HTML, sorted.
    pub targets: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds the document structure without writing anything.
pub fn convert(html: &str, options: &ConvertOptions) -> Result<Conversion, ConvertError> {
    if html.trim().is_empty() {
        return Err(ConvertError::EmptyInput);
    }

    let dom = html::parse_html(html);
    let targets = targets::collect_targets(&dom, options);

    let mut ctx = ConversionContext::new(options.bookmark_ids, options.duplicates, targets);
    let mut paragraphs = transcribe::transcribe(&html::body_children(&dom), &mut ctx, options);

    let title = options
        .title
        .clone()
        .or_else(|| html::document_title(&dom))
        .unwrap_or_else(|| options::DEFAULT_TITLE.to_string());
    if options.title_heading {
        let mut heading = ParagraphSpec::new(ParagraphStyle::Title);
        emit_text(&mut heading, &title);
        paragraphs.insert(0, heading);
    }

    let document = DocumentSpec { title, paragraphs };
    let diagnostics = validate::validate(ctx.targets(), &document);

    if options.strict && !diagnostics.is_empty() {
        let escalated = diagnostics
            .into_iter()
            .map(|d| Diagnostic {
                severity: Severity::Error,
                ..d
            })
            .collect();
        return Err(ConvertError::Validation(escalated));
    }

    Ok(Conversion {
        document,
        targets: ctx.targets().names().map(str::to_string).collect(),
        diagnostics,
    })
}

/// Converts `html` and writes the package to `out_path`. The file only
/// appears once the whole document has been rendered.
pub fn convert_to_file(
    html: &str,
    out_path: &Path,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let conversion = convert(html, options)?;
    docx::write_docx(out_path, &conversion.document)?;
    Ok(conversion)
}
