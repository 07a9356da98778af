//! WordprocessingML package writer for [`DocumentSpec`].

use crate::error::ConvertError;
use crate::ir::{BookmarkSpec, DocumentSpec, ParagraphSpec, ParagraphStyle, RunSpec, RunStyle};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const FIRST_LINK_RID: u32 = 10;

/// Characters allowed by the XML 1.0 `Char` production.
fn is_xml_char(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Escapes markup characters and drops those XML cannot carry at all.
fn xml_escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            c if !is_xml_char(c) => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn text_run_xml(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    format!(
        "<w:r><w:t xml:space=\"preserve\">{}</w:t></w:r>",
        xml_escape_text(text)
    )
}

fn run_properties_xml(style: RunStyle) -> String {
    let mut out = String::from("<w:rPr>");
    if style.bold {
        out.push_str("<w:b/>");
    }
    if style.italic {
        out.push_str("<w:i/>");
    }
    if style.underline {
        out.push_str("<w:u w:val=\"single\"/>");
    }
    out.push_str("</w:rPr>");
    out
}

fn styled_run_xml(text: &str, style: RunStyle) -> String {
    if text.is_empty() {
        return String::new();
    }
    if style.is_plain() {
        return text_run_xml(text);
    }
    format!(
        "<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        run_properties_xml(style),
        xml_escape_text(text)
    )
}

fn hyperlink_run_xml(text: &str) -> String {
    format!(
        "<w:r><w:rPr><w:rStyle w:val=\"Hyperlink\"/></w:rPr><w:t xml:space=\"preserve\">{}</w:t></w:r>",
        xml_escape_text(text)
    )
}

fn bookmark_start_xml(b: &BookmarkSpec) -> String {
    format!(
        "<w:bookmarkStart w:id=\"{}\" w:name=\"{}\"/>",
        b.id,
        xml_escape_text(&b.name)
    )
}

fn bookmark_end_xml(b: &BookmarkSpec) -> String {
    format!("<w:bookmarkEnd w:id=\"{}\"/>", b.id)
}

fn runs_xml(runs: &[RunSpec], link_to_rid: &BTreeMap<String, String>, out: &mut String) {
    for run in runs {
        match run {
            RunSpec::Text(text) => out.push_str(&text_run_xml(text)),
            RunSpec::Styled { text, style } => out.push_str(&styled_run_xml(text, *style)),
            RunSpec::Bookmarked { bookmark, runs } => {
                out.push_str(&bookmark_start_xml(bookmark));
                runs_xml(runs, link_to_rid, out);
                out.push_str(&bookmark_end_xml(bookmark));
            }
            RunSpec::InternalLink { text, anchor } => {
                out.push_str(&format!(
                    "<w:hyperlink w:anchor=\"{}\" w:history=\"1\">",
                    xml_escape_text(anchor)
                ));
                out.push_str(&hyperlink_run_xml(text));
                out.push_str("</w:hyperlink>");
            }
            RunSpec::ExternalLink { text, url } => match link_to_rid.get(url) {
                Some(rid) => {
                    out.push_str(&format!("<w:hyperlink r:id=\"{}\" w:history=\"1\">", rid));
                    out.push_str(&hyperlink_run_xml(text));
                    out.push_str("</w:hyperlink>");
                }
                None => out.push_str(&text_run_xml(text)),
            },
        }
    }
}

fn paragraph_xml(p: &ParagraphSpec, link_to_rid: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    out.push_str("<w:p>");
    match p.style {
        ParagraphStyle::Normal => {}
        ParagraphStyle::Title => out.push_str("<w:pPr><w:pStyle w:val=\"Title\"/></w:pPr>"),
        ParagraphStyle::Heading(level) => out.push_str(&format!(
            "<w:pPr><w:pStyle w:val=\"Heading{}\"/></w:pPr>",
            level.clamp(1, 6)
        )),
    }
    runs_xml(&p.runs, link_to_rid, &mut out);
    out.push_str("</w:p>");
    out
}

fn document_xml(doc: &DocumentSpec, link_to_rid: &BTreeMap<String, String>) -> String {
    let mut body = String::new();
    for p in &doc.paragraphs {
        body.push_str(&paragraph_xml(p, link_to_rid));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
 xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    {body}
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>
      <w:cols w:space="708"/>
      <w:docGrid w:linePitch="360"/>
    </w:sectPr>
  </w:body>
</w:document>"#,
        body = body
    )
}

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
  <Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>
</Types>"#
}

fn rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
</Relationships>"#
}

fn document_rels_xml(link_to_rid: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    out.push('\n');
    out.push_str(r#"  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
    out.push('\n');
    for (href, rid) in link_to_rid {
        out.push_str(&format!(
            r#"  <Relationship Id="{rid}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{href}" TargetMode="External"/>"#,
            rid = rid,
            href = xml_escape_text(href),
        ));
        out.push('\n');
    }
    out.push_str("</Relationships>");
    out
}

fn core_xml(title: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties"
 xmlns:dc="http://purl.org/dc/elements/1.1/">
  <dc:title>{}</dc:title>
</cp:coreProperties>"#,
        xml_escape_text(title)
    )
}

fn heading_style_xml(level: u8, before: u32, size: u32) -> String {
    format!(
        r#"
  <w:style w:type="paragraph" w:styleId="Heading{level}">
    <w:name w:val="heading {level}"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="9"/>
    <w:qFormat/>
    <w:pPr>
      <w:keepNext/>
      <w:spacing w:before="{before}" w:after="120"/>
      <w:outlineLvl w:val="{outline}"/>
    </w:pPr>
    <w:rPr>
      <w:b/>
      <w:sz w:val="{size}"/>
    </w:rPr>
  </w:style>"#,
        outline = level - 1,
    )
}

fn styles_xml() -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
  <w:style w:type="paragraph" w:styleId="Title">
    <w:name w:val="Title"/>
    <w:basedOn w:val="Normal"/>
    <w:next w:val="Normal"/>
    <w:uiPriority w:val="10"/>
    <w:qFormat/>
    <w:pPr>
      <w:spacing w:after="240"/>
    </w:pPr>
    <w:rPr>
      <w:sz w:val="56"/>
    </w:rPr>
  </w:style>
  <w:style w:type="character" w:styleId="Hyperlink">
    <w:name w:val="Hyperlink"/>
    <w:uiPriority w:val="99"/>
    <w:unhideWhenUsed/>
    <w:rPr>
      <w:color w:val="0563C1" w:themeColor="hyperlink"/>
      <w:u w:val="single"/>
    </w:rPr>
  </w:style>"#,
    );
    for (level, before, size) in [
        (1, 360, 32),
        (2, 240, 28),
        (3, 240, 26),
        (4, 200, 24),
        (5, 200, 22),
        (6, 200, 22),
    ] {
        out.push_str(&heading_style_xml(level, before, size));
    }
    out.push_str("\n</w:styles>");
    out
}

/// External URLs in first-seen order, each mapped to a relationship id.
fn link_relationships(doc: &DocumentSpec) -> BTreeMap<String, String> {
    let mut link_to_rid = BTreeMap::new();
    let mut rid_counter = FIRST_LINK_RID;
    for url in doc.external_urls() {
        if !link_to_rid.contains_key(url) {
            link_to_rid.insert(url.to_string(), format!("rId{}", rid_counter));
            rid_counter += 1;
        }
    }
    link_to_rid
}

/// Renders the complete package in memory.
pub fn render_docx(doc: &DocumentSpec) -> Result<Vec<u8>, ConvertError> {
    let link_to_rid = link_relationships(doc);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();

    zip.start_file("[Content_Types].xml", opts)?;
    zip.write_all(content_types_xml().as_bytes())?;

    zip.start_file("_rels/.rels", opts)?;
    zip.write_all(rels_xml().as_bytes())?;

    zip.start_file("docProps/core.xml", opts)?;
    zip.write_all(core_xml(&doc.title).as_bytes())?;

    zip.start_file("word/document.xml", opts)?;
    zip.write_all(document_xml(doc, &link_to_rid).as_bytes())?;

    zip.start_file("word/styles.xml", opts)?;
    zip.write_all(styles_xml().as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", opts)?;
    zip.write_all(document_rels_xml(&link_to_rid).as_bytes())?;

    let cursor = zip.finish()?;
    tracing::debug!(
        bytes = cursor.get_ref().len(),
        external_links = link_to_rid.len(),
        "rendered docx package"
    );
    Ok(cursor.into_inner())
}

/// Renders fully before touching `out_path`, so a failed render leaves no file.
pub fn write_docx(out_path: &Path, doc: &DocumentSpec) -> Result<(), ConvertError> {
    let bytes = render_docx(doc)?;
    std::fs::write(out_path, bytes).map_err(|source| ConvertError::Io {
        path: out_path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %out_path.display(), "wrote docx");
    Ok(())
}
