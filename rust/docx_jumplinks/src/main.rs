use anyhow::{anyhow, Context, Result};
use clap::Parser;
use docx_jumplinks::{
    convert_to_file, BookmarkIds, ConvertError, ConvertOptions, DuplicatePolicy, TraversalMode,
};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert HTML to .docx, keeping #fragment links as bookmarks")]
struct Args {
    /// Input HTML file (any fragment or full document), or `-` for stdin.
    html_file: PathBuf,

    /// Output .docx path.
    out: PathBuf,

    /// Document title. Defaults to the HTML <title>.
    #[arg(long)]
    title: Option<String>,

    /// Start the document with a Title paragraph.
    #[arg(long)]
    title_heading: bool,

    /// Keep links and bookmarks nested inside body children.
    #[arg(long)]
    nested: bool,

    /// Emit non-fragment hrefs as external hyperlinks.
    #[arg(long)]
    external_links: bool,

    #[arg(long, value_enum, default_value_t = BookmarkIds::Sequential)]
    bookmark_ids: BookmarkIds,

    #[arg(long, value_enum, default_value_t = DuplicatePolicy::Keep)]
    duplicates: DuplicatePolicy,

    /// Truncate bookmark names to this many characters (0 disables).
    #[arg(long, default_value_t = docx_jumplinks::options::MAX_BOOKMARK_NAME_LEN)]
    max_name_len: usize,

    /// Fail instead of warning on dangling links or duplicate bookmarks.
    #[arg(long)]
    strict: bool,
}

impl Args {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            title: self.title.clone(),
            title_heading: self.title_heading,
            traversal: if self.nested {
                TraversalMode::Nested
            } else {
                TraversalMode::TopLevel
            },
            bookmark_ids: self.bookmark_ids,
            duplicates: self.duplicates,
            external_links: self.external_links,
            max_bookmark_name_len: (self.max_name_len > 0).then_some(self.max_name_len),
            strict: self.strict,
        }
    }
}

fn read_input(path: &PathBuf) -> Result<String> {
    let mut html = String::new();
    if path.as_os_str() == "-" {
        std::io::stdin()
            .read_to_string(&mut html)
            .context("read stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("open {}", path.display()))?
            .read_to_string(&mut html)
            .with_context(|| format!("read {}", path.display()))?;
    }
    Ok(html)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let html = read_input(&args.html_file)?;

    match convert_to_file(&html, &args.out, &args.options()) {
        Ok(conversion) => {
            for d in &conversion.diagnostics {
                eprintln!("{d}");
            }
            let doc = &conversion.document;
            eprintln!(
                "wrote {} ({} paragraphs, {} bookmarks, {} internal links)",
                args.out.display(),
                doc.paragraphs.len(),
                doc.bookmarks().len(),
                doc.internal_links().len()
            );
            Ok(())
        }
        Err(ConvertError::Validation(diagnostics)) => {
            for d in &diagnostics {
                eprintln!("{d}");
            }
            Err(anyhow!("{} cross-reference problem(s); nothing written", diagnostics.len()))
        }
        Err(e) => Err(e).with_context(|| format!("convert {}", args.html_file.display())),
    }
}
