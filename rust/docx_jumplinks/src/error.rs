use crate::validate::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input HTML is empty")]
    EmptyInput,

    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to assemble docx package")]
    Package(#[from] std::io::Error),

    #[error("failed to assemble docx package")]
    Zip(#[from] zip::result::ZipError),

    #[error("cross-reference validation failed with {} problem(s)", .0.len())]
    Validation(Vec<Diagnostic>),
}
