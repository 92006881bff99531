use thiserror::Error;

/// Errors produced while locating and highlighting codes in a document.
///
/// Only two variants abort a whole request: [`Error::InvalidInput`] (the
/// document never opened) and [`Error::OutputAssembly`] (the result could
/// not be produced). [`Error::InvalidTarget`] drops a single target and
/// [`Error::Extraction`] drops a single page; the scan continues past both.
#[derive(Debug, Error)]
pub enum Error {
    /// The document could not be opened or its page tree read.
    #[error("invalid input document: {0}")]
    InvalidInput(String),

    /// A target code normalized to the empty string, so nothing can match it.
    #[error("target code {0:?} normalizes to an empty string")]
    InvalidTarget(String),

    /// Content for a single page could not be extracted.
    #[error("failed to extract page {page}: {reason}")]
    Extraction { page: u32, reason: String },

    /// The highlighted output document could not be assembled or serialized.
    #[error("failed to assemble output: {0}")]
    OutputAssembly(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
