pub mod annotate;
pub mod error;
pub mod fonts;
pub mod geo;
pub mod logging;
pub mod matcher;
pub mod normalize;
pub mod parse;
pub mod pattern;
pub mod scan;

use std::path::Path;

use lopdf::Document;

use crate::annotate::{OutputPolicy, PdfAnnotator};
use crate::error::{Error, Result};
use crate::parse::{load_pdf, load_pdf_bytes, PdfSource};
use crate::pattern::MarkerPattern;
use crate::scan::{scan, AnnotationSink, ScanOptions, ScanReport, TargetSpec};

#[cfg(feature = "extension-module")]
use pyo3::prelude::*;

/// Everything a highlight run needs besides the document itself.
#[derive(Debug, Clone)]
pub struct HighlightOptions {
    pub targets: TargetSpec,
    pub scan: ScanOptions,
    pub output: OutputPolicy,
}

impl HighlightOptions {
    /// Highlight the given codes wherever they appear.
    pub fn for_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HighlightOptions {
            targets: TargetSpec::Explicit(codes.into_iter().map(Into::into).collect()),
            scan: ScanOptions::default(),
            output: OutputPolicy::default(),
        }
    }

    /// Discover codes from reference markers and highlight those.
    pub fn auto_detect(pattern: MarkerPattern) -> Self {
        HighlightOptions {
            targets: TargetSpec::AutoDetect(pattern),
            scan: ScanOptions::default(),
            output: OutputPolicy::default(),
        }
    }
}

/// What a highlight run produced.
#[derive(Debug)]
pub enum HighlightOutcome {
    /// At least one code matched; `bytes` is the annotated document.
    Document { bytes: Vec<u8>, report: ScanReport },
    /// The scan completed but nothing matched, so there is no document.
    NoMatches { report: ScanReport },
}

impl HighlightOutcome {
    pub fn report(&self) -> &ScanReport {
        match self {
            HighlightOutcome::Document { report, .. } => report,
            HighlightOutcome::NoMatches { report } => report,
        }
    }
}

/// Scan a PDF document for the requested codes and highlight every match
///
/// # Arguments
/// * `pdf_bytes` - The PDF file contents as bytes
/// * `options` - Targets to look for, scan behavior, and the page policy
///
/// # Returns
/// * `Result<HighlightOutcome>` - The annotated document plus its scan
///   report, or `NoMatches` with the report when nothing was found
pub fn highlight_codes(pdf_bytes: &[u8], options: &HighlightOptions) -> Result<HighlightOutcome> {
    let doc = load_pdf_bytes(pdf_bytes)?;
    highlight_document(doc, options)
}

/// [`highlight_codes`], reading the document from disk.
pub fn highlight_file<P: AsRef<Path>>(
    path: P,
    options: &HighlightOptions,
) -> Result<HighlightOutcome> {
    let doc = load_pdf(path)?;
    highlight_document(doc, options)
}

fn highlight_document(doc: Document, options: &HighlightOptions) -> Result<HighlightOutcome> {
    let mut sink = PdfAnnotator::new(doc.clone());
    let source = PdfSource::new(&doc);

    let report = scan(&source, &mut sink, &options.targets, &options.scan);

    match sink.assemble(options.output)? {
        Some(mut annotated) => {
            let mut bytes = Vec::new();
            annotated
                .save_to(&mut bytes)
                .map_err(|err| Error::OutputAssembly(err.to_string()))?;
            Ok(HighlightOutcome::Document { bytes, report })
        }
        None => Ok(HighlightOutcome::NoMatches { report }),
    }
}

/// Highlight codes in a PDF file and write the result next to it
#[cfg(feature = "extension-module")]
#[pyfunction]
fn highlight_pdf_file(pdf_path: String, output_path: String, codes: Vec<String>) -> PyResult<bool> {
    let options = HighlightOptions::for_codes(codes);
    let outcome = highlight_file(&pdf_path, &options)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(e.to_string()))?;

    match outcome {
        HighlightOutcome::Document { bytes, .. } => {
            std::fs::write(output_path, bytes)?;
            Ok(true)
        }
        HighlightOutcome::NoMatches { .. } => Ok(false),
    }
}

/// A Python module implemented in Rust
#[cfg(feature = "extension-module")]
#[pymodule(name = "refmark_pdf")]
fn refmark_pdf(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(highlight_pdf_file, m)?)?;
    Ok(())
}
