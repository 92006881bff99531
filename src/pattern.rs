use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// Label that introduces a code in running text.
pub const DEFAULT_LABEL: &str = "Ref:";
/// Character that closes a code; runs of it count as one terminator.
pub const DEFAULT_TERMINATOR: char = '/';

static DEFAULT_MARKER: Lazy<MarkerPattern> = Lazy::new(|| {
    MarkerPattern::new(DEFAULT_LABEL, DEFAULT_TERMINATOR).expect("valid default marker pattern")
});

/// The label/terminator idiom used to discover codes in page text.
///
/// A marker is the literal label, optional whitespace, then a run of
/// letters, digits, `.`, `:`, `-` and internal whitespace, closed by one
/// or more terminator characters. The run between label and terminator is
/// the candidate code; a trailing `.` right before the terminator belongs
/// to the code. The terminator must not itself be a code character.
#[derive(Debug, Clone)]
pub struct MarkerPattern {
    label: String,
    terminator: char,
    regex: Regex,
}

impl Default for MarkerPattern {
    fn default() -> Self {
        DEFAULT_MARKER.clone()
    }
}

impl MarkerPattern {
    pub fn new(label: impl Into<String>, terminator: char) -> Result<Self> {
        let label = label.into();
        let pattern = format!(
            r"{}\s*([A-Za-z0-9.:\-\s]+?){}+",
            regex::escape(&label),
            regex::escape(&terminator.to_string()),
        );
        let regex = Regex::new(&pattern)
            .map_err(|err| Error::InvalidInput(format!("marker pattern: {err}")))?;
        Ok(MarkerPattern {
            label,
            terminator,
            regex,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn terminator(&self) -> char {
        self.terminator
    }

    /// Candidate codes in `text`, in order of appearance.
    ///
    /// Captures are trimmed of surrounding whitespace; captures that trim
    /// to nothing are dropped. Whether a candidate survives normalization
    /// is the caller's problem.
    pub fn extract<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|code| code.as_str().trim())
            .filter(|code| !code.is_empty())
            .collect()
    }
}
