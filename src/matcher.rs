use serde::Serialize;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::geo::{bounding_region, Rect};
use crate::normalize::normalize;
use crate::parse::{PageText, Token};

/// Where a target code came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeOrigin {
    Explicit,
    AutoDetected,
}

/// A code to locate, kept both as the caller supplied it and in the
/// canonical form used for comparison. Construction fails with
/// [`Error::InvalidTarget`] when nothing survives normalization.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct TargetCode {
    pub raw: String,
    pub normalized: String,
    pub origin: CodeOrigin,
}

/// Two targets are the same code when their normalized forms agree; the
/// raw spellings may differ.
impl PartialEq for TargetCode {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl TargetCode {
    pub fn new(raw: &str, origin: CodeOrigin) -> Result<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return Err(Error::InvalidTarget(raw.to_string()));
        }
        Ok(TargetCode {
            raw: raw.trim().to_string(),
            normalized,
            origin,
        })
    }

    pub fn explicit(raw: &str) -> Result<Self> {
        Self::new(raw, CodeOrigin::Explicit)
    }

    pub fn auto_detected(raw: &str) -> Result<Self> {
        Self::new(raw, CodeOrigin::AutoDetected)
    }
}

/// One located occurrence of a target on a page.
#[derive(Debug, Clone, Serialize)]
pub struct Match {
    pub target: TargetCode,
    pub page_number: u32,
    /// Tokens the occurrence was read from, in page order.
    pub tokens: SmallVec<[Token; 4]>,
    /// Bounding union of the token boxes, gaps included.
    pub region: Rect,
}

/// Literal search for the target's raw form in the page's joined text.
///
/// Every hit is mapped back onto the tokens whose spans overlap it and
/// reported as the union of their boxes. A hit inside a token an earlier
/// hit already consumed is dropped, so matches never share a token.
pub fn direct_matches(page: &PageText, target: &TargetCode) -> Vec<Match> {
    let needle = target.raw.as_str();
    if needle.is_empty() || page.text.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let mut consumed_through: Option<usize> = None;
    let mut cursor = 0;
    while let Some(position) = page.text[cursor..].find(needle) {
        let begin = cursor + position;
        let end = begin + needle.len();
        cursor = end;

        let indices = page.tokens_in_range(begin, end);
        let Some(&first) = indices.first() else {
            continue;
        };
        if consumed_through.is_some_and(|last| first <= last) {
            continue;
        }
        consumed_through = indices.last().copied();
        if let Some(hit) = match_over_tokens(target, page, &indices) {
            found.push(hit);
        }
    }
    found
}

/// Reconstruct the target from consecutive tokens.
///
/// From each candidate start the token texts are normalized and
/// accumulated. A start is abandoned as soon as the accumulation stops
/// being a prefix of the target; when it equals the target, the run is
/// recorded and the scan resumes after its last token, so recorded runs
/// never overlap.
pub fn sequence_matches(page: &PageText, target: &TargetCode) -> Vec<Match> {
    let want = target.normalized.as_str();
    if want.is_empty() || page.tokens.is_empty() {
        return Vec::new();
    }

    let mut found = Vec::new();
    let count = page.tokens.len();
    let mut start = 0;
    while start < count {
        let first = normalize(&page.tokens[start].text);
        if first.is_empty() || !want.starts_with(first.as_str()) {
            start += 1;
            continue;
        }
        if first.len() == want.len() {
            if let Some(hit) = match_over_tokens(target, page, &[start]) {
                found.push(hit);
            }
            start += 1;
            continue;
        }

        let mut accumulated = first;
        let mut next = start + 1;
        let mut run_end = None;
        while next < count {
            accumulated.push_str(&normalize(&page.tokens[next].text));
            if !want.starts_with(accumulated.as_str()) {
                break;
            }
            if accumulated.len() == want.len() {
                run_end = Some(next);
                break;
            }
            next += 1;
        }

        match run_end {
            Some(end) => {
                let indices: Vec<usize> = (start..=end).collect();
                if let Some(hit) = match_over_tokens(target, page, &indices) {
                    found.push(hit);
                }
                start = end + 1;
            }
            None => start += 1,
        }
    }
    found
}

fn match_over_tokens(target: &TargetCode, page: &PageText, indices: &[usize]) -> Option<Match> {
    let tokens: SmallVec<[Token; 4]> = indices
        .iter()
        .map(|&index| page.tokens[index].clone())
        .collect();
    let region = bounding_region(tokens.iter().map(|token| &token.bbox))?;
    Some(Match {
        target: target.clone(),
        page_number: page.page_number,
        tokens,
        region,
    })
}
