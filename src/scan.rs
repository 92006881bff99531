use std::time::{Duration, Instant};

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::annotate::OutputPolicy;
use crate::error::Result;
use crate::geo::Rect;
use crate::logging::{CODE_MATCH, PAGE_SCAN};
use crate::matcher::{direct_matches, sequence_matches, CodeOrigin, Match, TargetCode};
use crate::normalize::normalize;
use crate::parse::PageText;
use crate::pattern::MarkerPattern;

/// Read-only provider of page text. The scan never mutates the document
/// it reads from.
pub trait DocumentSource {
    /// Page numbers in document order (1-based, as the page tree lists
    /// them).
    fn page_numbers(&self) -> Vec<u32>;

    fn page(&self, page_number: u32) -> Result<PageText>;

    fn page_count(&self) -> usize {
        self.page_numbers().len()
    }
}

/// Receiver for matched regions. Recording must not touch the document;
/// all mutation is deferred to the single `assemble` call.
pub trait AnnotationSink {
    type Output;

    fn record_highlight(&mut self, page_number: u32, region: Rect);

    /// Produce the output, or `None` when nothing was recorded.
    fn assemble(self, policy: OutputPolicy) -> Result<Option<Self::Output>>;
}

/// Which codes to look for. Exactly one mode; supplying both is not
/// representable.
#[derive(Debug, Clone)]
pub enum TargetSpec {
    /// Match the given codes on every page.
    Explicit(Vec<String>),
    /// Discover codes with the marker pattern and match each one on the
    /// page where it was discovered.
    AutoDetect(MarkerPattern),
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Try the literal raw-text search before reconstructing from tokens.
    pub direct_search: bool,
    /// Stop starting new pages once this much time has elapsed; the page
    /// in flight always completes.
    pub timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            direct_search: true,
            timeout: None,
        }
    }
}

/// All matches found on one page. Pages without matches get no outcome.
#[derive(Debug, Clone, Serialize)]
pub struct PageOutcome {
    pub page_number: u32,
    pub matches: Vec<Match>,
}

/// What a scan saw, page by page.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scan_id: Uuid,
    /// Pages with at least one match, in document order.
    pub pages: Vec<PageOutcome>,
    /// Pages whose content could not be extracted, with the reason.
    pub failed_pages: Vec<(u32, String)>,
    /// Raw targets dropped because nothing survived normalization.
    pub skipped_targets: Vec<String>,
    pub pages_scanned: usize,
    pub page_count: usize,
    /// True when the deadline expired before every page was visited.
    pub timed_out: bool,
    pub elapsed_ms: u64,
}

impl ScanReport {
    pub fn matched_pages(&self) -> Vec<u32> {
        self.pages.iter().map(|page| page.page_number).collect()
    }

    pub fn match_count(&self) -> usize {
        self.pages.iter().map(|page| page.matches.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Walk the document in page order, locate targets, and record every
/// match's region with the sink.
///
/// Per-page extraction failures and targets that normalize to nothing are
/// recorded in the report and do not stop the scan. Explicit targets are
/// de-duplicated by normalized form up front; auto-detected ones are
/// normalized once per request and matched at most once per page.
pub fn scan<S, A>(
    source: &S,
    sink: &mut A,
    targets: &TargetSpec,
    options: &ScanOptions,
) -> ScanReport
where
    S: DocumentSource,
    A: AnnotationSink,
{
    let scan_id = Uuid::new_v4();
    let started = Instant::now();
    let span = info_span!(target: PAGE_SCAN, "scan", id = %scan_id);
    let _guard = span.enter();

    let page_numbers = source.page_numbers();
    let page_count = page_numbers.len();

    let mut cache: IndexMap<String, TargetCode> = IndexMap::new();
    let mut skipped_targets = Vec::new();

    if let TargetSpec::Explicit(raws) = targets {
        for raw in raws {
            cached_target(&mut cache, &mut skipped_targets, raw, CodeOrigin::Explicit);
        }
    }

    let mut pages = Vec::new();
    let mut failed_pages = Vec::new();
    let mut pages_scanned = 0usize;
    let mut timed_out = false;

    for page_number in page_numbers {
        if let Some(limit) = options.timeout {
            if started.elapsed() >= limit {
                warn!(
                    target: PAGE_SCAN,
                    page = page_number,
                    "deadline reached, abandoning remaining pages"
                );
                timed_out = true;
                break;
            }
        }

        let page = match source.page(page_number) {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    target: PAGE_SCAN,
                    page = page_number,
                    error = %err,
                    "skipping page"
                );
                failed_pages.push((page_number, err.to_string()));
                continue;
            }
        };
        pages_scanned += 1;

        let page_targets: Vec<TargetCode> = match targets {
            TargetSpec::Explicit(_) => cache.values().cloned().collect(),
            TargetSpec::AutoDetect(pattern) => {
                let mut discovered = Vec::new();
                for raw in pattern.extract(&page.text) {
                    if let Some(code) = cached_target(
                        &mut cache,
                        &mut skipped_targets,
                        raw,
                        CodeOrigin::AutoDetected,
                    ) {
                        if !discovered.contains(code) {
                            discovered.push(code.clone());
                        }
                    }
                }
                discovered
            }
        };

        let mut page_matches: Vec<Match> = Vec::new();
        for code in &page_targets {
            let mut found = if options.direct_search {
                direct_matches(&page, code)
            } else {
                Vec::new()
            };
            let phase = if found.is_empty() {
                found = sequence_matches(&page, code);
                "sequence"
            } else {
                "direct"
            };
            if !found.is_empty() {
                debug!(
                    target: CODE_MATCH,
                    page = page_number,
                    code = %code.raw,
                    phase,
                    count = found.len(),
                    "code located"
                );
            }
            page_matches.extend(found);
        }

        if !page_matches.is_empty() {
            for hit in &page_matches {
                sink.record_highlight(page_number, hit.region);
            }
            pages.push(PageOutcome {
                page_number,
                matches: page_matches,
            });
        }
    }

    let report = ScanReport {
        scan_id,
        pages,
        failed_pages,
        skipped_targets,
        pages_scanned,
        page_count,
        timed_out,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        target: PAGE_SCAN,
        matched_pages = report.pages.len(),
        matches = report.match_count(),
        pages_scanned,
        "scan complete"
    );
    report
}

/// Normalize `raw` once per request, keeping the first spelling seen.
/// Returns `None` (and records the skip) when nothing survives
/// normalization.
fn cached_target<'c>(
    cache: &'c mut IndexMap<String, TargetCode>,
    skipped: &mut Vec<String>,
    raw: &str,
    origin: CodeOrigin,
) -> Option<&'c TargetCode> {
    let key = normalize(raw);
    if key.is_empty() {
        warn!(target: CODE_MATCH, code = raw, "target normalizes to nothing, skipped");
        if !skipped.iter().any(|seen| seen == raw) {
            skipped.push(raw.to_string());
        }
        return None;
    }
    if !cache.contains_key(&key) {
        let code = TargetCode {
            raw: raw.trim().to_string(),
            normalized: key.clone(),
            origin,
        };
        cache.insert(key.clone(), code);
    }
    cache.get(&key)
}
