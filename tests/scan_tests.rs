use std::time::Duration;

use refmark_pdf::pattern::MarkerPattern;
use refmark_pdf::scan::{scan, AnnotationSink, ScanOptions, TargetSpec};

pub mod common;
use crate::common::{MockSink, MockSource};

#[test]
fn explicit_targets_are_matched_on_every_page() {
    let source = MockSource::new()
        .with_page(1, &["AB12", "text"])
        .with_page(2, &["nothing", "here"])
        .with_page(3, &["AB12", "and", "AB12"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::Explicit(vec!["AB12".to_string()]);

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    assert_eq!(report.matched_pages(), vec![1, 3]);
    assert_eq!(report.match_count(), 3);
    assert_eq!(report.pages_scanned, 3);
    assert_eq!(report.page_count, 3);
    assert!(!report.timed_out);
    assert_eq!(sink.recorded.len(), 3);
}

#[test]
fn sink_sees_exactly_the_reported_regions() {
    let source = MockSource::new().with_page(1, &["AB12", "AB12"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::Explicit(vec!["AB12".to_string()]);

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    assert_eq!(sink.recorded.len(), report.match_count());
    let output = sink.assemble(Default::default()).unwrap();
    assert_eq!(output.unwrap().len(), 2);
}

#[test]
fn duplicate_spellings_collapse_to_one_target() {
    let source = MockSource::new().with_page(1, &["AB12"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::Explicit(vec![
        "AB12".to_string(),
        "ab 12".to_string(),
        "AB-12".to_string(),
    ]);

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    assert_eq!(report.match_count(), 1);
}

#[test]
fn empty_target_is_skipped_not_fatal() {
    let source = MockSource::new().with_page(1, &["AB12"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::Explicit(vec!["  ".to_string(), "AB12".to_string()]);

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    assert_eq!(report.skipped_targets, vec!["  ".to_string()]);
    assert_eq!(report.match_count(), 1);
}

#[test]
fn no_targets_at_all_is_an_empty_outcome() {
    let source = MockSource::new().with_page(1, &["AB12"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::Explicit(Vec::new());

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    assert!(report.is_empty());
    assert_eq!(report.pages_scanned, 1);
    assert!(sink.assemble(Default::default()).unwrap().is_none());
}

#[test]
fn broken_page_is_isolated() {
    let source = MockSource::new()
        .with_broken_page(1)
        .with_page(2, &["AB12"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::Explicit(vec!["AB12".to_string()]);

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    assert_eq!(report.failed_pages.len(), 1);
    assert_eq!(report.failed_pages[0].0, 1);
    assert_eq!(report.matched_pages(), vec![2]);
    assert_eq!(report.pages_scanned, 1);
    assert_eq!(report.page_count, 2);
}

#[test]
fn zero_timeout_scans_no_pages() {
    let source = MockSource::new().with_page(1, &["AB12"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::Explicit(vec!["AB12".to_string()]);
    let options = ScanOptions {
        timeout: Some(Duration::ZERO),
        ..ScanOptions::default()
    };

    let report = scan(&source, &mut sink, &targets, &options);

    assert!(report.timed_out);
    assert_eq!(report.pages_scanned, 0);
    assert!(report.is_empty());
    assert!(sink.recorded.is_empty());
}

#[test]
fn sequence_pass_alone_finds_everything() {
    // the raw form never appears in the joined text, so only the token
    // pass can find it, with or without the direct pass enabled
    let source = MockSource::new().with_page(1, &["MF-0610", "G"]);
    let targets = TargetSpec::Explicit(vec!["MF-0610G".to_string()]);

    let mut sink = MockSink::default();
    let with_direct = scan(&source, &mut sink, &targets, &ScanOptions::default());

    let mut sink = MockSink::default();
    let options = ScanOptions {
        direct_search: false,
        ..ScanOptions::default()
    };
    let without_direct = scan(&source, &mut sink, &targets, &options);

    assert_eq!(with_direct.match_count(), 1);
    assert_eq!(without_direct.match_count(), 1);
}

#[test]
fn direct_and_sequence_agree_on_exact_spellings() {
    let source = MockSource::new().with_page(1, &["AB12", "noise", "AB12"]);
    let targets = TargetSpec::Explicit(vec!["AB12".to_string()]);

    let mut sink = MockSink::default();
    let direct = scan(&source, &mut sink, &targets, &ScanOptions::default());

    let mut sink = MockSink::default();
    let options = ScanOptions {
        direct_search: false,
        ..ScanOptions::default()
    };
    let sequence = scan(&source, &mut sink, &targets, &options);

    assert_eq!(direct.match_count(), 2);
    assert_eq!(sequence.match_count(), 2);
    assert_eq!(direct.matched_pages(), sequence.matched_pages());
}

#[test]
fn auto_detected_codes_stay_on_their_page() {
    let source = MockSource::new()
        .with_page(1, &["Ref:", "X9/", "then", "X9", "again"])
        .with_page(2, &["X9", "without", "a", "marker"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::AutoDetect(MarkerPattern::default());

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    // the marker page matches, the bare mention on page 2 does not
    assert_eq!(report.matched_pages(), vec![1]);
    assert_eq!(report.match_count(), 2);
}

#[test]
fn rediscovered_code_is_matched_once_per_page() {
    let source = MockSource::new().with_page(1, &["Ref:", "A1/", "Ref:", "A1/", "A1"]);
    let mut sink = MockSink::default();
    let targets = TargetSpec::AutoDetect(MarkerPattern::default());

    let report = scan(&source, &mut sink, &targets, &ScanOptions::default());

    assert_eq!(report.matched_pages(), vec![1]);
    assert_eq!(report.match_count(), 3);
}
