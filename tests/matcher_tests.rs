use pretty_assertions::assert_eq;

use refmark_pdf::matcher::{direct_matches, sequence_matches, TargetCode};

pub mod common;

#[test]
fn target_inside_a_single_token() {
    let page = common::page(1, &["The", "code", "MF-0610G", "appears"]);
    let target = TargetCode::explicit("MF-0610 G").unwrap();

    let found = sequence_matches(&page, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens.len(), 1);
    assert_eq!(found[0].tokens[0].text, "MF-0610G");
    assert_eq!(found[0].region, common::token(1, 2, "MF-0610G").bbox);
    assert_eq!(found[0].page_number, 1);
}

#[test]
fn direct_needs_the_exact_raw_spelling() {
    let page = common::page(1, &["The", "code", "MF-0610G", "appears"]);

    let exact = TargetCode::explicit("MF-0610G").unwrap();
    assert_eq!(direct_matches(&page, &exact).len(), 1);

    // the joined page text has no space inside the token
    let spaced = TargetCode::explicit("MF-0610 G").unwrap();
    assert!(direct_matches(&page, &spaced).is_empty());
}

#[test]
fn direct_hit_can_span_token_boundaries() {
    let page = common::page(1, &["MF-0610G", "appears"]);
    let target = TargetCode::explicit("0610G app").unwrap();

    let found = direct_matches(&page, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens.len(), 2);
}

#[test]
fn split_across_tokens_unions_the_boxes() {
    let page = common::page(1, &["prefix", "MF-0610", "G", "suffix"]);
    let target = TargetCode::explicit("MF-0610G").unwrap();

    let found = sequence_matches(&page, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens.len(), 2);

    let left = common::token(1, 1, "MF-0610").bbox;
    let right = common::token(1, 2, "G").bbox;
    assert_eq!(found[0].region, left.union(&right));
}

#[test]
fn hyphenated_line_break_reads_through() {
    let page = common::page(1, &["INV-", "2024-001"]);
    let target = TargetCode::explicit("INV2024001").unwrap();

    let found = sequence_matches(&page, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens.len(), 2);
}

#[test]
fn repeated_code_matches_every_occurrence() {
    let page = common::page(1, &["AB", "noise", "AB"]);
    let target = TargetCode::explicit("AB").unwrap();

    let found = sequence_matches(&page, &target);
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].tokens[0].order, 0);
    assert_eq!(found[1].tokens[0].order, 2);
}

#[test]
fn runs_never_share_a_token() {
    let page = common::page(1, &["A", "B", "A"]);

    let ab = TargetCode::explicit("AB").unwrap();
    let found = sequence_matches(&page, &ab);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens.len(), 2);
    assert_eq!(found[0].tokens[0].order, 0);

    let ba = TargetCode::explicit("BA").unwrap();
    let found = sequence_matches(&page, &ba);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens[0].order, 1);
}

#[test]
fn dead_prefix_is_abandoned() {
    let page = common::page(1, &["XY", "YZ", "XYZW"]);
    let target = TargetCode::explicit("XYZ").unwrap();
    assert!(sequence_matches(&page, &target).is_empty());

    let page = common::page(1, &["X", "Y", "Z"]);
    let xy = TargetCode::explicit("XY").unwrap();
    let found = sequence_matches(&page, &xy);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens.len(), 2);
}

#[test]
fn interior_whitespace_token_joins_the_run() {
    let page = common::page(1, &["MF-", " ", "0610G"]);
    let target = TargetCode::explicit("MF-0610G").unwrap();

    let found = sequence_matches(&page, &target);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].tokens.len(), 3);
}

#[test]
fn equality_is_by_normalized_form() {
    let a = TargetCode::explicit("MF-0610 G").unwrap();
    let b = TargetCode::explicit("mf0610g").unwrap();
    let c = TargetCode::explicit("other").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.normalized, "mf0610g");
    assert_eq!(a.raw, "MF-0610 G");

    assert!(TargetCode::explicit("  \t ").is_err());
    assert!(TargetCode::explicit("- \u{00AD}").is_err());
}
