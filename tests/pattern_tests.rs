use refmark_pdf::pattern::{MarkerPattern, DEFAULT_LABEL, DEFAULT_TERMINATOR};

#[test]
fn default_marker_extracts_a_code() {
    let pattern = MarkerPattern::default();
    assert_eq!(pattern.label(), DEFAULT_LABEL);
    assert_eq!(pattern.terminator(), DEFAULT_TERMINATOR);
    assert_eq!(pattern.extract("see Ref: MF-0610/ for details"), vec!["MF-0610"]);
}

#[test]
fn whitespace_after_label_is_tolerated() {
    let pattern = MarkerPattern::default();
    assert_eq!(pattern.extract("Ref:AB.12/"), vec!["AB.12"]);
    assert_eq!(pattern.extract("Ref:    AB.12/"), vec!["AB.12"]);
}

#[test]
fn every_marker_on_the_page_is_found() {
    let pattern = MarkerPattern::default();
    assert_eq!(
        pattern.extract("Ref: A1/ some text Ref: B2/ more"),
        vec!["A1", "B2"]
    );
}

#[test]
fn repeated_terminators_end_one_code() {
    let pattern = MarkerPattern::default();
    assert_eq!(pattern.extract("Ref: A1///"), vec!["A1"]);
}

#[test]
fn unterminated_marker_is_ignored() {
    let pattern = MarkerPattern::default();
    assert!(pattern.extract("Ref: A1").is_empty());
    assert!(pattern.extract("nothing here at all").is_empty());
}

#[test]
fn captured_code_keeps_interior_spaces_and_hyphens() {
    let pattern = MarkerPattern::default();
    assert_eq!(pattern.extract("Ref: MF-0610 G/"), vec!["MF-0610 G"]);
}

#[test]
fn whitespace_only_capture_is_dropped() {
    let pattern = MarkerPattern::default();
    assert!(pattern.extract("Ref:  /").is_empty());
}

#[test]
fn custom_label_and_terminator() {
    let pattern = MarkerPattern::new("See:", ';').unwrap();
    assert_eq!(pattern.label(), "See:");
    assert_eq!(pattern.terminator(), ';');
    assert_eq!(pattern.extract("See: X.9; done"), vec!["X.9"]);
    assert!(pattern.extract("Ref: X.9/").is_empty());
}

#[test]
fn label_with_regex_metacharacters_matches_literally() {
    let pattern = MarkerPattern::new("C++ Ref.", '/').unwrap();
    assert_eq!(pattern.extract("C++ Ref. X1/"), vec!["X1"]);
    assert!(pattern.extract("Caa Refa X1/").is_empty());
}
