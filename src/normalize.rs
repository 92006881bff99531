use unicode_normalization::UnicodeNormalization;

/// Hyphen-like characters dropped during normalization. NFKC already folds
/// U+2011 into U+2010; both are listed so the set stands on its own.
const HYPHENS: [char; 4] = ['-', '\u{00AD}', '\u{2010}', '\u{2011}'];

/// Canonical comparison form of a piece of text.
///
/// Trims surrounding whitespace, applies NFKC (so ligatures extracted from
/// PDF text, `ﬁ` and friends, become their plain letters), drops every
/// whitespace and hyphen character, and lowercases the rest. The output is
/// a fixed point: normalizing it again changes nothing. An output of `""`
/// means the input had no matchable content.
pub fn normalize(input: &str) -> String {
    input
        .trim()
        .nfkc()
        .filter(|c| !c.is_whitespace() && !HYPHENS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}
