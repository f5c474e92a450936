//! Trigger text normalization.
//!
//! Applied to raw triggers before the pattern grammar sees them so that
//! "I'm", "i am" and "I AM" all compile to the same pattern. The table is
//! English-only. Trigger syntax characters pass through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered `(pattern, replacement)` table. Earlier entries win: specific
/// contractions come before the generic suffix forms.
static REPLACEMENTS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    const TABLE: &[(&str, &str)] = &[
        (r"[‘’ʼ`]", "'"),
        (r"[“”]", "\""),
        (r"[–—]", "-"),
        (r"\bi'm\b", "i am"),
        (r"\bcan't\b", "cannot"),
        (r"\bwon't\b", "will not"),
        (r"\bshan't\b", "shall not"),
        (r"\bain't\b", "is not"),
        (r"\blet's\b", "let us"),
        (r"\b(it|that|what|there|here|who|where|how|he|she)'s\b", "$1 is"),
        (r"\by'all\b", "you all"),
        (r"\b(\w+)n't\b", "$1 not"),
        (r"\b(\w+)'re\b", "$1 are"),
        (r"\b(\w+)'ll\b", "$1 will"),
        (r"\b(\w+)'ve\b", "$1 have"),
        (r"\b(\w+)'d\b", "$1 would"),
        (r"&", " and "),
    ];
    TABLE.iter().map(|(pat, rep)| (Regex::new(pat).unwrap(), *rep)).collect()
});

/// Lowercase `text`, apply the replacement table and collapse whitespace.
pub fn canonicalize(text: &str) -> String {
    let mut out = text.to_lowercase();
    for (re, rep) in REPLACEMENTS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *rep).into_owned();
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
