//! Identifier matching for layout resolution.
//!
//! Two matching modes exist: exact comparison of cleaned identifiers, and
//! glob matching where `*` spans within one path segment, `?` matches one
//! non-separator character, and `**` spans across segments.

use crate::identifier::Identifier;

/// A pattern an identifier can be tested against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Matches identifiers whose cleaned form equals this one's.
    Exact(Identifier),
    /// Matches identifiers against a glob expression.
    Glob(String),
}

impl Pattern {
    /// Tests whether `identifier` matches this pattern.
    pub fn matches(&self, identifier: &Identifier) -> bool {
        match self {
            Pattern::Exact(wanted) => wanted.cleaned() == identifier.cleaned(),
            Pattern::Glob(glob) => glob_match(glob, identifier.as_str()),
        }
    }
}

/// Matches `text` against a glob `pattern`.
///
/// `*` matches any run of characters except `/`, `?` matches exactly one
/// character except `/`, and `**` matches any run including `/`. All other
/// characters match themselves.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    match_from(&pattern, &text)
}

fn match_from(pattern: &[char], text: &[char]) -> bool {
    let Some(&head) = pattern.first() else {
        return text.is_empty();
    };
    match head {
        '*' if pattern.get(1) == Some(&'*') => {
            let rest = &pattern[2..];
            (0..=text.len()).any(|skip| match_from(rest, &text[skip..]))
        }
        '*' => {
            let rest = &pattern[1..];
            (0..=text.len())
                .take_while(|&skip| skip == 0 || text[skip - 1] != '/')
                .any(|skip| match_from(rest, &text[skip..]))
        }
        '?' => !text.is_empty() && text[0] != '/' && match_from(&pattern[1..], &text[1..]),
        literal => !text.is_empty() && text[0] == literal && match_from(&pattern[1..], &text[1..]),
    }
}
