//! Name/tag substring filter used by listing and search.

use super::entry::{stem_of, Entry};

/// Split a free-text query into lowercase search terms
pub fn parse_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|term| term.to_lowercase())
        .collect()
}

/// True iff every term occurs somewhere in the entry's searchable text.
///
/// The searched text is the library label, the content name, the source file
/// stem and the tags (joined by `"; "`), lowercased. Terms are trimmed and
/// lowercased; an empty term list matches everything.
pub fn matches_filter<S: AsRef<str>>(entry: &Entry, library_label: &str, terms: &[S]) -> bool {
    if terms.is_empty() {
        return true;
    }

    let haystack = format!(
        "{} {} {} {}",
        library_label,
        entry.content_name,
        stem_of(&entry.source_path),
        entry.tags().join("; ")
    )
    .to_lowercase();

    terms
        .iter()
        .all(|term| haystack.contains(&term.as_ref().trim().to_lowercase()))
}
