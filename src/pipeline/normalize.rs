//! Column label normalisation: sanitise and deduplicate header labels.
//!
//! PDF headers come out with line breaks, punctuation, stray spaces, missing
//! cells and repeated titles ("Amount", "Amount"). Spreadsheet consumers and
//! the merged export both need one usable, unique label per column, so every
//! label goes through the same three rules:
//!
//! 1. missing label → `Column_{i+1}`
//! 2. trim, collapse every run of non-word characters (whitespace included)
//!    into a single `_`, strip leading/trailing `_`; empty → `Column_{i+1}`
//! 3. left to right, a label already taken gets `_{n}` with the smallest
//!    positive `n` that is still free

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static RE_NON_WORD_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]+").unwrap());

/// Normalise a list of raw labels into unique, non-empty labels of the same
/// length.
pub fn normalize_columns(labels: &[Option<String>]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(labels.len());
    let mut out = Vec::with_capacity(labels.len());

    for (i, label) in labels.iter().enumerate() {
        let base = label
            .as_deref()
            .map(sanitize_label)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback_label(i));

        let unique = if taken.contains(&base) {
            (1..)
                .map(|n| format!("{base}_{n}"))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_else(|| fallback_label(i))
        } else {
            base
        };

        taken.insert(unique.clone());
        out.push(unique);
    }

    out
}

/// Apply rule 2 to a single label. May return an empty string.
pub fn sanitize_label(raw: &str) -> String {
    RE_NON_WORD_RUN
        .replace_all(raw.trim(), "_")
        .trim_matches('_')
        .to_string()
}

fn fallback_label(index: usize) -> String {
    format!("Column_{}", index + 1)
}
