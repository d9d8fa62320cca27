//! Pluralization helpers for matching nouns against table names.
//!
//! Backed by the `inflector` crate, with a short list of irregular forms
//! that turn up as table names.

use inflector::Inflector;

/// Irregular plurals inflector gets wrong for table names.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("staff", "staff"),
    ("analysis", "analyses"),
    ("diagnosis", "diagnoses"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("index", "indices"),
];

/// Pluralize a word, checking irregulars before inflector.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *singular || lower == *plural {
            return plural.to_string();
        }
    }

    word.to_plural()
}

/// Singularize a word, checking irregulars before inflector.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let lower = word.to_lowercase();
    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return singular.to_string();
        }
    }

    word.to_singular()
}

/// Candidate table names a foreign-key style column points at.
///
/// `customer_id` yields `customers`, then the naive `customer` + `s`, then
/// `customer` itself. Columns that are not `<stem>_id` yield nothing.
pub fn referenced_table_candidates(column: &str) -> Vec<String> {
    let lower = column.to_lowercase();
    let Some(stem) = lower.strip_suffix("_id") else {
        return Vec::new();
    };
    if stem.is_empty() {
        return Vec::new();
    }

    let mut candidates = vec![pluralize(stem), format!("{}s", stem), stem.to_string()];
    candidates.dedup();
    candidates
}

/// Singular and plural spellings of a noun, lowercased.
pub fn noun_forms(word: &str) -> Vec<String> {
    let lower = word.to_lowercase();
    let mut forms = vec![singularize(&lower), pluralize(&lower)];
    if !forms.contains(&lower) {
        forms.push(lower);
    }
    forms.dedup();
    forms
}
