//! Row limits requested in the question ("top five orders", "limit 12").

use std::sync::LazyLock;

use regex::Regex;

use crate::schema::{inflection::noun_forms, Schema};

static EXPLICIT_LIMIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blimit\s+(\d+)").unwrap());

const NUMBER_WORDS: &[(&str, u64)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("hundred", 100),
];

/// Nouns a count can quantify regardless of schema.
const GENERIC_NOUNS: &[&str] = &[
    "user",
    "users",
    "product",
    "products",
    "order",
    "orders",
    "transaction",
    "transactions",
    "message",
    "messages",
    "method",
    "methods",
    "item",
    "items",
    "record",
    "records",
    "entry",
    "entries",
    "result",
    "results",
];

/// The row count the question asks for.
///
/// `limit N` wins over `N <noun>`, which wins over `<number word> <noun>`.
/// Nouns are the generic row nouns plus every table name's singular and
/// plural forms. Zero counts as no limit.
pub fn requested_limit(question: &str, schema: &Schema) -> Option<u64> {
    if let Some(n) = EXPLICIT_LIMIT
        .captures(question)
        .and_then(|c| c[1].parse::<u64>().ok())
    {
        return Some(n).filter(|n| *n > 0);
    }

    let nouns = noun_alternation(schema);

    let digits = Regex::new(&format!(r"(?i)\b(\d+)\s+(?:{})\b", nouns)).ok()?;
    if let Some(n) = digits
        .captures(question)
        .and_then(|c| c[1].parse::<u64>().ok())
    {
        return Some(n).filter(|n| *n > 0);
    }

    let words = NUMBER_WORDS
        .iter()
        .map(|(w, _)| *w)
        .collect::<Vec<_>>()
        .join("|");
    let spelled = Regex::new(&format!(r"(?i)\b({})\s+(?:{})\b", words, nouns)).ok()?;
    let word = spelled.captures(question)?[1].to_lowercase();
    NUMBER_WORDS
        .iter()
        .find(|(w, _)| *w == word)
        .map(|(_, n)| *n)
}

fn noun_alternation(schema: &Schema) -> String {
    let mut nouns: Vec<String> = GENERIC_NOUNS.iter().map(|n| n.to_string()).collect();
    for table in schema.table_names() {
        for form in noun_forms(table) {
            if !nouns.iter().any(|n| n.eq_ignore_ascii_case(&form)) {
                nouns.push(form);
            }
        }
    }
    // Longest first so "orderitems" is tried before "order".
    nouns.sort_by(|a, b| b.len().cmp(&a.len()));
    nouns
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|")
}
