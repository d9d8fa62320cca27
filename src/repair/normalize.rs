//! Query normalizer - superficial repairs, in a fixed order.
//!
//! Alias stripping runs before table casing so qualifiers are already
//! base-table names when casing is fixed. Value casing runs before quote
//! normalization and handles both quote styles itself.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::rules::CATEGORICAL_VALUES;
use super::run_pass;
use crate::schema::Schema;
use crate::sql::{Condition, Qualifier, Query, Token};

/// Aliases like `T1`, `T2` that generators invent.
static GENERATED_ALIAS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[Tt]\d+$").unwrap());

/// `HH:MM` time of day.
static TIME_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{1,2}$").unwrap());

/// ISO `YYYY-MM-DD` date.
static DATE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Run every normalizer pass in order.
pub fn normalize(query: &mut Query, schema: &Schema) {
    run_pass("strip_aliases", query, strip_aliases);
    run_pass("rewrite_temporal_likes", query, rewrite_temporal_likes);
    run_pass("fill_missing_from", query, |q| fill_missing_from(q, schema));
    run_pass("fill_from_before_join", query, |q| {
        fill_from_before_join(q, schema)
    });
    run_pass("normalize_table_casing", query, |q| {
        normalize_table_casing(q, schema)
    });
    run_pass("normalize_value_casing", query, normalize_value_casing);
    run_pass("normalize_quotes", query, normalize_quotes);
}

// =============================================================================
// Aliases
// =============================================================================

/// Replace table aliases with base table names.
///
/// Aliases are kept when the same table is bound twice, since they are the
/// only thing telling the copies apart. Qualifiers that look like generated
/// aliases (`T1.`) but are bound to nothing are dropped.
pub fn strip_aliases(query: &mut Query) {
    let bindings: Vec<(&str, Option<&str>)> = query
        .from
        .iter()
        .chain(query.joins.iter().map(|j| &j.table))
        .map(|t| (t.table.as_str(), t.alias.as_deref()))
        .collect();

    let mut seen = HashSet::new();
    if !bindings.iter().all(|(table, _)| seen.insert(table.to_lowercase())) {
        return;
    }

    let aliases: Vec<(String, String)> = bindings
        .iter()
        .filter_map(|(table, alias)| alias.map(|a| (a.to_string(), table.to_string())))
        .collect();
    let tables: Vec<String> = bindings.iter().map(|(t, _)| t.to_string()).collect();

    for table in query
        .from
        .iter_mut()
        .chain(query.joins.iter_mut().map(|j| &mut j.table))
    {
        table.alias = None;
    }

    query.rewrite_qualifiers(&|qualifier: &str| {
        if let Some((_, table)) = aliases.iter().find(|(a, _)| a.eq_ignore_ascii_case(qualifier)) {
            return Qualifier::Rename(table.clone());
        }
        let bound = tables.iter().any(|t| t.eq_ignore_ascii_case(qualifier));
        if !bound && GENERATED_ALIAS.is_match(qualifier) {
            Qualifier::Drop
        } else {
            Qualifier::Keep
        }
    });
}

// =============================================================================
// Literals
// =============================================================================

/// Rewrite `LIKE 'HH:MM'` into a full-day `BETWEEN` and `LIKE 'YYYY-MM-DD'`
/// into an equality.
pub fn rewrite_temporal_likes(query: &mut Query) {
    for tokens in query.predicate_tokens_mut() {
        let mut i = 0;
        while i + 1 < tokens.len() {
            let negated = i > 0 && tokens[i - 1].is_word("NOT");
            if !tokens[i].is_word("LIKE") || negated {
                i += 1;
                continue;
            }
            let replacement = match tokens[i + 1].as_text_literal() {
                Some(text) if TIME_LITERAL.is_match(text) => vec![
                    Token::kw("BETWEEN"),
                    Token::Str("00:00".into()),
                    Token::kw("AND"),
                    Token::Str("23:59".into()),
                ],
                Some(text) if DATE_LITERAL.is_match(text) => {
                    vec![Token::op("="), Token::Str(text.to_string())]
                }
                _ => {
                    i += 1;
                    continue;
                }
            };
            let len = replacement.len();
            tokens.splice(i..i + 2, replacement);
            i += len;
        }
    }
}

/// Canonical capitalisation for known categorical values, either quote
/// style.
pub fn normalize_value_casing(query: &mut Query) {
    for tokens in query.predicate_tokens_mut() {
        for i in 0..tokens.len() {
            let Some(value) = tokens[i].as_text_literal() else {
                continue;
            };
            let Some(column) = value_column(tokens, i) else {
                continue;
            };
            let canonical = CATEGORICAL_VALUES
                .iter()
                .filter(|(col, _)| col.eq_ignore_ascii_case(column))
                .flat_map(|(_, values)| values.iter())
                .find(|v| v.eq_ignore_ascii_case(value) && **v != value);
            if let Some(canonical) = canonical {
                tokens[i] = match &tokens[i] {
                    Token::DoubleQuoted(_) => Token::DoubleQuoted(canonical.to_string()),
                    _ => Token::Str(canonical.to_string()),
                };
            }
        }
    }
}

/// Double-quoted values compared against columns become single-quoted
/// string literals.
pub fn normalize_quotes(query: &mut Query) {
    for tokens in query.predicate_tokens_mut() {
        for i in 0..tokens.len() {
            if let Token::DoubleQuoted(text) = &tokens[i] {
                if is_value_position(tokens, i) {
                    tokens[i] = Token::Str(text.clone());
                }
            }
        }
    }
}

/// True if the token at `i` is the right-hand operand of a comparison,
/// `LIKE`, `BETWEEN` bound or `IN (...)` list member.
fn is_value_position(tokens: &[Token], i: usize) -> bool {
    if i == 0 {
        return false;
    }
    let prev = &tokens[i - 1];
    if prev.is_comparison() || prev.is_word("LIKE") || prev.is_word("BETWEEN") {
        return true;
    }
    if prev.is_word("AND") && i >= 3 && tokens[i - 3].is_word("BETWEEN") {
        return true;
    }
    in_list_column(tokens, i).is_some()
}

/// The column a literal at `i` is compared against, if it sits in a
/// comparison, `LIKE` or `IN (...)` list.
fn value_column(tokens: &[Token], i: usize) -> Option<&str> {
    if i >= 2 && (tokens[i - 1].is_comparison() || tokens[i - 1].is_word("LIKE")) {
        return tokens[i - 2].as_ident();
    }
    in_list_column(tokens, i)
}

/// For a literal inside `col [NOT] IN ('a', 'b')`, the column name.
fn in_list_column(tokens: &[Token], i: usize) -> Option<&str> {
    let mut j = i.checked_sub(1)?;
    while tokens[j] == Token::Comma || tokens[j].as_text_literal().is_some() {
        j = j.checked_sub(1)?;
    }
    if tokens[j] != Token::LParen {
        return None;
    }
    let in_kw = j.checked_sub(1)?;
    if !tokens[in_kw].is_word("IN") {
        return None;
    }
    let mut col = in_kw.checked_sub(1)?;
    if tokens[col].is_word("NOT") {
        col = col.checked_sub(1)?;
    }
    tokens[col].as_ident()
}

// =============================================================================
// Missing FROM target
// =============================================================================

/// `SELECT ... FROM WHERE ...` or a dangling `FROM`: use the first declared
/// table.
pub fn fill_missing_from(query: &mut Query, schema: &Schema) {
    if query.from.is_some() || query.has_joins() {
        return;
    }
    if let Some(first) = schema.first_table() {
        query.from = Some(crate::sql::TableRef::new(first));
    }
}

/// `FROM JOIN x ON ...`: prefer a schema table named in the first join's
/// predicate that is not joined yet, else the first declared table that is
/// not joined.
pub fn fill_from_before_join(query: &mut Query, schema: &Schema) {
    if query.from.is_some() || !query.has_joins() {
        return;
    }

    let joined: Vec<&str> = query.joins.iter().map(|j| j.table.table.as_str()).collect();
    let is_joined = |name: &str| joined.iter().any(|j| j.eq_ignore_ascii_case(name));

    let from_predicate = match query.joins.first().and_then(|j| j.on.as_ref()) {
        Some(Condition::Equi { left, right }) => [&left.table, &right.table]
            .into_iter()
            .flatten()
            .filter_map(|t| schema.canonical_table_name(t))
            .find(|t| !is_joined(*t)),
        _ => None,
    };
    let table = from_predicate.or_else(|| {
        schema
            .table_names()
            .into_iter()
            .find(|t| !is_joined(*t))
    });

    if let Some(table) = table {
        query.from = Some(crate::sql::TableRef::new(table));
    }
}

// =============================================================================
// Table casing
// =============================================================================

/// Table names and qualifiers take the schema's declared spelling.
pub fn normalize_table_casing(query: &mut Query, schema: &Schema) {
    for table in query
        .from
        .iter_mut()
        .chain(query.joins.iter_mut().map(|j| &mut j.table))
    {
        if let Some(canonical) = schema.canonical_table_name(&table.table) {
            if canonical != table.table {
                table.table = canonical.to_string();
            }
        }
    }

    query.rewrite_qualifiers(&|qualifier: &str| match schema.canonical_table_name(qualifier) {
        Some(canonical) if canonical != qualifier => Qualifier::Rename(canonical.to_string()),
        _ => Qualifier::Keep,
    });
}
