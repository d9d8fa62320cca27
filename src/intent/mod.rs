//! Intent post-processing - reconciling the repaired query with what the
//! question literally asked for.
//!
//! The generator tends to invent filters, pick a single key column where
//! the question wanted whole rows, and attach arbitrary LIMITs. These
//! passes run after structural repair and before validation.

pub mod limit;
pub mod shortcuts;

pub use limit::requested_limit;
pub use shortcuts::{find_shortcut, metadata_query, negative_template, Shortcut};

use std::sync::LazyLock;

use regex::Regex;

use crate::repair::run_pass;
use crate::schema::Schema;
use crate::sql::{ColumnRef, Expr, Query, SelectExpr, Token};

/// Question words that signal a filter is wanted.
static FILTER_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    let words = [
        "created", "date", "time", "active", "status", "amount", "price", "stock", "paid",
        "pending", "unpaid", "completed", "cancelled", "approved", "rejected", "marked as",
        "equal to", "greater than", "less than", "contains", "like", "where", "with", "having",
        "that are", "which are", "is", "are", "female", "male", "gender", "age", "older",
        "younger", "specialty", "city", "diagnosis", "medication", "treatment", "doctor",
        "patient", "appointment",
    ];
    Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|"))).unwrap()
});

/// Phrasings that introduce a condition on some noun.
static FILTER_PATTERNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)\bfrom\s+\w+|\bin\s+\w+|\bof\s+\w+|\bwith\s+\w+|\bthat\s+\w+|\bwhich\s+\w+|=\s*['"]?\w+['"]?|\b\w+\s+(?:is|are)\s+\w+"#,
    )
    .unwrap()
});

static LIST_ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)list all|show all|get all|fetch all|retrieve all|find all|all .+? that|all .+? which|all .+? from")
        .unwrap()
});

/// Column-name fragments that mark a status or key column.
const STATUS_FRAGMENTS: &[&str] = &[
    "status",
    "payment_status",
    "order_status",
    "active",
    "is_active",
    "state",
];

/// Apply every intent pass in order: HAVING relocation, spurious-filter
/// removal, list-all expansion, then LIMIT.
pub fn postprocess(query: &mut Query, question: &str, schema: &Schema) {
    run_pass("relocate_having_filters", query, relocate_having_filters);
    run_pass("remove_spurious_filters", query, |q| {
        remove_spurious_filters(q, question)
    });
    run_pass("expand_list_all", query, |q| {
        expand_list_all(q, question, schema)
    });
    run_pass("apply_limit", query, |q| apply_limit(q, question, schema));
}

/// True if the question reads like it asks for a filter.
pub fn has_filter_intent(question: &str) -> bool {
    FILTER_KEYWORDS.is_match(question) || FILTER_PATTERNS.is_match(question)
}

/// Drop WHERE and HAVING when nothing in the question asks for a filter.
pub fn remove_spurious_filters(query: &mut Query, question: &str) {
    if has_filter_intent(question) {
        return;
    }
    query.where_clause = None;
    query.having = None;
}

// =============================================================================
// HAVING relocation
// =============================================================================

/// Move `col op value` conditions on non-grouped, non-aggregated columns
/// from HAVING into WHERE. HAVING with a top-level OR is left alone.
pub fn relocate_having_filters(query: &mut Query) {
    let Some(having) = query.having.take() else {
        return;
    };
    let Some(conjuncts) = split_conjuncts(&having) else {
        query.having = Some(having);
        return;
    };

    let (moved, kept): (Vec<_>, Vec<_>) = conjuncts
        .into_iter()
        .partition(|c| plain_column_condition(c).is_some_and(|col| !is_grouped(query, &col)));

    for condition in moved {
        match query.where_clause.as_mut() {
            Some(tokens) => {
                tokens.push(Token::kw("AND"));
                tokens.extend(condition);
            }
            None => query.where_clause = Some(condition),
        }
    }
    query.having = join_conjuncts(kept);
}

/// Split on top-level AND. `BETWEEN a AND b` stays whole. None when a
/// top-level OR makes splitting unsound.
fn split_conjuncts(tokens: &[Token]) -> Option<Vec<Vec<Token>>> {
    let mut parts = vec![Vec::new()];
    let mut depth = 0usize;
    let mut in_between = false;
    for token in tokens {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth == 0 {
            if token.is_word("OR") {
                return None;
            }
            if token.is_word("BETWEEN") {
                in_between = true;
            } else if token.is_word("AND") {
                if in_between {
                    in_between = false;
                } else {
                    parts.push(Vec::new());
                    continue;
                }
            }
        }
        if let Some(part) = parts.last_mut() {
            part.push(token.clone());
        }
    }
    parts.retain(|p| !p.is_empty());
    Some(parts)
}

fn join_conjuncts(parts: Vec<Vec<Token>>) -> Option<Vec<Token>> {
    let mut out: Vec<Token> = Vec::new();
    for part in parts {
        if !out.is_empty() {
            out.push(Token::kw("AND"));
        }
        out.extend(part);
    }
    (!out.is_empty()).then_some(out)
}

/// The column of a `col op value` condition whose left side is a bare or
/// qualified column.
fn plain_column_condition(tokens: &[Token]) -> Option<ColumnRef> {
    let op = tokens
        .iter()
        .position(|t| t.is_comparison() || t.is_word("LIKE"))?;
    if op + 1 >= tokens.len() {
        return None;
    }
    ColumnRef::from_tokens(&tokens[..op])
}

fn is_grouped(query: &Query, col: &ColumnRef) -> bool {
    query.group_by.iter().any(|expr| {
        expr.column_ref()
            .is_some_and(|g| g.column.eq_ignore_ascii_case(&col.column))
    })
}

// =============================================================================
// List-all expansion
// =============================================================================

/// "List all X that ..." with a filter and a single status or key column
/// selected: the question wants whole rows, so select `*`.
pub fn expand_list_all(query: &mut Query, question: &str, schema: &Schema) {
    if !LIST_ALL.is_match(question) || query.where_clause.is_none() {
        return;
    }
    let [only] = query.select.as_slice() else {
        return;
    };
    let Expr::Column(col) = &only.expr else {
        return;
    };
    if !is_status_or_key(&col.column) {
        return;
    }

    query.distinct = false;
    query.select = vec![SelectExpr::new(Expr::Star)];
    rename_payment_method(query, schema);
}

fn is_status_or_key(column: &str) -> bool {
    let lower = column.to_lowercase();
    STATUS_FRAGMENTS.iter().any(|f| lower.contains(f)) || lower == "id" || lower.ends_with("_id")
}

/// A filter on `payment_method` where the FROM table only has
/// `payment_status` refers to the status column.
fn rename_payment_method(query: &mut Query, schema: &Schema) {
    let Some(from) = query.from_table() else {
        return;
    };
    if schema.has_column(from, "payment_method") || !schema.has_column(from, "payment_status") {
        return;
    }
    let Some(tokens) = query.where_clause.as_mut() else {
        return;
    };
    if tokens.iter().any(|t| t.is_word("payment_status")) {
        return;
    }
    for token in tokens.iter_mut() {
        if token.is_word("payment_method") {
            *token = Token::Word("payment_status".to_string());
        }
    }
}

// =============================================================================
// LIMIT
// =============================================================================

/// Set LIMIT to the count the question asks for, or remove it. OFFSET goes
/// with a removed LIMIT.
pub fn apply_limit(query: &mut Query, question: &str, schema: &Schema) {
    query.limit = requested_limit(question, schema);
    if query.limit.is_none() {
        query.offset = None;
    }
}
