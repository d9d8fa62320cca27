//! Tolerant parser from generated SQL text to the structural [`Query`].
//!
//! Generated SQL is routinely broken in small ways (dangling `FROM`, JOIN
//! with no base table, duplicated WHERE), so the parser accepts any clause
//! order and leaves missing pieces empty for the repair passes to fill. It
//! only rejects input that is not a single SELECT statement.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use super::query::{
    Condition, Expr, Join, JoinType, OrderByExpr, Query, SelectExpr, TableRef,
};
use super::token::{render, tokenize, Token};

/// Leading ```` ```sql ```` fence and its closing counterpart.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*(```\s*)?$").unwrap());

/// `SQL:` / `SQL Query:` label some generators echo back from the prompt.
static SQL_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*sql(\s+query)?\s*:\s*").unwrap());

/// Errors from parsing generated SQL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty query")]
    Empty,

    #[error("not a SELECT statement (starts with '{0}')")]
    NotSelect(String),

    #[error("JOIN without a table name")]
    JoinWithoutTable,

    #[error("unsupported SQL after the query: '{0}'")]
    Trailing(String),
}

/// Clause a token belongs to while splitting the statement.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Clause {
    Select,
    From,
    Join(JoinType),
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
}

/// Strip markdown fences and a `SQL:` label from generator output.
pub fn clean_generated(text: &str) -> String {
    let text = match CODE_FENCE.captures(text) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => text,
    };
    SQL_LABEL.replace(text, "").trim().to_string()
}

/// Parse generated SQL text into a [`Query`].
pub fn parse(text: &str) -> Result<Query, ParseError> {
    let mut tokens = tokenize(&clean_generated(text));

    // Keep only the first statement.
    if let Some(semi) = tokens.iter().position(|t| *t == Token::Semicolon) {
        tokens.truncate(semi);
    }

    let first = tokens.first().ok_or(ParseError::Empty)?;
    if !(first.is_word("SELECT") || first.is_word("FROM")) {
        return Err(ParseError::NotSelect(first.to_string()));
    }

    let mut query = Query::new();
    for (clause, body) in split_clauses(&tokens)? {
        apply_clause(&mut query, clause, body)?;
    }
    Ok(query)
}

/// Split a statement into clauses at top-level clause keywords.
fn split_clauses(tokens: &[Token]) -> Result<Vec<(Clause, &[Token])>, ParseError> {
    let mut clauses: Vec<(Clause, usize, usize)> = Vec::new();
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
        if depth > 0 {
            i += 1;
            continue;
        }

        let next_is = |word: &str| tokens.get(i + 1).is_some_and(|t| t.is_word(word));
        let start = if token.is_word("SELECT") && clauses.is_empty() {
            Some((Clause::Select, 1))
        } else if token.is_word("FROM") {
            Some((Clause::From, 1))
        } else if token.is_word("WHERE") {
            Some((Clause::Where, 1))
        } else if token.is_word("GROUP") && next_is("BY") {
            Some((Clause::GroupBy, 2))
        } else if token.is_word("HAVING") {
            Some((Clause::Having, 1))
        } else if token.is_word("ORDER") && next_is("BY") {
            Some((Clause::OrderBy, 2))
        } else if token.is_word("LIMIT") {
            Some((Clause::Limit, 1))
        } else if token.is_word("OFFSET") {
            Some((Clause::Offset, 1))
        } else if let Some((join_type, len)) = join_start(&tokens[i..]) {
            Some((Clause::Join(join_type), len))
        } else if ["UNION", "INTERSECT", "EXCEPT"]
            .iter()
            .any(|w| token.is_word(w))
        {
            return Err(ParseError::Trailing(render(&tokens[i..])));
        } else {
            None
        };

        match start {
            Some((clause, len)) => {
                if let Some(last) = clauses.last_mut() {
                    last.2 = i;
                }
                clauses.push((clause, i + len, tokens.len()));
                i += len;
            }
            None => i += 1,
        }
    }

    Ok(clauses
        .into_iter()
        .map(|(clause, start, end)| (clause, &tokens[start.min(end)..end]))
        .collect())
}

/// Recognise `[INNER|LEFT|RIGHT|FULL|CROSS] [OUTER] JOIN` at the head of
/// `tokens`, returning the join type and the keyword count.
fn join_start(tokens: &[Token]) -> Option<(JoinType, usize)> {
    let first = tokens.first()?;
    let (join_type, mut len) = if first.is_word("JOIN") {
        return Some((JoinType::Inner, 1));
    } else if first.is_word("INNER") {
        (JoinType::Inner, 1)
    } else if first.is_word("LEFT") {
        (JoinType::Left, 1)
    } else if first.is_word("RIGHT") {
        (JoinType::Right, 1)
    } else if first.is_word("FULL") {
        (JoinType::Full, 1)
    } else if first.is_word("CROSS") {
        (JoinType::Cross, 1)
    } else {
        return None;
    };
    if tokens.get(len).is_some_and(|t| t.is_word("OUTER")) {
        len += 1;
    }
    tokens
        .get(len)
        .filter(|t| t.is_word("JOIN"))
        .map(|_| (join_type, len + 1))
}

fn apply_clause(query: &mut Query, clause: Clause, body: &[Token]) -> Result<(), ParseError> {
    match clause {
        Clause::Select => {
            let body = match body.first() {
                Some(t) if t.is_word("DISTINCT") => {
                    query.distinct = true;
                    &body[1..]
                }
                Some(t) if t.is_word("ALL") => &body[1..],
                _ => body,
            };
            query.select = split_commas(body)
                .into_iter()
                .filter(|item| !item.is_empty())
                .map(SelectExpr::from_tokens)
                .collect();
        }
        Clause::From => {
            let mut items = split_commas(body).into_iter().filter(|i| !i.is_empty());
            if let Some(first) = items.next() {
                query.from = Some(parse_table_ref(first));
            }
            // `FROM a, b` is an implicit cross join.
            for item in items {
                query.joins.push(Join {
                    join_type: JoinType::Cross,
                    table: parse_table_ref(item),
                    on: None,
                });
            }
        }
        Clause::Join(join_type) => query.joins.push(parse_join(join_type, body)?),
        Clause::Where => append_predicate(&mut query.where_clause, body),
        Clause::Having => append_predicate(&mut query.having, body),
        Clause::GroupBy => {
            query.group_by.extend(
                split_commas(body)
                    .into_iter()
                    .filter(|item| !item.is_empty())
                    .map(Expr::from_tokens),
            );
        }
        Clause::OrderBy => {
            query.order_by.extend(
                split_commas(body)
                    .into_iter()
                    .filter(|item| !item.is_empty())
                    .map(OrderByExpr::from_tokens),
            );
        }
        Clause::Limit => match body {
            // MySQL `LIMIT offset, count`
            [Token::Number(offset), Token::Comma, Token::Number(count)] => {
                query.offset = offset.parse().ok();
                query.limit = count.parse().ok();
            }
            [Token::Number(count), ..] => query.limit = count.parse().ok(),
            _ => {}
        },
        Clause::Offset => {
            if let [Token::Number(offset), ..] = body {
                query.offset = offset.parse().ok();
            }
        }
    }
    Ok(())
}

/// Repeated WHERE/HAVING clauses are combined with AND.
fn append_predicate(slot: &mut Option<Vec<Token>>, body: &[Token]) {
    if body.is_empty() {
        return;
    }
    match slot {
        Some(existing) => {
            existing.push(Token::kw("AND"));
            existing.extend(body.iter().cloned());
        }
        None => *slot = Some(body.to_vec()),
    }
}

fn parse_join(join_type: JoinType, body: &[Token]) -> Result<Join, ParseError> {
    let cond_at = body
        .iter()
        .position(|t| t.is_word("ON") || t.is_word("USING"))
        .unwrap_or(body.len());
    let (table_tokens, rest) = body.split_at(cond_at);
    if table_tokens.is_empty() {
        return Err(ParseError::JoinWithoutTable);
    }

    let on = match rest {
        [] => None,
        [kw, cond @ ..] if kw.is_word("ON") => {
            (!cond.is_empty()).then(|| Condition::from_tokens(cond))
        }
        [_, Token::LParen, cols @ .., Token::RParen] => Some(Condition::Using(
            cols.iter()
                .filter_map(|t| t.as_ident().map(str::to_string))
                .collect(),
        )),
        [_, cond @ ..] => Some(Condition::Raw(cond.to_vec())),
    };

    Ok(Join {
        join_type,
        table: parse_table_ref(table_tokens),
        on,
    })
}

/// `name`, `name alias`, `name AS alias`, `schema.name ...`.
fn parse_table_ref(tokens: &[Token]) -> TableRef {
    let (name, rest) = match tokens {
        [schema, Token::Dot, table, rest @ ..] if schema.as_ident().is_some() => {
            match table.as_ident() {
                Some(table) => (table.to_string(), rest),
                None => (render(tokens), &[][..]),
            }
        }
        [table, rest @ ..] => match table.as_ident() {
            Some(table) => (table.to_string(), rest),
            None => (render(tokens), &[][..]),
        },
        [] => (String::new(), &[][..]),
    };

    let alias = match rest {
        [kw, alias] if kw.is_word("AS") => alias.as_ident(),
        [alias] => alias.as_ident(),
        _ => None,
    };
    let table = TableRef::new(&name);
    match alias {
        Some(alias) => table.with_alias(alias),
        None => table,
    }
}

/// Split on commas that are not nested in parentheses.
fn split_commas(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Comma if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() || !parts.is_empty() {
        parts.push(&tokens[start..]);
    }
    parts
}
