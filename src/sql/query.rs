//! Structural query model - the small SELECT shape every repair pass edits.
//!
//! Clauses the repair passes reason about (select list, FROM, JOINs,
//! GROUP BY, ORDER BY, LIMIT) are structured; WHERE and HAVING stay as
//! token sequences because they are only ever rewritten locally.

use std::fmt;

use super::token::{render, Token};

/// Aggregate functions the model recognises as column wrappers.
const AGGREGATES: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

// =============================================================================
// Column references and expressions
// =============================================================================

/// A column reference, optionally qualified with a table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    pub fn new(column: &str) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn qualified(table: &str, column: &str) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.table.is_some()
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(3);
        if let Some(table) = &self.table {
            tokens.push(Token::Word(table.clone()));
            tokens.push(Token::Dot);
        }
        tokens.push(Token::Word(self.column.clone()));
        tokens
    }

    /// Parse `col` or `table.col`.
    pub fn from_tokens(tokens: &[Token]) -> Option<Self> {
        match tokens {
            [col] => col.as_ident().map(ColumnRef::new),
            [table, Token::Dot, col] => Some(ColumnRef::qualified(table.as_ident()?, col.as_ident()?)),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// An expression in a select list, GROUP BY or ORDER BY.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `*`
    Star,
    /// `table.*`
    TableStar(String),
    Column(ColumnRef),
    /// `COUNT(x)`, `SUM(DISTINCT x)`, ...
    Aggregate {
        func: String,
        distinct: bool,
        arg: Box<Expr>,
    },
    Literal(Token),
    /// Anything the model does not reason about, kept verbatim.
    Raw(Vec<Token>),
}

impl Expr {
    pub fn column(name: &str) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn qualified(table: &str, column: &str) -> Self {
        Expr::Column(ColumnRef::qualified(table, column))
    }

    /// Classify a token slice.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        if let Some(col) = ColumnRef::from_tokens(tokens) {
            return Expr::Column(col);
        }
        match tokens {
            [Token::Star] => Expr::Star,
            [table, Token::Dot, Token::Star] if table.as_ident().is_some() => {
                Expr::TableStar(table.as_ident().unwrap_or_default().to_string())
            }
            [lit @ (Token::Number(_) | Token::Str(_) | Token::DoubleQuoted(_))] => {
                Expr::Literal(lit.clone())
            }
            [Token::Word(func), Token::LParen, inner @ .., Token::RParen]
                if AGGREGATES.iter().any(|a| a.eq_ignore_ascii_case(func)) =>
            {
                let (distinct, inner) = match inner {
                    [first, rest @ ..] if first.is_word("DISTINCT") => (true, rest),
                    _ => (false, inner),
                };
                match Expr::from_tokens(inner) {
                    arg @ (Expr::Star | Expr::TableStar(_) | Expr::Column(_)) => Expr::Aggregate {
                        func: func.to_uppercase(),
                        distinct,
                        arg: Box::new(arg),
                    },
                    _ => Expr::Raw(tokens.to_vec()),
                }
            }
            _ => Expr::Raw(tokens.to_vec()),
        }
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        match self {
            Expr::Star => vec![Token::Star],
            Expr::TableStar(table) => vec![Token::Word(table.clone()), Token::Dot, Token::Star],
            Expr::Column(col) => col.to_tokens(),
            Expr::Aggregate {
                func,
                distinct,
                arg,
            } => {
                let mut tokens = vec![Token::Word(func.clone()), Token::LParen];
                if *distinct {
                    tokens.push(Token::kw("DISTINCT"));
                }
                tokens.extend(arg.to_tokens());
                tokens.push(Token::RParen);
                tokens
            }
            Expr::Literal(tok) => vec![tok.clone()],
            Expr::Raw(tokens) => tokens.clone(),
        }
    }

    /// The column reference this expression reads, looking through an
    /// aggregate wrapper.
    pub fn column_ref(&self) -> Option<&ColumnRef> {
        match self {
            Expr::Column(col) => Some(col),
            Expr::Aggregate { arg, .. } => arg.column_ref(),
            _ => None,
        }
    }

    pub fn is_star(&self) -> bool {
        matches!(self, Expr::Star | Expr::TableStar(_))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", render(&self.to_tokens()))
    }
}

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpr {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Parse one comma-separated select item, splitting off `AS alias` or a
    /// bare trailing alias.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        if let [body @ .., as_kw, alias] = tokens {
            if as_kw.is_word("AS") {
                if let Some(alias) = alias.as_ident() {
                    return SelectExpr::new(Expr::from_tokens(body)).with_alias(alias);
                }
            }
        }
        if let [body @ .., alias] = tokens {
            if let Some(name) = alias.as_ident() {
                let expr = Expr::from_tokens(body);
                if !body.is_empty() && !matches!(expr, Expr::Raw(_)) {
                    return SelectExpr::new(expr).with_alias(name);
                }
            }
        }
        SelectExpr::new(Expr::from_tokens(tokens))
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        let mut tokens = self.expr.to_tokens();
        if let Some(alias) = &self.alias {
            tokens.push(Token::kw("AS"));
            tokens.push(Token::Word(alias.clone()));
        }
        tokens
    }
}

impl From<Expr> for SelectExpr {
    fn from(expr: Expr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Table Reference
// =============================================================================

/// A table reference with optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        let mut tokens = vec![Token::Word(self.table.clone())];
        if let Some(alias) = &self.alias {
            tokens.push(Token::kw("AS"));
            tokens.push(Token::Word(alias.clone()));
        }
        tokens
    }
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

/// A JOIN predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `a[.x] = b[.y]`
    Equi { left: ColumnRef, right: ColumnRef },
    /// `USING (a, b)`
    Using(Vec<String>),
    Raw(Vec<Token>),
}

impl Condition {
    pub fn equi(left: ColumnRef, right: ColumnRef) -> Self {
        Condition::Equi { left, right }
    }

    /// Classify the tokens following `ON`.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        let eq = tokens
            .iter()
            .position(|t| matches!(t, Token::Op(op) if op == "="));
        if let Some(eq) = eq {
            if let (Some(left), Some(right)) = (
                ColumnRef::from_tokens(&tokens[..eq]),
                ColumnRef::from_tokens(&tokens[eq + 1..]),
            ) {
                return Condition::Equi { left, right };
            }
        }
        Condition::Raw(tokens.to_vec())
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        match self {
            Condition::Equi { left, right } => {
                let mut tokens = vec![Token::kw("ON")];
                tokens.extend(left.to_tokens());
                tokens.push(Token::op("="));
                tokens.extend(right.to_tokens());
                tokens
            }
            Condition::Using(columns) => {
                let mut tokens = vec![Token::kw("USING"), Token::LParen];
                for (i, col) in columns.iter().enumerate() {
                    if i > 0 {
                        tokens.push(Token::Comma);
                    }
                    tokens.push(Token::Word(col.clone()));
                }
                tokens.push(Token::RParen);
                tokens
            }
            Condition::Raw(raw) => {
                let mut tokens = vec![Token::kw("ON")];
                tokens.extend(raw.iter().cloned());
                tokens
            }
        }
    }
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: Option<Condition>,
}

impl Join {
    /// Inner join on `left = right`.
    pub fn inner(table: &str, left: ColumnRef, right: ColumnRef) -> Self {
        Self {
            join_type: JoinType::Inner,
            table: TableRef::new(table),
            on: Some(Condition::equi(left, right)),
        }
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        match self.join_type {
            JoinType::Inner => {}
            JoinType::Left => tokens.push(Token::kw("LEFT")),
            JoinType::Right => tokens.push(Token::kw("RIGHT")),
            JoinType::Full => tokens.extend([Token::kw("FULL"), Token::kw("OUTER")]),
            JoinType::Cross => tokens.push(Token::kw("CROSS")),
        }
        tokens.push(Token::kw("JOIN"));
        tokens.extend(self.table.to_tokens());
        if let Some(on) = &self.on {
            tokens.extend(on.to_tokens());
        }
        tokens
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// An ORDER BY expression.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub dir: Option<SortDir>,
}

impl OrderByExpr {
    pub fn new(expr: Expr) -> Self {
        Self { expr, dir: None }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            dir: Some(SortDir::Desc),
        }
    }

    /// Parse an ORDER BY item with an optional trailing direction.
    pub fn from_tokens(tokens: &[Token]) -> Self {
        match tokens {
            [body @ .., dir] if !body.is_empty() && dir.is_word("ASC") => Self {
                expr: Expr::from_tokens(body),
                dir: Some(SortDir::Asc),
            },
            [body @ .., dir] if !body.is_empty() && dir.is_word("DESC") => Self {
                expr: Expr::from_tokens(body),
                dir: Some(SortDir::Desc),
            },
            _ => Self::new(Expr::from_tokens(tokens)),
        }
    }

    pub fn to_tokens(&self) -> Vec<Token> {
        let mut tokens = self.expr.to_tokens();
        match self.dir {
            Some(SortDir::Asc) => tokens.push(Token::kw("ASC")),
            Some(SortDir::Desc) => tokens.push(Token::kw("DESC")),
            None => {}
        }
        tokens
    }
}

// =============================================================================
// Query
// =============================================================================

/// What to do with a table qualifier during a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    Keep,
    Rename(String),
    Drop,
}

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub distinct: bool,
    /// Empty when the generator emitted no explicit list; renders as `*`.
    pub select: Vec<SelectExpr>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub where_clause: Option<Vec<Token>>,
    pub group_by: Vec<Expr>,
    pub having: Option<Vec<Token>>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the SELECT list.
    pub fn select(mut self, exprs: Vec<impl Into<SelectExpr>>) -> Self {
        self.select = exprs.into_iter().map(|e| e.into()).collect();
        self
    }

    /// Set the FROM table.
    pub fn from(mut self, table: &str) -> Self {
        self.from = Some(TableRef::new(table));
        self
    }

    /// Add a JOIN.
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// The FROM table name.
    pub fn from_table(&self) -> Option<&str> {
        self.from.as_ref().map(|t| t.table.as_str())
    }

    pub fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }

    /// True if the select list is empty or a bare `*`.
    pub fn selects_everything(&self) -> bool {
        match self.select.as_slice() {
            [] => true,
            [only] => matches!(only.expr, Expr::Star),
            _ => false,
        }
    }

    /// Tables named in FROM and JOIN, FROM first, without duplicates.
    pub fn tables_in_scope(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = Vec::new();
        let names = self
            .from
            .iter()
            .map(|t| t.table.as_str())
            .chain(self.joins.iter().map(|j| j.table.table.as_str()));
        for name in names {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(name)) {
                tables.push(name);
            }
        }
        tables
    }

    /// The base table a qualifier names: a FROM/JOIN alias, else a FROM/JOIN
    /// table name. Aliases win over table names.
    pub fn resolve_qualifier(&self, qualifier: &str) -> Option<&str> {
        let mut by_name = None;
        for table in self.from.iter().chain(self.joins.iter().map(|j| &j.table)) {
            if table
                .alias
                .as_deref()
                .is_some_and(|a| a.eq_ignore_ascii_case(qualifier))
            {
                return Some(table.table.as_str());
            }
            if by_name.is_none() && table.table.eq_ignore_ascii_case(qualifier) {
                by_name = Some(table.table.as_str());
            }
        }
        by_name
    }

    /// True if `table` is already named in FROM or a JOIN.
    pub fn is_in_scope(&self, table: &str) -> bool {
        self.tables_in_scope()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Token sequences holding free-form predicates: WHERE, HAVING and
    /// non-equi JOIN conditions.
    pub fn predicate_tokens_mut(&mut self) -> Vec<&mut Vec<Token>> {
        let mut out = Vec::new();
        if let Some(tokens) = self.where_clause.as_mut() {
            out.push(tokens);
        }
        if let Some(tokens) = self.having.as_mut() {
            out.push(tokens);
        }
        for join in &mut self.joins {
            if let Some(Condition::Raw(tokens)) = join.on.as_mut() {
                out.push(tokens);
            }
        }
        out
    }

    /// Every table qualifier used by a column reference anywhere in the
    /// query, in order of appearance.
    pub fn referenced_qualifiers(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        };
        let mut exprs: Vec<&Expr> = self.select.iter().map(|s| &s.expr).collect();
        exprs.extend(self.group_by.iter());
        exprs.extend(self.order_by.iter().map(|o| &o.expr));
        for expr in exprs {
            match expr {
                Expr::TableStar(table) => push(table.as_str()),
                Expr::Raw(tokens) => raw_qualifiers(tokens).into_iter().for_each(&mut push),
                other => {
                    if let Some(table) = other.column_ref().and_then(|c| c.table.as_deref()) {
                        push(table);
                    }
                }
            }
        }
        for join in &self.joins {
            match &join.on {
                Some(Condition::Equi { left, right }) => {
                    for table in [&left.table, &right.table].into_iter().flatten() {
                        push(table.as_str());
                    }
                }
                Some(Condition::Raw(tokens)) => {
                    raw_qualifiers(tokens).into_iter().for_each(&mut push)
                }
                _ => {}
            }
        }
        for tokens in self.where_clause.iter().chain(self.having.iter()) {
            raw_qualifiers(tokens).into_iter().for_each(&mut push);
        }
        names
    }

    /// Rewrite every table qualifier (`t.` prefix) in column references,
    /// table stars and raw token sequences.
    pub fn rewrite_qualifiers(&mut self, f: &dyn Fn(&str) -> Qualifier) {
        let rewrite_col = |col: &mut ColumnRef| {
            if let Some(table) = &col.table {
                match f(table) {
                    Qualifier::Keep => {}
                    Qualifier::Rename(name) => col.table = Some(name),
                    Qualifier::Drop => col.table = None,
                }
            }
        };
        let rewrite_expr = |expr: &mut Expr| match expr {
            Expr::Column(col) => rewrite_col(col),
            Expr::Aggregate { arg, .. } => match arg.as_mut() {
                Expr::Column(col) => rewrite_col(col),
                Expr::TableStar(table) => {
                    if let Qualifier::Rename(name) = f(table) {
                        *table = name;
                    }
                }
                _ => {}
            },
            Expr::TableStar(table) => match f(table) {
                Qualifier::Keep => {}
                Qualifier::Rename(name) => *table = name,
                Qualifier::Drop => *expr = Expr::Star,
            },
            Expr::Raw(tokens) => rewrite_raw_qualifiers(tokens, f),
            _ => {}
        };

        for item in &mut self.select {
            rewrite_expr(&mut item.expr);
        }
        for expr in &mut self.group_by {
            rewrite_expr(expr);
        }
        for item in &mut self.order_by {
            rewrite_expr(&mut item.expr);
        }
        for join in &mut self.joins {
            if let Some(Condition::Equi { left, right }) = join.on.as_mut() {
                rewrite_col(left);
                rewrite_col(right);
            }
        }
        for tokens in self.predicate_tokens_mut() {
            rewrite_raw_qualifiers(tokens, f);
        }
    }

    /// Convert to tokens, without the trailing semicolon.
    pub fn to_tokens(&self) -> Vec<Token> {
        let mut ts = vec![Token::kw("SELECT")];
        if self.distinct {
            ts.push(Token::kw("DISTINCT"));
        }

        if self.select.is_empty() {
            ts.push(Token::Star);
        }
        for (i, item) in self.select.iter().enumerate() {
            if i > 0 {
                ts.push(Token::Comma);
            }
            ts.extend(item.to_tokens());
        }

        if let Some(from) = &self.from {
            ts.push(Token::kw("FROM"));
            ts.extend(from.to_tokens());
        }

        for join in &self.joins {
            ts.extend(join.to_tokens());
        }

        if let Some(where_clause) = &self.where_clause {
            ts.push(Token::kw("WHERE"));
            ts.extend(where_clause.iter().cloned());
        }

        if !self.group_by.is_empty() {
            ts.extend([Token::kw("GROUP"), Token::kw("BY")]);
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.push(Token::Comma);
                }
                ts.extend(expr.to_tokens());
            }
        }

        if let Some(having) = &self.having {
            ts.push(Token::kw("HAVING"));
            ts.extend(having.iter().cloned());
        }

        if !self.order_by.is_empty() {
            ts.extend([Token::kw("ORDER"), Token::kw("BY")]);
            for (i, item) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.push(Token::Comma);
                }
                ts.extend(item.to_tokens());
            }
        }

        if let Some(limit) = self.limit {
            ts.push(Token::kw("LIMIT"));
            ts.push(Token::Number(limit.to_string()));
        }
        if let Some(offset) = self.offset {
            ts.push(Token::kw("OFFSET"));
            ts.push(Token::Number(offset.to_string()));
        }

        ts
    }

    /// Render to a single-line SQL statement ending in `;`.
    pub fn to_sql(&self) -> String {
        let mut tokens = self.to_tokens();
        tokens.push(Token::Semicolon);
        render(&tokens)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

/// Qualifiers (`x` in `x.y`) appearing in a raw token sequence.
fn raw_qualifiers(tokens: &[Token]) -> Vec<&str> {
    tokens
        .windows(3)
        .filter_map(|w| match w {
            [q, Token::Dot, Token::Word(_) | Token::QuotedIdent(_) | Token::Star] => q.as_ident(),
            _ => None,
        })
        .collect()
}

fn rewrite_raw_qualifiers(tokens: &mut Vec<Token>, f: &dyn Fn(&str) -> Qualifier) {
    let mut i = 0;
    while i + 1 < tokens.len() {
        let is_prefix = matches!(tokens[i + 1], Token::Dot)
            && (i == 0 || !matches!(tokens[i - 1], Token::Dot));
        if is_prefix {
            if let Some(name) = tokens[i].as_ident().map(str::to_string) {
                match f(&name) {
                    Qualifier::Keep => {}
                    Qualifier::Rename(new_name) => tokens[i] = Token::Word(new_name),
                    Qualifier::Drop => {
                        tokens.drain(i..i + 2);
                        continue;
                    }
                }
            }
        }
        i += 1;
    }
}
