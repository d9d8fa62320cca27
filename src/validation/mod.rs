//! Validation of repaired queries against the schema.
//!
//! Runs after every repair pass. The first problem found halts the
//! pipeline; checks run structural first, then columns, then JOIN
//! predicates, so an unknown table is always reported as such.

use std::fmt;

use crate::schema::Schema;
use crate::sql::{ColumnRef, Condition, Expr, Query};

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// FROM or JOIN names a table the schema does not declare.
    UnknownTable(String),
    /// FROM or JOIN names something that is a column, not a table.
    ColumnUsedAsTable(String),
    /// Nothing to select from.
    MissingFromTable,
    /// Bare select column missing from the FROM table (no JOINs).
    UnknownColumn {
        column: String,
        table: String,
        suggestion: Option<String>,
    },
    /// Bare select column missing from every in-scope table.
    ColumnNotInScope { column: String, tables: Vec<String> },
    /// `T.c` where `T` has no column `c`.
    UnknownQualifiedColumn { column: String, table: String },
    /// `T.c` where `T` is not in FROM or JOIN.
    TableNotInScope { table: String, column: String },
    /// A JOIN predicate names a column its table does not have.
    UnknownJoinColumn { column: String, table: String },
    /// The generated text could not be read as a SELECT.
    Unparseable(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownTable(table) => {
                write!(f, "Table '{}' does not exist.", table)
            }
            ValidationError::ColumnUsedAsTable(name) => write!(
                f,
                "'{}' is a column name, not a table name. Cannot use it in JOIN clause.",
                name
            ),
            ValidationError::MissingFromTable => write!(f, "Query has no FROM table."),
            ValidationError::UnknownColumn {
                column,
                table,
                suggestion,
            } => {
                write!(f, "Column '{}' does not exist in table '{}'", column, table)?;
                if let Some(suggestion) = suggestion {
                    write!(f, ". {}", suggestion)?;
                }
                Ok(())
            }
            ValidationError::ColumnNotInScope { column, tables } => write!(
                f,
                "Column '{}' does not exist in any of the used tables: {}",
                column,
                tables.join(", ")
            ),
            ValidationError::UnknownQualifiedColumn { column, table } => {
                write!(f, "Column '{}' does not exist in table '{}'", column, table)
            }
            ValidationError::TableNotInScope { table, column } => write!(
                f,
                "Table '{}' is referenced by '{}.{}' but is not in FROM or JOIN",
                table, table, column
            ),
            ValidationError::UnknownJoinColumn { column, table } => write!(
                f,
                "Column '{}' does not exist in table '{}' (JOIN condition)",
                column, table
            ),
            ValidationError::Unparseable(reason) => {
                write!(f, "Could not parse generated SQL: {}", reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validation failure paired with the most-repaired query text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub error: ValidationError,
    pub query: String,
}

impl Diagnostic {
    pub fn new(error: ValidationError, query: impl Into<String>) -> Self {
        Self {
            error,
            query: query.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {} → Query: {}", self.error, self.query)
    }
}

impl std::error::Error for Diagnostic {}

/// Validate a repaired query.
pub fn validate(query: &Query, schema: &Schema) -> Result<(), ValidationError> {
    validate_tables(query, schema)?;
    validate_columns(query, schema)?;
    validate_join_columns(query, schema)?;
    Ok(())
}

/// Every FROM/JOIN table exists in the schema.
fn validate_tables(query: &Query, schema: &Schema) -> Result<(), ValidationError> {
    if query.from.is_none() {
        return Err(ValidationError::MissingFromTable);
    }
    for table in query.tables_in_scope() {
        if schema.contains_table(table) {
            continue;
        }
        if schema.is_column_anywhere(table) {
            return Err(ValidationError::ColumnUsedAsTable(table.to_string()));
        }
        return Err(ValidationError::UnknownTable(table.to_string()));
    }
    Ok(())
}

/// Select-list columns exist where they are looked up. DISTINCT and
/// aggregate wrappers are looked through.
fn validate_columns(query: &Query, schema: &Schema) -> Result<(), ValidationError> {
    let Some(from) = query.from_table() else {
        return Err(ValidationError::MissingFromTable);
    };
    let scope = query.tables_in_scope();

    for item in &query.select {
        let expr = match &item.expr {
            Expr::Aggregate { arg, .. } => arg.as_ref(),
            other => other,
        };
        match expr {
            Expr::Column(col) if col.is_qualified() => validate_qualified(col, query, schema)?,
            Expr::Column(col) if !query.has_joins() => {
                if !schema.has_column(from, &col.column) {
                    return Err(ValidationError::UnknownColumn {
                        column: col.column.clone(),
                        table: from.to_string(),
                        suggestion: suggest_table_for_column(&col.column, from, schema),
                    });
                }
            }
            Expr::Column(col) => {
                if !scope.iter().any(|t| schema.has_column(t, &col.column)) {
                    return Err(ValidationError::ColumnNotInScope {
                        column: col.column.clone(),
                        tables: scope.iter().map(|t| t.to_string()).collect(),
                    });
                }
            }
            Expr::TableStar(qualifier) => {
                if query.resolve_qualifier(qualifier).is_none() {
                    return Err(ValidationError::TableNotInScope {
                        table: qualifier.clone(),
                        column: "*".to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// `q.c` where `q` is a FROM/JOIN alias or table name of a table with `c`.
fn validate_qualified(col: &ColumnRef, query: &Query, schema: &Schema) -> Result<(), ValidationError> {
    let qualifier = col.table.as_deref().unwrap_or_default();
    let Some(table) = query.resolve_qualifier(qualifier) else {
        return Err(ValidationError::TableNotInScope {
            table: qualifier.to_string(),
            column: col.column.clone(),
        });
    };
    if !schema.has_column(table, &col.column) {
        return Err(ValidationError::UnknownQualifiedColumn {
            column: col.column.clone(),
            table: table.to_string(),
        });
    }
    Ok(())
}

/// Columns in JOIN predicates exist in their tables. A bare left side is
/// looked up in the FROM table, a bare right side in the joined table.
/// A USING column must be in the joined table and in some table joined
/// before it; the nearest one is reported.
fn validate_join_columns(query: &Query, schema: &Schema) -> Result<(), ValidationError> {
    let from = query.from_table().unwrap_or_default();

    for (k, join) in query.joins.iter().enumerate() {
        let joined = join.table.table.as_str();
        match &join.on {
            Some(Condition::Equi { left, right }) => {
                check_join_side(left, from, query, schema)?;
                check_join_side(right, joined, query, schema)?;
            }
            Some(Condition::Using(columns)) => {
                let earlier: Vec<&str> = std::iter::once(from)
                    .chain(query.joins[..k].iter().map(|j| j.table.table.as_str()))
                    .collect();
                let nearest = earlier.last().copied().unwrap_or(from);
                for column in columns {
                    if !schema.has_column(joined, column) {
                        return Err(ValidationError::UnknownJoinColumn {
                            column: column.clone(),
                            table: joined.to_string(),
                        });
                    }
                    if !earlier.iter().any(|t| schema.has_column(t, column)) {
                        return Err(ValidationError::UnknownJoinColumn {
                            column: column.clone(),
                            table: nearest.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_join_side(
    col: &ColumnRef,
    default_table: &str,
    query: &Query,
    schema: &Schema,
) -> Result<(), ValidationError> {
    let table = match col.table.as_deref() {
        Some(qualifier) => query.resolve_qualifier(qualifier).unwrap_or(qualifier),
        None => default_table,
    };
    // Unknown qualifiers are reported by the structural check or left to
    // the database.
    if schema.contains_table(table) && !schema.has_column(table, &col.column) {
        return Err(ValidationError::UnknownJoinColumn {
            column: col.column.clone(),
            table: table.to_string(),
        });
    }
    Ok(())
}

/// Point at the table(s) that do have `column`.
fn suggest_table_for_column(column: &str, current: &str, schema: &Schema) -> Option<String> {
    let owners: Vec<&str> = schema
        .tables_with_column(column)
        .into_iter()
        .filter(|t| !t.eq_ignore_ascii_case(current))
        .collect();
    match owners.as_slice() {
        [] => None,
        [only] => Some(format!(
            "Column '{}' exists in table '{}'. Consider using a JOIN to access it.",
            column, only
        )),
        many => Some(format!(
            "Column '{}' exists in tables: '{}'. Consider using JOINs to access it.",
            column,
            many.join("', '")
        )),
    }
}
