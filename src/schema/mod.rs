//! Schema catalog - tables and columns parsed from an informal description.
//!
//! The caller describes its database as `Table(col1, col2), Other(col)`.
//! Only names are modeled; types or constraints written after a column
//! name are ignored. Table order is kept as declared because several
//! repairs fall back to "the first table".

pub mod inflection;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// One `Name(...)` fragment of the schema text.
static TABLE_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*\(\s*([^)]*)\s*\)").unwrap());

/// Error parsing schema text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaParseError {
    #[error("Schema parsing error: No valid tables found in schema.")]
    NoTables,
}

/// A table and its columns, in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
}

impl Table {
    /// Check for a column, exact spelling first, then case-insensitively.
    pub fn has_column(&self, column: &str) -> bool {
        self.column(column).is_some()
    }

    /// The declared spelling of a column.
    pub fn column(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| *c == column)
            .or_else(|| self.columns.iter().find(|c| c.eq_ignore_ascii_case(column)))
            .map(String::as_str)
    }
}

/// Parsed schema: table name to column set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    /// Parse `Table(col, ...)` fragments separated by commas or whitespace.
    pub fn parse(text: &str) -> Result<Self, SchemaParseError> {
        let mut schema = Schema::default();

        for caps in TABLE_FRAGMENT.captures_iter(text) {
            let name = &caps[1];
            let columns = caps[2]
                .split(',')
                .filter_map(|fragment| fragment.split_whitespace().next())
                .map(|col| col.trim_matches(|c: char| !c.is_alphanumeric() && c != '_'))
                .filter(|col| !col.is_empty())
                .map(str::to_string);

            let idx = match schema.tables.iter().position(|t| t.name == name) {
                Some(idx) => idx,
                None => {
                    schema.tables.push(Table {
                        name: name.to_string(),
                        columns: Vec::new(),
                    });
                    schema.tables.len() - 1
                }
            };
            let table = &mut schema.tables[idx];
            for col in columns {
                if !table.columns.contains(&col) {
                    table.columns.push(col);
                }
            }
        }

        if schema.tables.is_empty() {
            return Err(SchemaParseError::NoTables);
        }
        Ok(schema)
    }

    /// Build a schema from `(table, columns)` pairs.
    pub fn from_tables<'a>(tables: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        Self {
            tables: tables
                .into_iter()
                .map(|(name, columns)| Table {
                    name: name.to_string(),
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// The first declared table.
    pub fn first_table(&self) -> Option<&str> {
        self.tables.first().map(|t| t.name.as_str())
    }

    /// Look up a table, exact spelling first, then case-insensitively.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .or_else(|| self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name)))
    }

    /// The declared spelling of a table name.
    pub fn canonical_table_name(&self, name: &str) -> Option<&str> {
        self.table(name).map(|t| t.name.as_str())
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Does `table` have `column`? False for unknown tables.
    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.table(table).is_some_and(|t| t.has_column(column))
    }

    /// Tables declaring `column`, in declared order.
    pub fn tables_with_column(&self, column: &str) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| t.has_column(column))
            .map(|t| t.name.as_str())
            .collect()
    }

    /// True if any table declares a column with this name.
    pub fn is_column_anywhere(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.has_column(name))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, table) in self.tables.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}({})", table.name, table.columns.join(", "))?;
        }
        Ok(())
    }
}
