//! SQL text handling.
//!
//! - [`token`] - tolerant lexer and renderer
//! - [`query`] - structural SELECT model
//! - [`parser`] - generated text to [`Query`]

pub mod parser;
pub mod query;
pub mod token;

pub use parser::{clean_generated, parse, ParseError};
pub use query::{
    ColumnRef, Condition, Expr, Join, JoinType, OrderByExpr, Qualifier, Query, SelectExpr,
    SortDir, TableRef,
};
pub use token::{render, tokenize, Token};
