//! # sqlmend
//!
//! Repairs and validates SQL produced by a text-to-SQL model against a
//! schema written as `Table(col, col), Other(col)`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Request (question, schema text, profile hint)     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [schema, profile, intent::shortcuts]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Schema + relationship profile, or a canned answer   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [generator]
//! ┌─────────────────────────────────────────────────────────┐
//! │              Raw model output → sql::Query               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [repair, intent]
//! ┌─────────────────────────────────────────────────────────┐
//! │   normalize → joins → ambiguity → intent post-process    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [validation]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Corrected SQL, or "Error: … → Query: …"           │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod generator;
pub mod intent;
pub mod pipeline;
pub mod profile;
pub mod repair;
pub mod schema;
pub mod sql;
pub mod validation;

#[cfg(feature = "server")]
pub mod web;

pub use pipeline::{translate, Pipeline, PipelineError, Request, Response};
pub use schema::{Schema, SchemaParseError};
pub use sql::Query;
pub use validation::{Diagnostic, ValidationError};
