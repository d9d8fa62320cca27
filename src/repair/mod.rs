//! Query repair passes.
//!
//! Every pass is a total function over a parsed [`Query`]: it either
//! improves the query or leaves it untouched, and never fails. Problems a
//! pass cannot fix are left for the validator to report, so error messages
//! always show the most-repaired form of the query.
//!
//! - [`normalize`] - superficial defects (aliases, literals, casing)
//! - [`joins`] - JOIN structure
//! - [`ambiguity`] - qualifying column references

pub mod ambiguity;
pub mod joins;
pub mod normalize;
mod rules;

pub use ambiguity::resolve_ambiguity;
pub use joins::resolve_joins;
pub use normalize::normalize;

use tracing::debug;

use crate::profile::Profile;
use crate::schema::Schema;
use crate::sql::Query;

/// Request-scoped inputs shared by the repair passes.
#[derive(Debug, Clone, Copy)]
pub struct RepairContext<'a> {
    pub schema: &'a Schema,
    pub question: &'a str,
    pub profile: Option<&'static Profile>,
}

impl<'a> RepairContext<'a> {
    pub fn new(schema: &'a Schema, question: &'a str, profile: Option<&'static Profile>) -> Self {
        Self {
            schema,
            question,
            profile,
        }
    }
}

/// Run one named pass, logging the before/after text when it changed
/// something. Returns whether the query changed.
pub(crate) fn run_pass(name: &str, query: &mut Query, pass: impl FnOnce(&mut Query)) -> bool {
    let before = query.clone();
    pass(query);
    let changed = *query != before;
    if changed {
        debug!(pass = name, before = %before, after = %query, "repair applied");
    }
    changed
}
