//! Relationship catalog - hand-curated database profiles.
//!
//! A profile names a known database shape: the tables that identify it,
//! the table queries should start from, and the equi-join predicate for
//! each related table pair. Profiles are process-wide constants; adding a
//! new shape means adding a new [`Profile`] to [`PROFILES`].

mod graph;

pub use graph::{JoinGraph, JoinStep};

use crate::schema::Schema;

/// `left_table.left_column = right_table.right_column`, joinable either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub left_table: &'static str,
    pub left_column: &'static str,
    pub right_table: &'static str,
    pub right_column: &'static str,
}

impl Relationship {
    const fn new(
        left_table: &'static str,
        left_column: &'static str,
        right_table: &'static str,
        right_column: &'static str,
    ) -> Self {
        Self {
            left_table,
            left_column,
            right_table,
            right_column,
        }
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{} = {}.{}",
            self.left_table, self.left_column, self.right_table, self.right_column
        )
    }
}

/// A named database shape.
#[derive(Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: &'static str,
    /// Table an "all tables" query starts from.
    pub primary_table: &'static str,
    /// Tables whose presence identifies this profile.
    pub indicators: &'static [&'static str],
    pub relationships: &'static [Relationship],
}

/// Minimum number of indicator tables a schema must contain to match.
const MIN_INDICATOR_OVERLAP: usize = 2;

pub static RETAIL_DB: Profile = Profile {
    name: "RetailDB",
    primary_table: "Customers",
    indicators: &["Customers", "Orders", "OrderItems", "Products", "Payments"],
    relationships: &[
        Relationship::new("Customers", "customer_id", "Orders", "customer_id"),
        Relationship::new("Orders", "order_id", "OrderItems", "order_id"),
        Relationship::new("OrderItems", "product_id", "Products", "product_id"),
        Relationship::new("Orders", "order_id", "Payments", "order_id"),
    ],
};

pub static HOSPITAL_DB: Profile = Profile {
    name: "HospitalDB",
    primary_table: "Patients",
    indicators: &["Patients", "Appointments", "Doctors", "Treatments", "Billing"],
    relationships: &[
        Relationship::new("Patients", "patient_id", "Appointments", "patient_id"),
        Relationship::new("Doctors", "doctor_id", "Appointments", "doctor_id"),
        Relationship::new("Appointments", "appointment_id", "Treatments", "appointment_id"),
        Relationship::new("Appointments", "appointment_id", "Billing", "appointment_id"),
    ],
};

/// All known profiles, in detection priority order.
pub static PROFILES: &[&Profile] = &[&RETAIL_DB, &HOSPITAL_DB];

impl Profile {
    /// Find a profile by name, case-insensitively.
    pub fn by_name(name: &str) -> Option<&'static Profile> {
        PROFILES
            .iter()
            .copied()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Number of this profile's indicator tables present in `schema`.
    pub fn overlap(&self, schema: &Schema) -> usize {
        self.indicators
            .iter()
            .filter(|t| schema.contains_table(t))
            .count()
    }

    /// Join graph over the declared relationships that hold in `schema`,
    /// spelled the way the schema spells them.
    pub fn graph(&self, schema: &Schema) -> JoinGraph {
        let mut graph = JoinGraph::new();
        for rel in self.relationships {
            let step = JoinStep::new(rel.left_table, rel.left_column, rel.right_table, rel.right_column);
            if let Some(step) = step.resolve(schema) {
                graph.add_edge(&step.from_table, &step.from_column, &step.to_table, &step.to_column);
            }
        }
        graph
    }
}

/// Detect which profile a schema matches: at least two indicator tables,
/// the larger overlap winning ties between profiles.
pub fn detect_profile(schema: &Schema) -> Option<&'static Profile> {
    let mut best: Option<(&'static Profile, usize)> = None;
    for profile in PROFILES.iter().copied() {
        let overlap = profile.overlap(schema);
        if overlap < MIN_INDICATOR_OVERLAP {
            continue;
        }
        if best.is_none_or(|(_, best_overlap)| overlap > best_overlap) {
            best = Some((profile, overlap));
        }
    }
    best.map(|(profile, _)| profile)
}

/// Resolve the profile for a request.
///
/// A known hint selects that profile; an unknown non-empty hint disables
/// profile repairs; no hint (or an empty one) falls back to detection.
pub fn resolve_profile(hint: Option<&str>, schema: &Schema) -> Option<&'static Profile> {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(name) => Profile::by_name(name),
        None => detect_profile(schema),
    }
}
