//! Lookup tables driving the join and literal repairs.
//!
//! These are hand-curated facts about the known database shapes. Each
//! table is plain data; adding a pattern means adding an entry.

use crate::profile::JoinStep;

/// One static JOIN hop: `from_table.from_column = to_table.to_column`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Link {
    pub from_table: &'static str,
    pub from_column: &'static str,
    pub to_table: &'static str,
    pub to_column: &'static str,
}

const fn link(
    from_table: &'static str,
    from_column: &'static str,
    to_table: &'static str,
    to_column: &'static str,
) -> Link {
    Link {
        from_table,
        from_column,
        to_table,
        to_column,
    }
}

impl Link {
    fn step(&self) -> JoinStep {
        JoinStep::new(self.from_table, self.from_column, self.to_table, self.to_column)
    }

    fn reversed(&self) -> JoinStep {
        JoinStep::new(self.to_table, self.to_column, self.from_table, self.from_column)
    }
}

/// A chain of links read in declared order, or walked backwards.
pub(crate) fn chain_steps(links: &[Link], reverse: bool) -> Vec<JoinStep> {
    if reverse {
        links.iter().rev().map(Link::reversed).collect()
    } else {
        links.iter().map(Link::step).collect()
    }
}

/// A direct join predicate the generator writes for tables that are only
/// related through a bridge table, and the valid chain to use instead.
#[derive(Debug)]
pub(crate) struct BridgeRule {
    pub left: (&'static str, &'static str),
    pub right: (&'static str, &'static str),
    /// Valid chain from `left.0` to `right.0`.
    pub path: &'static [Link],
}

impl BridgeRule {
    /// True if `a = b` is this rule's invalid predicate, in either order.
    pub fn matches(&self, a: (&str, &str), b: (&str, &str)) -> bool {
        let eq = |x: (&str, &str), y: (&str, &str)| {
            x.0.eq_ignore_ascii_case(y.0) && x.1.eq_ignore_ascii_case(y.1)
        };
        (eq(self.left, a) && eq(self.right, b)) || (eq(self.left, b) && eq(self.right, a))
    }
}

pub(crate) static BRIDGE_RULES: &[BridgeRule] = &[
    BridgeRule {
        left: ("Patients", "patient_id"),
        right: ("Billing", "patient_id"),
        path: &[
            link("Patients", "patient_id", "Appointments", "patient_id"),
            link("Appointments", "appointment_id", "Billing", "appointment_id"),
        ],
    },
    BridgeRule {
        left: ("Doctors", "doctor_id"),
        right: ("Billing", "doctor_id"),
        path: &[
            link("Doctors", "doctor_id", "Appointments", "doctor_id"),
            link("Appointments", "appointment_id", "Billing", "appointment_id"),
        ],
    },
    BridgeRule {
        left: ("Treatments", "treatment_id"),
        right: ("Patients", "treatment_id"),
        path: &[
            link("Treatments", "appointment_id", "Appointments", "appointment_id"),
            link("Appointments", "patient_id", "Patients", "patient_id"),
        ],
    },
    BridgeRule {
        left: ("Treatments", "treatment_id"),
        right: ("Doctors", "treatment_id"),
        path: &[
            link("Treatments", "appointment_id", "Appointments", "appointment_id"),
            link("Appointments", "doctor_id", "Doctors", "doctor_id"),
        ],
    },
    BridgeRule {
        left: ("Doctors", "doctor_id"),
        right: ("Treatments", "doctor_id"),
        path: &[
            link("Doctors", "doctor_id", "Appointments", "doctor_id"),
            link("Appointments", "appointment_id", "Treatments", "appointment_id"),
        ],
    },
    BridgeRule {
        left: ("Customers", "product_id"),
        right: ("Products", "product_id"),
        path: &[
            link("Customers", "customer_id", "Orders", "customer_id"),
            link("Orders", "order_id", "OrderItems", "order_id"),
            link("OrderItems", "product_id", "Products", "product_id"),
        ],
    },
];

/// Columns selected from `from_table` that actually live at the end of
/// `path`.
#[derive(Debug)]
pub(crate) struct CrossTableRule {
    pub from_table: &'static str,
    pub columns: &'static [&'static str],
    pub path: &'static [Link],
}

impl CrossTableRule {
    /// The table owning the rule's columns.
    pub fn target_table(&self) -> &'static str {
        self.path.last().map_or(self.from_table, |l| l.to_table)
    }
}

pub(crate) static CROSS_TABLE_RULES: &[CrossTableRule] = &[
    CrossTableRule {
        from_table: "Orders",
        columns: &["city", "first_name", "last_name", "email", "phone"],
        path: &[link("Orders", "customer_id", "Customers", "customer_id")],
    },
    CrossTableRule {
        from_table: "Orders",
        columns: &["name", "category", "price"],
        path: &[
            link("Orders", "order_id", "OrderItems", "order_id"),
            link("OrderItems", "product_id", "Products", "product_id"),
        ],
    },
];

/// Join chain for a column missing from the FROM table.
#[derive(Debug)]
pub(crate) struct MissingColumnRule {
    pub from_table: &'static str,
    pub column: &'static str,
    pub path: &'static [Link],
}

const BILLING_TO_PATIENTS: &[Link] = &[
    link("Billing", "appointment_id", "Appointments", "appointment_id"),
    link("Appointments", "patient_id", "Patients", "patient_id"),
];
const BILLING_TO_DOCTORS: &[Link] = &[
    link("Billing", "appointment_id", "Appointments", "appointment_id"),
    link("Appointments", "doctor_id", "Doctors", "doctor_id"),
];
const TREATMENTS_TO_PATIENTS: &[Link] = &[
    link("Treatments", "appointment_id", "Appointments", "appointment_id"),
    link("Appointments", "patient_id", "Patients", "patient_id"),
];
const TREATMENTS_TO_DOCTORS: &[Link] = &[
    link("Treatments", "appointment_id", "Appointments", "appointment_id"),
    link("Appointments", "doctor_id", "Doctors", "doctor_id"),
];
const APPOINTMENTS_TO_PATIENTS: &[Link] =
    &[link("Appointments", "patient_id", "Patients", "patient_id")];

pub(crate) static MISSING_COLUMN_RULES: &[MissingColumnRule] = &[
    MissingColumnRule {
        from_table: "Billing",
        column: "patient_id",
        path: BILLING_TO_PATIENTS,
    },
    MissingColumnRule {
        from_table: "Treatments",
        column: "patient_id",
        path: TREATMENTS_TO_PATIENTS,
    },
    MissingColumnRule {
        from_table: "Billing",
        column: "doctor_id",
        path: BILLING_TO_DOCTORS,
    },
    MissingColumnRule {
        from_table: "Treatments",
        column: "doctor_id",
        path: TREATMENTS_TO_DOCTORS,
    },
    MissingColumnRule {
        from_table: "Appointments",
        column: "first_name",
        path: APPOINTMENTS_TO_PATIENTS,
    },
    MissingColumnRule {
        from_table: "Appointments",
        column: "last_name",
        path: APPOINTMENTS_TO_PATIENTS,
    },
];

/// Categorical columns and their canonical values.
pub(crate) static CATEGORICAL_VALUES: &[(&str, &[&str])] = &[
    ("gender", &["Female", "Male"]),
    ("payment_status", &["Paid", "Pending", "Unpaid"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_rule_matches_either_order() {
        let rule = &BRIDGE_RULES[0];
        assert!(rule.matches(("patients", "patient_id"), ("Billing", "patient_id")));
        assert!(rule.matches(("Billing", "patient_id"), ("Patients", "patient_id")));
        assert!(!rule.matches(("Billing", "bill_id"), ("Patients", "patient_id")));
    }

    #[test]
    fn test_chain_steps_reverse() {
        let steps = chain_steps(BRIDGE_RULES[0].path, true);
        assert_eq!(
            steps,
            vec![
                JoinStep::new("Billing", "appointment_id", "Appointments", "appointment_id"),
                JoinStep::new("Appointments", "patient_id", "Patients", "patient_id"),
            ]
        );
    }

    #[test]
    fn test_rule_paths_are_connected() {
        let paths = BRIDGE_RULES
            .iter()
            .map(|r| r.path)
            .chain(CROSS_TABLE_RULES.iter().map(|r| r.path))
            .chain(MISSING_COLUMN_RULES.iter().map(|r| r.path));
        for path in paths {
            for pair in path.windows(2) {
                assert_eq!(pair[0].to_table, pair[1].from_table);
            }
        }
    }

    #[test]
    fn test_cross_table_target() {
        assert_eq!(CROSS_TABLE_RULES[0].target_table(), "Customers");
        assert_eq!(CROSS_TABLE_RULES[1].target_table(), "Products");
    }
}
