//! Join resolver - repairs and completes the JOIN structure.
//!
//! Passes run in this order:
//!
//! 1. invalid join predicates rerouted through bridge tables
//! 2. columns selected from the wrong table qualified and joined in
//! 3. JOINs added for SELECT columns the FROM table lacks
//! 4. relationship-profile completion ("all tables" rebuild, missing
//!    joins and missing ON predicates)
//! 5. heuristic full join over `x_id` naming conventions
//!
//! Nothing here reports errors. A chain is only applied when every hop is
//! valid against the schema; anything else is left for the validator.

use std::sync::LazyLock;

use regex::Regex;

use super::rules::{chain_steps, BRIDGE_RULES, CROSS_TABLE_RULES, MISSING_COLUMN_RULES};
use super::{run_pass, RepairContext};
use crate::profile::{JoinGraph, JoinStep, Profile};
use crate::schema::inflection::referenced_table_candidates;
use crate::schema::Schema;
use crate::sql::{ColumnRef, Condition, Expr, Join, JoinType, Query, SelectExpr, TableRef};

/// Question asks for every table in a known profile.
static ALL_TABLES_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\ball (the )?tables\b|\bevery table\b|\bjoin all\b|\bcombine all\b|\binclude all\b")
        .unwrap()
});

/// Question explicitly asks to join everything in the schema.
static FULL_JOIN_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bjoin all tables\b|\binclude all tables\b|\bcombine all\b").unwrap()
});

/// Run every join pass in order.
pub fn resolve_joins(query: &mut Query, ctx: &RepairContext<'_>) {
    run_pass("repair_invalid_joins", query, |q| repair_invalid_joins(q, ctx));
    run_pass("repair_cross_table_columns", query, |q| {
        repair_cross_table_columns(q, ctx.schema)
    });
    run_pass("join_missing_columns", query, |q| join_missing_columns(q, ctx));
    run_pass("complete_from_profile", query, |q| complete_from_profile(q, ctx));
    run_pass("join_all_tables", query, |q| join_all_tables(q, ctx));
}

// =============================================================================
// Helpers
// =============================================================================

/// Resolve a whole chain; `None` unless every step is valid.
fn resolve_chain(steps: &[JoinStep], schema: &Schema) -> Option<Vec<JoinStep>> {
    steps.iter().map(|s| s.resolve(schema)).collect()
}

/// Join graph inferred from `x_id` columns: `T.x_id` joins the table named
/// by pluralizing `x`, on the same column or that table's `id`.
fn naming_convention_graph(schema: &Schema) -> JoinGraph {
    let mut graph = JoinGraph::new();
    for table in schema.tables() {
        for column in &table.columns {
            let target = referenced_table_candidates(column)
                .into_iter()
                .filter_map(|candidate| schema.table(&candidate))
                .find(|t| !t.name.eq_ignore_ascii_case(&table.name));
            let Some(target) = target else {
                continue;
            };
            let target_column = target.column(column).or_else(|| target.column("id"));
            if let Some(target_column) = target_column {
                graph.add_edge(&table.name, column, &target.name, target_column);
            }
        }
    }
    graph
}

/// Append the steps of a chain whose target table is not in scope yet.
fn append_chain(query: &mut Query, steps: &[JoinStep]) {
    for step in steps {
        if !query.is_in_scope(&step.to_table) {
            query.joins.push(step.to_join());
        }
    }
}

/// Unqualified column references in the SELECT list, looking through
/// aggregates.
fn unqualified_select_columns(query: &mut Query) -> impl Iterator<Item = &mut ColumnRef> + '_ {
    query
        .select
        .iter_mut()
        .filter_map(|item| match &mut item.expr {
            Expr::Column(col) => Some(col),
            Expr::Aggregate { arg, .. } => match arg.as_mut() {
                Expr::Column(col) => Some(col),
                _ => None,
            },
            _ => None,
        })
        .filter(|col| col.table.is_none())
}

/// Qualify every unqualified SELECT reference to `column` with `table`.
fn qualify_select_column(query: &mut Query, column: &str, table: &str) {
    for col in unqualified_select_columns(query) {
        if col.column.eq_ignore_ascii_case(column) {
            col.table = Some(table.to_string());
        }
    }
}

/// Drop repeated JOINs of the same table binding, keeping the first.
fn dedupe_joins(query: &mut Query) {
    let mut seen: Vec<(String, Option<String>)> = Vec::new();
    query.joins.retain(|join| {
        let key = (
            join.table.table.to_lowercase(),
            join.table.alias.as_ref().map(|a| a.to_lowercase()),
        );
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
}

// =============================================================================
// Invalid join repair
// =============================================================================

/// Replace `JOIN X ON A.c = B.d` predicates that name columns the schema
/// does not have with a valid chain through a bridge table.
pub fn repair_invalid_joins(query: &mut Query, ctx: &RepairContext<'_>) {
    let schema = ctx.schema;
    let graph = ctx.profile.map(|p| p.graph(schema));

    let mut k = 0;
    while k < query.joins.len() {
        let Some(chain) = bridge_for_join(query, k, schema, graph.as_ref()) else {
            k += 1;
            continue;
        };

        let join_type = query.joins[k].join_type;
        let scope_without: Vec<String> = query
            .tables_in_scope()
            .into_iter()
            .filter(|t| !t.eq_ignore_ascii_case(&query.joins[k].table.table))
            .map(str::to_string)
            .collect();
        let target = query.joins[k].table.table.clone();

        let replacement: Vec<Join> = chain
            .iter()
            .filter(|step| {
                step.to_table.eq_ignore_ascii_case(&target)
                    || !scope_without.iter().any(|t| t.eq_ignore_ascii_case(&step.to_table))
            })
            .map(|step| Join {
                join_type,
                ..step.to_join()
            })
            .collect();

        let len = replacement.len();
        query.joins.splice(k..k + 1, replacement);
        k += len.max(1);
    }
}

/// The valid chain replacing join `k`, if its predicate is invalid and a
/// known bridge or profile path exists.
fn bridge_for_join(
    query: &Query,
    k: usize,
    schema: &Schema,
    graph: Option<&JoinGraph>,
) -> Option<Vec<JoinStep>> {
    let join = &query.joins[k];
    let Some(Condition::Equi { left, right }) = &join.on else {
        return None;
    };
    let (left_table, right_table) = (left.table.as_deref()?, right.table.as_deref()?);
    if schema.has_column(left_table, &left.column) && schema.has_column(right_table, &right.column)
    {
        return None;
    }

    let target = join.table.table.as_str();
    let source = if left_table.eq_ignore_ascii_case(target) {
        right_table
    } else if right_table.eq_ignore_ascii_case(target) {
        left_table
    } else {
        return None;
    };

    let from_rule = BRIDGE_RULES
        .iter()
        .find(|rule| {
            rule.matches(
                (left_table, left.column.as_str()),
                (right_table, right.column.as_str()),
            )
        })
        .and_then(|rule| {
            if rule.left.0.eq_ignore_ascii_case(source) {
                Some(chain_steps(rule.path, false))
            } else if rule.right.0.eq_ignore_ascii_case(source) {
                Some(chain_steps(rule.path, true))
            } else {
                None
            }
        });

    let chain = from_rule.or_else(|| {
        graph?
            .find_path(source, target)
            .filter(|path| !path.is_empty())
    })?;
    resolve_chain(&chain, schema)
}

// =============================================================================
// Cross-table columns
// =============================================================================

/// Columns selected from a table that lacks them but whose owner is a
/// known hop away: qualify them with the owner and join it in.
pub fn repair_cross_table_columns(query: &mut Query, schema: &Schema) {
    let Some(from) = query.from_table().map(str::to_string) else {
        return;
    };

    for rule in CROSS_TABLE_RULES {
        if !rule.from_table.eq_ignore_ascii_case(&from) {
            continue;
        }
        let Some(steps) = resolve_chain(&chain_steps(rule.path, false), schema) else {
            continue;
        };
        let Some(target) = steps.last().map(|s| s.to_table.clone()) else {
            continue;
        };

        let mut moved = false;
        for col in unqualified_select_columns(query) {
            let wanted = rule
                .columns
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&col.column));
            if wanted
                && !schema.has_column(&from, &col.column)
                && schema.has_column(&target, &col.column)
            {
                col.table = Some(target.clone());
                moved = true;
            }
        }
        if moved {
            append_chain(query, &steps);
        }
    }

    dedupe_joins(query);
}

// =============================================================================
// Missing-column auto-join
// =============================================================================

/// With no JOIN yet, join in the owner of SELECT columns the FROM table
/// lacks: through a known relation chain, or along the shortest known path
/// when exactly one other table has the column.
pub fn join_missing_columns(query: &mut Query, ctx: &RepairContext<'_>) {
    let schema = ctx.schema;
    if query.has_joins() {
        return;
    }
    let Some(from) = query
        .from_table()
        .and_then(|f| schema.canonical_table_name(f))
        .map(str::to_string)
    else {
        return;
    };

    let mut missing: Vec<String> = Vec::new();
    for col in unqualified_select_columns(query) {
        let absent = !schema.has_column(&from, &col.column) && schema.is_column_anywhere(&col.column);
        if absent && !missing.iter().any(|m| m.eq_ignore_ascii_case(&col.column)) {
            missing.push(col.column.clone());
        }
    }
    if missing.is_empty() {
        return;
    }

    let mut graphs = ctx.profile.map(|p| p.graph(schema)).into_iter().collect::<Vec<_>>();
    graphs.push(naming_convention_graph(schema));

    for column in missing {
        let Some((steps, owner)) = missing_column_chain(&from, &column, schema, &graphs) else {
            continue;
        };
        append_chain(query, &steps);
        qualify_select_column(query, &column, &owner);
    }
}

/// Chain and owning table for one missing column.
fn missing_column_chain(
    from: &str,
    column: &str,
    schema: &Schema,
    graphs: &[JoinGraph],
) -> Option<(Vec<JoinStep>, String)> {
    let rule = MISSING_COLUMN_RULES.iter().find(|r| {
        r.from_table.eq_ignore_ascii_case(from) && r.column.eq_ignore_ascii_case(column)
    });
    if let Some(rule) = rule {
        if let Some(steps) = resolve_chain(&chain_steps(rule.path, false), schema) {
            let owner = steps
                .iter()
                .rev()
                .map(|s| s.to_table.as_str())
                .find(|t| schema.has_column(t, column));
            if let Some(owner) = owner {
                let owner = owner.to_string();
                return Some((steps, owner));
            }
        }
    }

    let others: Vec<&str> = schema
        .tables_with_column(column)
        .into_iter()
        .filter(|t| !t.eq_ignore_ascii_case(from))
        .collect();
    let [owner] = others.as_slice() else {
        return None;
    };
    let steps = graphs
        .iter()
        .filter_map(|g| g.find_path(from, owner))
        .find(|path| !path.is_empty())?;
    Some((steps, owner.to_string()))
}

// =============================================================================
// Relationship-profile completion
// =============================================================================

/// Use the profile's declared predicates to rebuild "all tables" queries,
/// join tables that are referenced but not in scope, and fill in JOINs
/// that have no ON predicate.
pub fn complete_from_profile(query: &mut Query, ctx: &RepairContext<'_>) {
    let Some(profile) = ctx.profile else {
        return;
    };
    let schema = ctx.schema;
    let graph = profile.graph(schema);
    if graph.edge_count() == 0 {
        return;
    }

    if !query.has_joins() && ALL_TABLES_INTENT.is_match(ctx.question) {
        rebuild_over_profile(query, profile, &graph, schema);
        return;
    }

    join_referenced_tables(query, &graph, schema);
    fill_missing_predicates(query, &graph);
}

/// `SELECT * FROM <primary>` joined to every other profile table.
fn rebuild_over_profile(query: &mut Query, profile: &Profile, graph: &JoinGraph, schema: &Schema) {
    let Some(root) = schema
        .canonical_table_name(profile.primary_table)
        .or_else(|| query.from_table().and_then(|f| graph.table_name(f)))
        .map(str::to_string)
    else {
        return;
    };

    let limit = query.limit;
    *query = Query {
        from: Some(TableRef::new(&root)),
        joins: graph
            .spanning_joins(&root, &[])
            .iter()
            .map(JoinStep::to_join)
            .collect(),
        limit,
        ..Query::default()
    };
}

/// Tables named as qualifiers but missing from FROM/JOIN, joined along the
/// shortest profile path from any in-scope table.
fn join_referenced_tables(query: &mut Query, graph: &JoinGraph, schema: &Schema) {
    for qualifier in query.referenced_qualifiers() {
        let Some(table) = schema.canonical_table_name(&qualifier) else {
            continue;
        };
        if query.is_in_scope(table) || !graph.contains(table) {
            continue;
        }
        let path = query
            .tables_in_scope()
            .into_iter()
            .filter_map(|source| graph.find_path(source, table))
            .filter(|path| !path.is_empty())
            .min_by_key(Vec::len);
        if let Some(path) = path {
            append_chain(query, &path);
        }
    }
}

/// JOINs without ON (including `FROM a, b`) get the declared predicate to
/// any earlier table.
fn fill_missing_predicates(query: &mut Query, graph: &JoinGraph) {
    for k in 0..query.joins.len() {
        if query.joins[k].on.is_some() {
            continue;
        }
        let joined = query.joins[k].table.table.clone();
        let earlier: Vec<&str> = query
            .from
            .iter()
            .map(|t| t.table.as_str())
            .chain(query.joins[..k].iter().map(|j| j.table.table.as_str()))
            .collect();
        let step = earlier
            .iter()
            .filter_map(|source| graph.find_path(source, &joined))
            .find(|path| path.len() == 1)
            .and_then(|mut path| path.pop());
        if let Some(step) = step {
            let join = &mut query.joins[k];
            join.on = Some(Condition::equi(
                ColumnRef::qualified(&step.from_table, &step.from_column),
                ColumnRef::qualified(&join.table.table, &step.to_column),
            ));
            if join.join_type == JoinType::Cross {
                join.join_type = JoinType::Inner;
            }
        }
    }
}

// =============================================================================
// Heuristic full join
// =============================================================================

/// "Join all tables": join every table reachable by the `x_id` naming
/// convention, and expand a `*` select list into every qualified column.
pub fn join_all_tables(query: &mut Query, ctx: &RepairContext<'_>) {
    if !FULL_JOIN_INTENT.is_match(ctx.question) {
        return;
    }
    let schema = ctx.schema;
    let graph = naming_convention_graph(schema);

    let Some(root) = query
        .from_table()
        .and_then(|f| schema.canonical_table_name(f))
        .or_else(|| schema.first_table())
        .map(str::to_string)
    else {
        return;
    };
    if query.from.is_none() {
        query.from = Some(TableRef::new(&root));
    }

    let steps = {
        let in_scope = query.tables_in_scope();
        graph.spanning_joins(&root, &in_scope)
    };
    if steps.is_empty() {
        return;
    }
    query.joins.extend(steps.iter().map(JoinStep::to_join));

    if query.selects_everything() {
        let scope: Vec<String> = query.tables_in_scope().into_iter().map(str::to_string).collect();
        query.select = scope
            .iter()
            .filter_map(|t| schema.table(t))
            .flat_map(|t| {
                t.columns
                    .iter()
                    .map(move |c| SelectExpr::new(Expr::qualified(&t.name, c)))
            })
            .collect();
    }
}
