//! Ambiguity resolver - qualifies bare column names once a query joins.
//!
//! A column found in several in-scope tables is qualified with the FROM
//! table when it has the column, otherwise with the first table in scope
//! order (FROM, then JOINs as written) that does. A column found in exactly
//! one in-scope table is qualified too. Single-table queries are left
//! alone: nothing in them can be ambiguous.

use super::run_pass;
use crate::schema::Schema;
use crate::sql::{ColumnRef, Condition, Expr, Query};

/// Qualify bare columns in SELECT, GROUP BY, ORDER BY and JOIN predicates.
pub fn resolve_ambiguity(query: &mut Query, schema: &Schema) {
    if !query.has_joins() {
        return;
    }
    run_pass("qualify_join_predicates", query, |q| {
        qualify_join_predicates(q, schema)
    });
    run_pass("qualify_columns", query, |q| qualify_columns(q, schema));
}

/// The in-scope table to qualify `column` with.
fn owning_table(scope: &[String], from: Option<&str>, column: &str, schema: &Schema) -> Option<String> {
    if let Some(from) = from {
        if schema.has_column(from, column) {
            return Some(from.to_string());
        }
    }
    scope
        .iter()
        .find(|t| schema.has_column(t, column))
        .cloned()
}

fn qualify(col: &mut ColumnRef, scope: &[String], from: Option<&str>, schema: &Schema) {
    if col.table.is_some() {
        return;
    }
    if let Some(table) = owning_table(scope, from, &col.column, schema) {
        col.table = Some(table);
    }
}

/// Bare columns in SELECT, GROUP BY and ORDER BY. Aggregates, stars and
/// literals pass through.
pub fn qualify_columns(query: &mut Query, schema: &Schema) {
    let scope: Vec<String> = query.tables_in_scope().into_iter().map(str::to_string).collect();
    let from = query.from_table().map(str::to_string);
    let from = from.as_deref();

    let exprs = query
        .select
        .iter_mut()
        .map(|item| &mut item.expr)
        .chain(query.group_by.iter_mut())
        .chain(query.order_by.iter_mut().map(|item| &mut item.expr));
    for expr in exprs {
        if let Expr::Column(col) = expr {
            qualify(col, &scope, from, schema);
        }
    }
}

/// Bare sides of `JOIN t ON a = b`: identical names become
/// `FROM.a = t.a`; otherwise the left side prefers the FROM table and the
/// right side prefers the joined table.
pub fn qualify_join_predicates(query: &mut Query, schema: &Schema) {
    let scope: Vec<String> = query.tables_in_scope().into_iter().map(str::to_string).collect();
    let from = query.from_table().map(str::to_string);

    for join in &mut query.joins {
        let joined = join.table.table.clone();
        let Some(Condition::Equi { left, right }) = join.on.as_mut() else {
            continue;
        };

        if left.table.is_none()
            && right.table.is_none()
            && left.column.eq_ignore_ascii_case(&right.column)
        {
            if let Some(from) = &from {
                left.table = Some(from.clone());
                right.table = Some(joined);
            }
            continue;
        }

        qualify(left, &scope, from.as_deref(), schema);
        qualify(right, &scope, Some(joined.as_str()), schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::parse;

    fn resolved(schema: &str, sql: &str) -> String {
        let schema = Schema::parse(schema).unwrap();
        let mut query = parse(sql).unwrap();
        resolve_ambiguity(&mut query, &schema);
        query.to_sql()
    }

    const SCHEMA: &str = "Customers(customer_id, city), Orders(order_id, customer_id, total)";

    #[test]
    fn test_group_by_prefers_from_table() {
        assert_eq!(
            resolved(
                SCHEMA,
                "SELECT customer_id, COUNT(order_id) FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id GROUP BY customer_id"
            ),
            "SELECT Customers.customer_id, COUNT(order_id) FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id GROUP BY Customers.customer_id;"
        );
    }

    #[test]
    fn test_single_owner_still_qualified() {
        assert_eq!(
            resolved(
                SCHEMA,
                "SELECT city, total FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id ORDER BY total DESC"
            ),
            "SELECT Customers.city, Orders.total FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id ORDER BY Orders.total DESC;"
        );
    }

    #[test]
    fn test_from_table_lacking_column_uses_first_owner() {
        let schema = "Orders(order_id), Customers(customer_id, city), Stores(store_id, city)";
        assert_eq!(
            resolved(
                schema,
                "SELECT city FROM Orders JOIN Customers ON a = b JOIN Stores ON c = d"
            ),
            "SELECT Customers.city FROM Orders JOIN Customers ON a = b JOIN Stores ON c = d;"
        );
    }

    #[test]
    fn test_identical_join_columns() {
        assert_eq!(
            resolved(SCHEMA, "SELECT * FROM Customers JOIN Orders ON customer_id = customer_id"),
            "SELECT * FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id;"
        );
    }

    #[test]
    fn test_different_join_columns() {
        let schema = "users(id, name), orders(order_id, user_id)";
        assert_eq!(
            resolved(schema, "SELECT name FROM users JOIN orders ON id = user_id"),
            "SELECT users.name FROM users JOIN orders ON users.id = orders.user_id;"
        );
    }

    #[test]
    fn test_passthrough_items() {
        let sql = "SELECT *, COUNT(customer_id), 5, Orders.total FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id;";
        assert_eq!(resolved(SCHEMA, sql), sql);
    }

    #[test]
    fn test_no_joins_untouched() {
        let sql = "SELECT city FROM Customers GROUP BY city;";
        assert_eq!(resolved(SCHEMA, sql), sql);
    }

    #[test]
    fn test_unknown_column_left_bare() {
        let sql = "SELECT nickname FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id;";
        assert_eq!(resolved(SCHEMA, sql), sql);
    }
}
