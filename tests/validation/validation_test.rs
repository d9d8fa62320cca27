use sqlmend::sql::parse;
use sqlmend::validation::{self, Diagnostic, ValidationError};
use sqlmend::Schema;

const STORE: &str = "Customers(customer_id, name, city), Orders(order_id, customer_id, total), Stores(store_id, city)";

fn check(sql: &str) -> Result<(), ValidationError> {
    let schema = Schema::parse(STORE).unwrap();
    validation::validate(&parse(sql).unwrap(), &schema)
}

#[test]
fn test_valid_join_query() {
    assert_eq!(
        check("SELECT Customers.name, SUM(Orders.total) FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id GROUP BY Customers.name"),
        Ok(())
    );
}

#[test]
fn test_table_names_are_case_insensitive() {
    assert_eq!(check("SELECT name FROM customers"), Ok(()));
}

#[test]
fn test_missing_from_table() {
    assert_eq!(check("SELECT name"), Err(ValidationError::MissingFromTable));
}

#[test]
fn test_suggestion_lists_every_owner() {
    let err = check("SELECT city FROM Orders").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Column 'city' does not exist in table 'Orders'."));
    assert!(message.contains("Customers"));
    assert!(message.contains("Stores"));
}

#[test]
fn test_table_star_out_of_scope() {
    assert!(matches!(
        check("SELECT Stores.* FROM Customers"),
        Err(ValidationError::TableNotInScope { .. })
    ));
}

#[test]
fn test_using_column_must_exist_in_both_tables() {
    assert_eq!(
        check("SELECT Customers.name FROM Customers JOIN Stores USING (city)"),
        Ok(())
    );
    assert_eq!(
        check("SELECT Customers.name FROM Customers JOIN Orders USING (city)"),
        Err(ValidationError::UnknownJoinColumn {
            column: "city".into(),
            table: "Orders".into(),
        })
    );
}

#[test]
fn test_bare_join_sides_default_to_their_tables() {
    let err = check("SELECT Customers.name FROM Customers JOIN Orders ON customer_id = order_ref")
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::UnknownJoinColumn {
            column: "order_ref".into(),
            table: "Orders".into(),
        }
    );
}

#[test]
fn test_unknown_join_table_reported_before_columns() {
    assert_eq!(
        check("SELECT nickname FROM Customers JOIN Invoices ON Customers.customer_id = Invoices.customer_id"),
        Err(ValidationError::UnknownTable("Invoices".into()))
    );
}

#[test]
fn test_diagnostic_wraps_query_text() {
    let diag = Diagnostic::new(
        ValidationError::ColumnNotInScope {
            column: "nickname".into(),
            tables: vec!["Customers".into(), "Orders".into()],
        },
        "SELECT nickname FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id;",
    );
    assert_eq!(
        diag.to_string(),
        "Error: Column 'nickname' does not exist in any of the used tables: Customers, Orders → Query: SELECT nickname FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id;"
    );
}

#[test]
fn test_using_in_join_chain_sees_earlier_tables() {
    assert_eq!(
        check("SELECT Orders.total FROM Stores JOIN Customers ON Stores.city = Customers.city JOIN Orders USING (customer_id)"),
        Ok(())
    );
    assert_eq!(
        check("SELECT Customers.name FROM Orders JOIN Customers ON Orders.customer_id = Customers.customer_id JOIN Stores USING (store_id)"),
        Err(ValidationError::UnknownJoinColumn {
            column: "store_id".into(),
            table: "Customers".into(),
        })
    );
}

#[test]
fn test_self_join_aliases_validate() {
    assert_eq!(
        check("SELECT a.name, b.name FROM Customers AS a JOIN Customers AS b ON a.city = b.city WHERE a.customer_id <> b.customer_id"),
        Ok(())
    );
    assert_eq!(
        check("SELECT a.total FROM Customers AS a JOIN Customers AS b ON a.city = b.city"),
        Err(ValidationError::UnknownQualifiedColumn {
            column: "total".into(),
            table: "Customers".into(),
        })
    );
}
