use async_trait::async_trait;
use sqlmend::generator::{GenerateParams, GenerationResult, SqlGenerator};
use sqlmend::profile::resolve_profile;
use sqlmend::repair::{self, RepairContext};
use sqlmend::sql::parse;
use sqlmend::validation::validate;
use sqlmend::{Pipeline, Request, Schema, ValidationError};

/// Fails the test if generation is ever reached.
struct UnreachableGenerator;

#[async_trait]
impl SqlGenerator for UnreachableGenerator {
    async fn generate(&self, params: &GenerateParams) -> GenerationResult<String> {
        panic!("generator called for {:?}", params.question);
    }
}

fn repaired_twice(schema: &str, question: &str, sql: &str) -> (String, String) {
    let schema = Schema::parse(schema).unwrap();
    let profile = resolve_profile(None, &schema);
    let ctx = RepairContext::new(&schema, question, profile);
    let mut query = parse(sql).unwrap();

    let pass = |query: &mut sqlmend::Query| {
        repair::normalize(query, &schema);
        repair::resolve_joins(query, &ctx);
        repair::resolve_ambiguity(query, &schema);
        query.to_sql()
    };
    let once = pass(&mut query);
    let twice = pass(&mut query);
    (once, twice)
}

#[test]
fn test_repair_is_idempotent() {
    let cases = [
        (
            "Patients(patient_id, first_name, gender), Appointments(appointment_id, patient_id, doctor_id), Billing(bill_id, appointment_id, amount)",
            "bills per patient",
            "SELECT T1.first_name, T2.amount FROM patients AS T1 JOIN Billing AS T2 ON T1.patient_id = T2.patient_id WHERE T1.gender = \"male\"",
        ),
        (
            "Customers(customer_id, city), Orders(order_id, customer_id, total)",
            "orders per customer",
            "SELECT customer_id, COUNT(*) FROM Customers JOIN Orders ON customer_id = customer_id GROUP BY customer_id",
        ),
        (
            "users(id, name), orders(id, user_id, product_id), products(id, title)",
            "join all tables",
            "SELECT * FROM orders",
        ),
        (
            "Customers(customer_id, city), Orders(order_id, customer_id, total)",
            "orders and customers",
            "SELECT * FROM JOIN Orders ON Customers.customer_id = Orders.customer_id",
        ),
    ];

    for (schema, question, sql) in cases {
        let (once, twice) = repaired_twice(schema, question, sql);
        assert_eq!(once, twice, "not idempotent for {}", sql);
    }
}

#[test]
fn test_valid_single_table_query_passes() {
    let schema = Schema::parse("Products(product_id, name, price, stock)").unwrap();
    let query = parse("SELECT name, price FROM Products WHERE stock > 0 ORDER BY price DESC").unwrap();
    assert_eq!(validate(&query, &schema), Ok(()));
}

#[test]
fn test_unknown_table_reported() {
    let request = Request::new("invoice totals").with_schema("Customers(id, name)");
    let err = Pipeline::default().run(&request, "SELECT * FROM Invoices").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error: Table 'Invoices' does not exist. → Query: SELECT * FROM Invoices;"
    );
}

#[test]
fn test_group_by_column_qualified_with_from_table() {
    let request = Request::new("number of orders per customer")
        .with_schema("Customers(customer_id, city), Orders(customer_id, total)");
    let sql = Pipeline::default()
        .run(
            &request,
            "SELECT customer_id, COUNT(*) FROM Customers JOIN Orders ON customer_id = customer_id GROUP BY customer_id",
        )
        .unwrap();
    assert_eq!(
        sql,
        "SELECT Customers.customer_id, COUNT(*) FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id GROUP BY Customers.customer_id;"
    );
}

#[tokio::test]
async fn test_negative_template_skips_generation() {
    let request = Request::new("list users who have not placed any orders")
        .with_schema("users(id, name), orders(id, user_id)");
    let sql = Pipeline::default()
        .translate(&request, &UnreachableGenerator)
        .await
        .unwrap();
    assert_eq!(
        sql,
        "SELECT users.name FROM users LEFT JOIN orders ON users.id = orders.user_id WHERE orders.id IS NULL;"
    );
}

#[test]
fn test_negative_template_ignores_generated_text() {
    let request = Request::new("Products that were not ordered").with_schema("products(id, name)");
    assert_eq!(
        Pipeline::default().run(&request, "SELECT garbage").unwrap(),
        "SELECT products.name FROM products LEFT JOIN orders ON products.id = orders.product_id WHERE orders.id IS NULL;"
    );
}

#[test]
fn test_requested_count_sets_limit() {
    let request = Request::new("show the top five orders").with_schema("Orders(order_id, total)");
    assert_eq!(
        Pipeline::default()
            .run(&request, "SELECT * FROM Orders ORDER BY total DESC LIMIT 10")
            .unwrap(),
        "SELECT * FROM Orders ORDER BY total DESC LIMIT 5;"
    );
}

#[test]
fn test_explicit_limit_wins() {
    let request = Request::new("top 3 orders by total, limit 12").with_schema("Orders(order_id, total)");
    assert_eq!(
        Pipeline::default()
            .run(&request, "SELECT order_id FROM Orders ORDER BY total DESC LIMIT 3")
            .unwrap(),
        "SELECT order_id FROM Orders ORDER BY total DESC LIMIT 12;"
    );
}

#[test]
fn test_unrequested_limit_removed() {
    let request = Request::new("every order total").with_schema("Orders(order_id, total)");
    assert_eq!(
        Pipeline::default()
            .run(&request, "SELECT total FROM Orders LIMIT 10 OFFSET 20")
            .unwrap(),
        "SELECT total FROM Orders;"
    );
}

#[tokio::test]
async fn test_table_listing_skips_generation() {
    let request = Request::new("show tables").with_schema("Customers(id,name),Orders(id)");
    let sql = Pipeline::default()
        .translate(&request, &UnreachableGenerator)
        .await
        .unwrap();
    assert_eq!(sql, "SELECT 'Customers', 'Orders' AS table_names;");
}

#[tokio::test]
async fn test_column_listing_skips_generation() {
    let request = Request::new("show columns of orders").with_schema("Customers(id,name),Orders(id, total)");
    let sql = Pipeline::default()
        .translate(&request, &UnreachableGenerator)
        .await
        .unwrap();
    assert_eq!(sql, "SELECT 'id', 'total' AS columns_in_Orders;");
}

#[test]
fn test_column_listing_for_unknown_table_falls_through() {
    let request = Request::new("show columns of invoices").with_schema("Customers(id,name)");
    let err = Pipeline::default().run(&request, "SELECT * FROM invoices").unwrap_err();
    assert!(matches!(
        err,
        sqlmend::PipelineError::Invalid(sqlmend::Diagnostic {
            error: ValidationError::UnknownTable(_),
            ..
        })
    ));
}
