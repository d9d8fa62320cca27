use async_trait::async_trait;
use sqlmend::generator::{FixedGenerator, GenerateParams, GenerationError, GenerationResult, SqlGenerator};
use sqlmend::{Pipeline, PipelineError, Request};
use std::sync::Mutex;

const HOSPITAL: &str = "Patients(patient_id, first_name, last_name, gender), Doctors(doctor_id, name, specialty), Appointments(appointment_id, patient_id, doctor_id, appointment_date), Treatments(treatment_id, appointment_id, diagnosis), Billing(bill_id, appointment_id, amount, payment_status)";
const RETAIL: &str = "Customers(customer_id, first_name, last_name, email, phone, city), Orders(order_id, customer_id, order_date, total_amount), OrderItems(order_item_id, order_id, product_id, quantity), Products(product_id, name, category, price), Payments(payment_id, order_id, amount, payment_status)";

/// Answers with fixed text and remembers what it was asked.
struct RecordingGenerator {
    sql: String,
    seen: Mutex<Vec<GenerateParams>>,
}

impl RecordingGenerator {
    fn new(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<GenerateParams> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlGenerator for RecordingGenerator {
    async fn generate(&self, params: &GenerateParams) -> GenerationResult<String> {
        self.seen.lock().unwrap().push(params.clone());
        Ok(self.sql.clone())
    }
}

fn run(schema: &str, question: &str, raw: &str) -> String {
    let request = Request::new(question).with_schema(schema);
    Pipeline::default().run(&request, raw).unwrap()
}

#[test]
fn test_hospital_generated_aliases_and_bridge() {
    assert_eq!(
        run(
            HOSPITAL,
            "patient names with their bill amounts",
            "SELECT T1.first_name, T2.amount FROM Patients AS T1 JOIN Billing AS T2 ON T1.patient_id = T2.patient_id"
        ),
        "SELECT Patients.first_name, Billing.amount FROM Patients JOIN Appointments ON Patients.patient_id = Appointments.patient_id JOIN Billing ON Appointments.appointment_id = Billing.appointment_id;"
    );
}

#[test]
fn test_hospital_value_casing() {
    assert_eq!(
        run(HOSPITAL, "female patients", r#"SELECT first_name FROM Patients WHERE gender = "female""#),
        "SELECT first_name FROM Patients WHERE gender = 'Female';"
    );
}

#[test]
fn test_retail_cross_table_column() {
    assert_eq!(
        run(RETAIL, "order totals by city", "SELECT city, total_amount FROM Orders"),
        "SELECT Customers.city, Orders.total_amount FROM Orders JOIN Customers ON Orders.customer_id = Customers.customer_id;"
    );
}

#[test]
fn test_all_tables_with_profile_hint() {
    let request = Request::new("show data from all tables, limit 2")
        .with_schema(HOSPITAL)
        .with_db_name("HospitalDB");
    assert_eq!(
        Pipeline::default()
            .run(&request, "SELECT * FROM Billing WHERE amount > 5")
            .unwrap(),
        "SELECT * FROM Patients JOIN Appointments ON Patients.patient_id = Appointments.patient_id JOIN Doctors ON Appointments.doctor_id = Doctors.doctor_id JOIN Treatments ON Appointments.appointment_id = Treatments.appointment_id JOIN Billing ON Appointments.appointment_id = Billing.appointment_id LIMIT 2;"
    );
}

#[test]
fn test_auto_join_by_naming_convention() {
    assert_eq!(
        run(
            "customers(id, name), orders(id, customer_id, total)",
            "customer names and order totals",
            "SELECT name, total FROM customers"
        ),
        "SELECT customers.name, orders.total FROM customers JOIN orders ON customers.id = orders.customer_id;"
    );
}

#[test]
fn test_self_join_keeps_aliases_and_validates() {
    assert_eq!(
        run(
            "Patients(patient_id, first_name, gender)",
            "patients sharing a first name",
            "SELECT a.first_name FROM Patients AS a JOIN Patients AS b ON a.first_name = b.first_name"
        ),
        "SELECT a.first_name FROM Patients AS a JOIN Patients AS b ON a.first_name = b.first_name;"
    );
}

#[test]
fn test_self_join_unknown_alias_column_rejected() {
    let request = Request::new("patients sharing a first name")
        .with_schema("Patients(patient_id, first_name, gender)");
    let err = Pipeline::default()
        .run(
            &request,
            "SELECT a.nickname FROM Patients AS a JOIN Patients AS b ON a.first_name = b.first_name",
        )
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("Column 'nickname' does not exist in table 'Patients'"));
}

#[test]
fn test_code_fence_and_label_stripped() {
    assert_eq!(
        run("users(id, name)", "list users", "```sql\nSQL: SELECT name FROM users\n```"),
        "SELECT name FROM users;"
    );
}

#[test]
fn test_invalid_query_reports_repaired_text() {
    let request = Request::new("customer totals")
        .with_schema("Customers(id, name), Invoices(invoice_id, total)");
    let err = Pipeline::default()
        .run(&request, "SELECT total FROM Customers")
        .unwrap_err();
    assert!(err.is_client_error());
    assert_eq!(
        err.to_string(),
        "Error: Column 'total' does not exist in table 'Customers'. Column 'total' exists in table 'Invoices'. Consider using a JOIN to access it. → Query: SELECT total FROM Customers;"
    );
}

#[tokio::test]
async fn test_translate_sends_prompt_and_schema() {
    let generator = RecordingGenerator::new("SELECT name FROM users");
    let request = Request::new("  list users  ").with_schema("users(id, name)");

    let sql = Pipeline::default().translate(&request, &generator).await.unwrap();
    assert_eq!(sql, "SELECT name FROM users;");

    let calls = generator.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].question, "list users");
    assert_eq!(calls[0].schema, "users(id, name)");
    assert!(calls[0]
        .prompt
        .ends_with("Question: list users\nSchema: users(id, name)\nSQL Query:"));
}

#[tokio::test]
async fn test_translate_uses_configured_default_schema() {
    let pipeline = Pipeline::new("staff(staff_id, name)");
    let generator = RecordingGenerator::new("SELECT name FROM staff");

    let sql = pipeline.translate(&Request::new("staff names"), &generator).await.unwrap();
    assert_eq!(sql, "SELECT name FROM staff;");
    assert_eq!(generator.calls()[0].schema, "staff(staff_id, name)");
}

#[tokio::test]
async fn test_translate_generation_error() {
    let request = Request::new("list users").with_schema("users(id)");
    let err = Pipeline::default()
        .translate(&request, &FixedGenerator::new("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Generation(GenerationError::EmptyOutput)));
    assert!(err.to_string().starts_with("Failed to generate SQL query: "));
}
