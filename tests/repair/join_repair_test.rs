use sqlmend::profile::{resolve_profile, Profile};
use sqlmend::repair::joins::{repair_cross_table_columns, resolve_joins};
use sqlmend::repair::RepairContext;
use sqlmend::sql::parse;
use sqlmend::Schema;

const HOSPITAL: &str = "Patients(patient_id, first_name, last_name, gender), Doctors(doctor_id, name, specialty), Appointments(appointment_id, patient_id, doctor_id, appointment_date), Treatments(treatment_id, appointment_id, diagnosis), Billing(bill_id, appointment_id, amount, payment_status)";
const RETAIL: &str = "Customers(customer_id, first_name, last_name, email, phone, city), Orders(order_id, customer_id, order_date, total_amount), OrderItems(order_item_id, order_id, product_id, quantity), Products(product_id, name, category, price), Payments(payment_id, order_id, amount, payment_status)";

fn detected(schema: &Schema) -> Option<&'static Profile> {
    resolve_profile(None, schema)
}

fn resolved(schema_text: &str, question: &str, sql: &str) -> String {
    let schema = Schema::parse(schema_text).unwrap();
    let ctx = RepairContext::new(&schema, question, detected(&schema));
    let mut query = parse(sql).unwrap();
    resolve_joins(&mut query, &ctx);
    query.to_sql()
}

#[test]
fn test_profiles_detected_from_schema() {
    let hospital = Schema::parse(HOSPITAL).unwrap();
    let retail = Schema::parse(RETAIL).unwrap();
    assert_eq!(detected(&hospital).map(|p| p.name), Some("HospitalDB"));
    assert_eq!(detected(&retail).map(|p| p.name), Some("RetailDB"));
}

#[test]
fn test_unknown_hint_disables_profile() {
    let schema = Schema::parse(RETAIL).unwrap();
    assert_eq!(resolve_profile(Some("Warehouse"), &schema), None);
    assert_eq!(
        resolve_profile(Some("retaildb"), &schema).map(|p| p.name),
        Some("RetailDB")
    );

    let ctx = RepairContext::new(&schema, "orders with payments", None);
    let mut query = parse("SELECT * FROM Orders, Payments").unwrap();
    resolve_joins(&mut query, &ctx);
    assert_eq!(query.joins.len(), 1);
    assert!(query.joins[0].on.is_none());
}

#[test]
fn test_cross_table_product_columns() {
    let schema = Schema::parse(RETAIL).unwrap();
    let mut query = parse("SELECT name, order_date FROM Orders").unwrap();
    repair_cross_table_columns(&mut query, &schema);
    assert_eq!(
        query.to_sql(),
        "SELECT Products.name, order_date FROM Orders JOIN OrderItems ON Orders.order_id = OrderItems.order_id JOIN Products ON OrderItems.product_id = Products.product_id;"
    );
}

#[test]
fn test_cross_table_needs_schema_tables() {
    let schema = Schema::parse("Orders(order_id, customer_id), Customers(customer_id)").unwrap();
    let sql = "SELECT city FROM Orders;";
    let mut query = parse(sql).unwrap();
    repair_cross_table_columns(&mut query, &schema);
    assert_eq!(query.to_sql(), sql);
}

#[test]
fn test_referenced_table_joined_along_profile_path() {
    assert_eq!(
        resolved(RETAIL, "payment amounts by city", "SELECT Payments.amount, Customers.city FROM Customers"),
        "SELECT Payments.amount, Customers.city FROM Customers JOIN Orders ON Customers.customer_id = Orders.customer_id JOIN Payments ON Orders.order_id = Payments.order_id;"
    );
}

#[test]
fn test_missing_column_follows_profile_path() {
    assert_eq!(
        resolved(HOSPITAL, "diagnoses for each patient", "SELECT first_name, diagnosis FROM Patients"),
        "SELECT first_name, Treatments.diagnosis FROM Patients JOIN Appointments ON Patients.patient_id = Appointments.patient_id JOIN Treatments ON Appointments.appointment_id = Treatments.appointment_id;"
    );
}

#[test]
fn test_missing_column_with_several_owners_left_alone() {
    let sql = "SELECT appointment_id FROM Patients;";
    assert_eq!(resolved(HOSPITAL, "appointments", sql), sql);
}

#[test]
fn test_valid_join_untouched() {
    let sql = "SELECT Doctors.name FROM Doctors JOIN Appointments ON Doctors.doctor_id = Appointments.doctor_id;";
    assert_eq!(resolved(HOSPITAL, "doctors with appointments", sql), sql);
}

#[test]
fn test_bridge_repair_is_idempotent() {
    let schema = Schema::parse(HOSPITAL).unwrap();
    let ctx = RepairContext::new(&schema, "bills by patient", detected(&schema));
    let mut query = parse(
        "SELECT Patients.last_name, Billing.amount FROM Billing JOIN Patients ON Billing.patient_id = Patients.patient_id",
    )
    .unwrap();
    resolve_joins(&mut query, &ctx);
    let once = query.to_sql();
    resolve_joins(&mut query, &ctx);
    assert_eq!(query.to_sql(), once);
    assert_eq!(
        once,
        "SELECT Patients.last_name, Billing.amount FROM Billing JOIN Appointments ON Billing.appointment_id = Appointments.appointment_id JOIN Patients ON Appointments.patient_id = Patients.patient_id;"
    );
}
