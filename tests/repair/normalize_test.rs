use sqlmend::repair::normalize::{
    fill_from_before_join, fill_missing_from, normalize, normalize_quotes, rewrite_temporal_likes,
    strip_aliases,
};
use sqlmend::sql::parse;
use sqlmend::Schema;

const CLINIC: &str = "Patients(patient_id, first_name, gender), Appointments(appointment_id, patient_id, appointment_time), Billing(bill_id, appointment_id, payment_status)";

fn schema() -> Schema {
    Schema::parse(CLINIC).unwrap()
}

fn normalized(sql: &str) -> String {
    let mut query = parse(sql).unwrap();
    normalize(&mut query, &schema());
    query.to_sql()
}

#[test]
fn test_named_aliases_are_replaced() {
    let mut query = parse(
        "SELECT p.first_name, a.appointment_time FROM Patients p JOIN Appointments a ON p.patient_id = a.patient_id ORDER BY a.appointment_time",
    )
    .unwrap();
    strip_aliases(&mut query);
    assert_eq!(
        query.to_sql(),
        "SELECT Patients.first_name, Appointments.appointment_time FROM Patients JOIN Appointments ON Patients.patient_id = Appointments.patient_id ORDER BY Appointments.appointment_time;"
    );
}

#[test]
fn test_aliases_in_where_are_replaced() {
    let mut query = parse("SELECT T1.first_name FROM Patients AS T1 WHERE T1.gender = 'Male'").unwrap();
    strip_aliases(&mut query);
    assert_eq!(
        query.to_sql(),
        "SELECT Patients.first_name FROM Patients WHERE Patients.gender = 'Male';"
    );
}

#[test]
fn test_not_like_is_not_rewritten() {
    let mut query =
        parse("SELECT * FROM Appointments WHERE appointment_time NOT LIKE '09:30'").unwrap();
    rewrite_temporal_likes(&mut query);
    assert_eq!(
        query.to_sql(),
        "SELECT * FROM Appointments WHERE appointment_time NOT LIKE '09:30';"
    );
}

#[test]
fn test_missing_from_only_without_joins() {
    let mut query = parse("SELECT first_name FROM WHERE gender = 'Male'").unwrap();
    fill_missing_from(&mut query, &schema());
    assert_eq!(query.from_table(), Some("Patients"));

    let mut query = parse("SELECT * FROM Billing").unwrap();
    fill_missing_from(&mut query, &schema());
    assert_eq!(query.from_table(), Some("Billing"));
}

#[test]
fn test_join_without_from_skips_joined_tables() {
    let mut query =
        parse("SELECT * FROM JOIN Patients ON Patients.patient_id = Patients.patient_id").unwrap();
    fill_from_before_join(&mut query, &schema());
    assert_eq!(query.from_table(), Some("Appointments"));
}

#[test]
fn test_double_quotes_outside_values_untouched() {
    let mut query = parse(r#"SELECT first_name FROM Patients WHERE "gender" = "Female""#).unwrap();
    normalize_quotes(&mut query);
    assert_eq!(
        query.to_sql(),
        r#"SELECT first_name FROM Patients WHERE "gender" = 'Female';"#
    );
}

#[test]
fn test_between_bounds_are_requoted() {
    assert_eq!(
        normalized(r#"SELECT * FROM Appointments WHERE appointment_time BETWEEN "08:00" AND "12:00""#),
        "SELECT * FROM Appointments WHERE appointment_time BETWEEN '08:00' AND '12:00';"
    );
}

#[test]
fn test_full_normalization() {
    assert_eq!(
        normalized(
            r#"select t1.first_name from patients as t1 where t1.gender = "FEMALE" and t1.first_name like "10:15""#
        ),
        "SELECT Patients.first_name FROM Patients WHERE Patients.gender = 'Female' AND Patients.first_name BETWEEN '00:00' AND '23:59';"
    );
}

#[test]
fn test_status_values_in_list() {
    assert_eq!(
        normalized("SELECT * FROM Billing WHERE payment_status NOT IN ('paid', 'PENDING')"),
        "SELECT * FROM Billing WHERE payment_status NOT IN ('Paid', 'Pending');"
    );
}
