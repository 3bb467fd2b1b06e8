//! HTTP-level integration tests for the appointment booking flow.
//!
//! Covers create with new and existing customers, business-hours and
//! overlap rejection, rescheduling, status changes, soft delete, listing,
//! and the availability preview.

mod common;

use axum::http::StatusCode;
use common::{
    build_test_app, delete_auth, expect_status, get_auth, post_json_auth, put_json_auth,
    session_for, TestSession,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// 2024-01-08 is a Monday.
const MONDAY: &str = "2024-01-08";
const SUNDAY: &str = "2024-01-07";

fn new_appointment(session: &TestSession, name: &str, start: &str, end: &str) -> serde_json::Value {
    json!({
        "csrf_token": session.csrf,
        "title": "Examen de vue",
        "date": MONDAY,
        "start_time": start,
        "end_time": end,
        "customer": { "name": name, "phone": "01 23 45 67 89" },
    })
}

async fn book(pool: &PgPool, session: &TestSession, name: &str, start: &str, end: &str) -> i64 {
    let app = build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/appointments",
        new_appointment(session, name, start, end),
        &session.token,
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;
    json["data"]["id"].as_i64().unwrap()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_inline_customer(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let app = build_test_app(pool);

    let response = post_json_auth(
        app,
        "/api/v1/appointments",
        new_appointment(&staff, "Alice Martin", "10:00", "10:30"),
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;

    let data = &json["data"];
    assert_eq!(data["title"], "Examen de vue");
    assert_eq!(data["start_time"], "2024-01-08T10:00:00");
    assert_eq!(data["end_time"], "2024-01-08T10:30:00");
    assert_eq!(data["customer"]["name"], "Alice Martin");
    assert_eq!(data["status"]["name"], "scheduled");
    assert_eq!(data["is_deleted"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_existing_customer(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/customers",
        json!({ "csrf_token": staff.csrf, "name": "Bruno Petit", "email": "bruno@example.com" }),
        &staff.token,
    )
    .await;
    let customer = expect_status(response, StatusCode::CREATED).await;
    let customer_id = customer["data"]["id"].as_i64().unwrap();

    let body = json!({
        "csrf_token": staff.csrf,
        "customer_id": customer_id,
        "title": "Lentilles",
        "date": MONDAY,
        "start_time": "14:00",
        "end_time": "14:45",
    });
    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/appointments",
        body,
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;
    assert_eq!(json["data"]["customer"]["id"], customer_id);
    assert_eq!(json["data"]["customer"]["email"], "bruno@example.com");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_unknown_customer(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let body = json!({
        "csrf_token": staff.csrf,
        "customer_id": 987_654,
        "title": "Examen",
        "date": MONDAY,
        "start_time": "10:00",
        "end_time": "10:30",
    });

    let response = post_json_auth(build_test_app(pool), "/api/v1/appointments", body, &staff.token)
        .await;
    let json = expect_status(response, StatusCode::NOT_FOUND).await;
    assert_eq!(json["code"], "CUSTOMER_NOT_FOUND");
    assert_eq!(json["error"], "Client introuvable.");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_requires_exactly_one_customer_source(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let body = json!({
        "csrf_token": staff.csrf,
        "title": "Examen",
        "date": MONDAY,
        "start_time": "10:00",
        "end_time": "10:30",
    });

    let response = post_json_auth(build_test_app(pool), "/api/v1/appointments", body, &staff.token)
        .await;
    let json = expect_status(response, StatusCode::UNPROCESSABLE_ENTITY).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert!(json["field_errors"]["customer"].is_array());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_reports_field_errors(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let body = json!({
        "csrf_token": staff.csrf,
        "title": "",
        "date": "08/01/2024",
        "start_time": "25:00",
        "end_time": "10:30",
        "customer": { "name": "", "email": "not-an-email" },
    });

    let response = post_json_auth(build_test_app(pool), "/api/v1/appointments", body, &staff.token)
        .await;
    let json = expect_status(response, StatusCode::UNPROCESSABLE_ENTITY).await;
    let fields = &json["field_errors"];
    assert!(fields["title"].is_array());
    assert!(fields["date"].is_array());
    assert!(fields["start_time"].is_array());
    assert!(fields["customer.name"].is_array());
    assert!(fields["customer.email"].is_array());
    assert!(fields["end_time"].is_null());
}

// ---------------------------------------------------------------------------
// Business hours and conflicts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_outside_business_hours(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;

    for (date, start, end) in [
        (SUNDAY, "10:00", "10:30"),
        (MONDAY, "08:30", "09:30"),
        (MONDAY, "19:00", "19:30"),
        (MONDAY, "18:30", "19:15"),
    ] {
        let body = json!({
            "csrf_token": staff.csrf,
            "title": "Examen",
            "date": date,
            "start_time": start,
            "end_time": end,
            "customer": { "name": "Hors horaires" },
        });
        let response = post_json_auth(
            build_test_app(pool.clone()),
            "/api/v1/appointments",
            body,
            &staff.token,
        )
        .await;
        let json = expect_status(response, StatusCode::BAD_REQUEST).await;
        assert_eq!(json["code"], "VALIDATION_ERROR", "{date} {start}-{end}");
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_with_end_before_start(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let response = post_json_auth(
        build_test_app(pool),
        "/api/v1/appointments",
        new_appointment(&staff, "Alice", "11:00", "10:00"),
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_overlap_returns_conflict(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let first = book(&pool, &staff, "Alice", "10:00", "10:30").await;

    let response = post_json_auth(
        build_test_app(pool.clone()),
        "/api/v1/appointments",
        new_appointment(&staff, "Bruno", "10:15", "10:45"),
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "TIME_CONFLICT");
    assert_eq!(json["conflicting_appointment_id"], first);

    // Back-to-back is fine.
    book(&pool, &staff, "Bruno", "10:30", "11:00").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_availability_preview(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let existing = book(&pool, &staff, "Alice", "10:00", "10:30").await;

    let busy = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/appointments/availability?date=2024-01-08&start_time=10:15&end_time=10:45",
        &staff.token,
    )
    .await;
    let json = expect_status(busy, StatusCode::OK).await;
    assert_eq!(json["data"]["available"], false);
    assert_eq!(json["data"]["within_business_hours"], true);
    assert_eq!(json["data"]["conflicting"]["id"], existing);

    let own = get_auth(
        build_test_app(pool.clone()),
        &format!(
            "/api/v1/appointments/availability?date=2024-01-08&start_time=10:15&end_time=10:45&exclude_id={existing}"
        ),
        &staff.token,
    )
    .await;
    let json = expect_status(own, StatusCode::OK).await;
    assert_eq!(json["data"]["available"], true);

    let sunday = get_auth(
        build_test_app(pool),
        "/api/v1/appointments/availability?date=2024-01-07&start_time=10:00&end_time=10:30",
        &staff.token,
    )
    .await;
    let json = expect_status(sunday, StatusCode::OK).await;
    assert_eq!(json["data"]["available"], false);
    assert_eq!(json["data"]["within_business_hours"], false);
}

// ---------------------------------------------------------------------------
// Update, status, delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reschedule_excludes_self(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let id = book(&pool, &staff, "Alice", "10:00", "11:00").await;

    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/v1/appointments/{id}"),
        json!({ "csrf_token": staff.csrf, "start_time": "10:30", "end_time": "11:30" }),
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["start_time"], "2024-01-08T10:30:00");
    assert_eq!(json["data"]["end_time"], "2024-01-08T11:30:00");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_customer_fields_and_status(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let id = book(&pool, &staff, "Alice", "10:00", "10:30").await;

    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/v1/appointments/{id}"),
        json!({
            "csrf_token": staff.csrf,
            "status_id": 2,
            "customer_update": { "email": "alice@example.com" },
        }),
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["status"]["name"], "confirmed");
    assert_eq!(json["data"]["customer"]["email"], "alice@example.com");
    assert_eq!(json["data"]["customer"]["name"], "Alice");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_with_unknown_status(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let id = book(&pool, &staff, "Alice", "10:00", "10:30").await;

    let response = put_json_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/appointments/{id}"),
        json!({ "csrf_token": staff.csrf, "status_id": 42 }),
        &staff.token,
    )
    .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;

    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/v1/appointments/{id}/status"),
        json!({ "csrf_token": staff.csrf, "status_id": 42 }),
        &staff.token,
    )
    .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_status_change(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    let id = book(&pool, &staff, "Alice", "10:00", "10:30").await;

    let response = put_json_auth(
        build_test_app(pool),
        &format!("/api/v1/appointments/{id}/status"),
        json!({ "csrf_token": staff.csrf, "status_id": 4 }),
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"]["status"]["name"], "completed");
    assert_eq!(json["data"]["start_time"], "2024-01-08T10:00:00");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_hides_and_frees_slot(pool: PgPool) {
    let manager = session_for(&pool, "marc", "manager").await;
    let id = book(&pool, &manager, "Alice", "10:00", "10:30").await;

    let response = delete_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/appointments/{id}"),
        &manager.token,
        Some(&manager.csrf),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(
        build_test_app(pool.clone()),
        &format!("/api/v1/appointments/{id}"),
        &manager.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/appointments",
        &manager.token,
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/appointments?include_deleted=true",
        &manager.token,
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    // Same slot can be booked again.
    book(&pool, &manager, "Bruno", "10:00", "10:30").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_by_range_and_statuses(pool: PgPool) {
    let staff = session_for(&pool, "sofia", "staff").await;
    book(&pool, &staff, "Alice", "10:00", "10:30").await;
    book(&pool, &staff, "Bruno", "09:00", "09:30").await;

    let response = get_auth(
        build_test_app(pool.clone()),
        "/api/v1/appointments?from=2024-01-08T00:00:00&to=2024-01-09T00:00:00&limit=10",
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    let items = json["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["customer"]["name"], "Bruno");
    assert_eq!(items[1]["customer"]["name"], "Alice");

    let response = get_auth(
        build_test_app(pool),
        "/api/v1/appointment-statuses",
        &staff.token,
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 6);
    assert_eq!(json["data"][0]["name"], "scheduled");
}
