use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{BookAppointmentForm, BookingError, ConfirmationOutcome};
use appointment_cell::services::booking::BookingService;
use appointment_cell::services::confirmation::{confirmation_signer, ConfirmationService};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

const TOKEN: &str = "test-user-token";
const SIGNING_SECRET: &str = "test-token-signing-secret";

// Monday, one week before the booked Monday below.
fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn booking_form(doctor_id: &str) -> BookAppointmentForm {
    BookAppointmentForm {
        doctor_id: Some(doctor_id.to_string()),
        start_date: Some("2025-06-09".to_string()),
        start_time: Some("09:00".to_string()),
        end_time: Some("09:30".to_string()),
        clinic: Some("Central Clinic".to_string()),
        one_time: Some("on".to_string()),
        ..Default::default()
    }
}

async fn mock_doctor_and_client(server: &MockServer, doctor_id: &str, client_id: &str) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(doctor_id, "drjones", "Amelia Jones")
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(query_param("id", format!("eq.{}", client_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::client_response(client_id, "Test Client")
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn booking_reserves_the_slot_and_stores_a_snapshot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();
    let slot_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    mock_doctor_and_client(&mock_server, &doctor_id, &client_id).await;

    // The booked Monday falls in week two, so the conditional update
    // targets second_week_reserved.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .and(query_param("day", "eq.Monday"))
        .and(query_param("second_week_reserved", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::slot_response(
                &slot_id, &doctor_id, "Monday", "09:00:00", "09:30:00", false, true,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id, &doctor_id, &client_id, "2025-06-09", false,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let appointment = service
        .book(&client_id, &booking_form(&doctor_id), today(), TOKEN)
        .await
        .unwrap();

    assert_eq!(appointment.id.to_string(), appointment_id);
    assert!(!appointment.confirmed);
    assert_eq!(appointment.duration_minutes, 30);
}

#[tokio::test]
async fn losing_the_slot_race_reports_it_unavailable() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();

    mock_doctor_and_client(&mock_server, &doctor_id, &client_id).await;

    // An empty result from the conditional update means another booking
    // already flipped the flag (or the slot never existed).
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let result = service
        .book(&client_id, &booking_form(&doctor_id), today(), TOKEN)
        .await;

    assert_matches!(result, Err(BookingError::SlotUnavailable));
}

#[tokio::test]
async fn failed_snapshot_insert_releases_the_reservation() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();
    let slot_id = Uuid::new_v4().to_string();

    mock_doctor_and_client(&mock_server, &doctor_id, &client_id).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .and(query_param("second_week_reserved", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::slot_response(
                &slot_id, &doctor_id, "Monday", "09:00:00", "09:30:00", false, true,
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("insert failed"))
        .mount(&mock_server)
        .await;

    // The rollback targets the reserved slot by id.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::slot_response(
                &slot_id, &doctor_id, "Monday", "09:00:00", "09:30:00", false, false,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let result = service
        .book(&client_id, &booking_form(&doctor_id), today(), TOKEN)
        .await;

    assert_matches!(result, Err(BookingError::Database(_)));
}

#[tokio::test]
async fn validation_failures_never_reach_the_store() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let mut form = booking_form("some-doctor");
    form.one_time = None;

    // No mocks are mounted; any request would fail the test through the
    // returned error instead of RecurringNotSupported.
    let result = service.book("some-client", &form, today(), TOKEN).await;
    assert_matches!(result, Err(BookingError::RecurringNotSupported));

    let mut form = booking_form("some-doctor");
    form.start_date = Some("2025-07-01".to_string());
    let result = service.book("some-client", &form, today(), TOKEN).await;
    assert_matches!(result, Err(BookingError::BeyondHorizon));
}

#[tokio::test]
async fn unknown_client_aborts_before_reserving() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(&doctor_id, "drjones", "Amelia Jones")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let result = service
        .book(&client_id, &booking_form(&doctor_id), today(), TOKEN)
        .await;

    assert_matches!(result, Err(BookingError::ClientNotFound));
}

#[tokio::test]
async fn valid_link_confirms_the_appointment() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id, &doctor_id, &client_id, "2025-06-09", false,
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id, &doctor_id, &client_id, "2025-06-09", true,
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ConfirmationService::new(&config);

    let token = confirmation_signer(SIGNING_SECRET).sign(&appointment_id);
    let outcome = service.confirm(&token).await.unwrap();

    assert_eq!(outcome, ConfirmationOutcome::Confirmed);
}

#[tokio::test]
async fn confirming_twice_is_reported_not_rewritten() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id, &doctor_id, &client_id, "2025-06-09", true,
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ConfirmationService::new(&config);

    let token = confirmation_signer(SIGNING_SECRET).sign(&appointment_id);
    let outcome = service.confirm(&token).await.unwrap();

    assert_eq!(outcome, ConfirmationOutcome::AlreadyConfirmed);
}

#[tokio::test]
async fn link_to_a_missing_appointment_looks_like_any_bad_link() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4().to_string();

    // The token is genuine and fresh; only the appointment is gone.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ConfirmationService::new(&config);

    let token = confirmation_signer(SIGNING_SECRET).sign(&appointment_id);
    let result = service.confirm(&token).await;

    assert_matches!(result, Err(BookingError::InvalidConfirmationLink));
}

#[tokio::test]
async fn expired_and_forged_links_are_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = ConfirmationService::new(&config);

    let stale = confirmation_signer(SIGNING_SECRET)
        .sign_at("some-appointment-id", Utc::now().timestamp() - 3601);
    let result = service.confirm(&stale).await;
    assert_matches!(result, Err(BookingError::InvalidConfirmationLink));

    let result = service.confirm("not-a-real-token").await;
    assert_matches!(result, Err(BookingError::InvalidConfirmationLink));

    let foreign = confirmation_signer("some-other-secret").sign("some-appointment-id");
    let result = service.confirm(&foreign).await;
    assert_matches!(result, Err(BookingError::InvalidConfirmationLink));
}

#[tokio::test]
async fn confirmation_mail_carries_the_doctor_details() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();
    let slot_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    mock_doctor_and_client(&mock_server, &doctor_id, &client_id).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::slot_response(
                &slot_id, &doctor_id, "Monday", "09:00:00", "09:30:00", false, true,
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id, &doctor_id, &client_id, "2025-06-09", false,
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/mail/send"))
        .and(body_string_contains("Doctor: Dr. Test Doctor"))
        .and(body_string_contains("Clinic: Central Clinic"))
        .and(body_string_contains("Address: 12 Clinic Street"))
        .and(body_string_contains("/appointments/confirm/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "mail-1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut test_config = TestConfig::with_supabase_url(&mock_server.uri());
    test_config.mail_api_url = format!("{}/mail/send", mock_server.uri());
    let service = BookingService::new(&test_config.to_app_config());

    service
        .book(&client_id, &booking_form(&doctor_id), today(), TOKEN)
        .await
        .unwrap();
}

#[tokio::test]
async fn client_overview_splits_active_from_finished() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4().to_string();
    let client_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("client_id", format!("eq.{}", client_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(), &doctor_id, &client_id, "2025-06-03", true,
            ),
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(), &doctor_id, &client_id, "2025-06-01", true,
            ),
        ])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_supabase_url(&mock_server.uri()).to_app_config();
    let service = BookingService::new(&config);

    let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
    let overview = service
        .list_for_client(&client_id, today(), noon, TOKEN)
        .await
        .unwrap();

    assert_eq!(overview.total_appointments, 2);
    assert_eq!(overview.active_appointments, 1);
    assert_eq!(overview.finished_appointments, 1);
}
