// libs/appointment-cell/tests/flow_test.rs
//
// Booking flow state machine against a mocked storage layer: the full
// criteria -> doctor -> date -> time -> confirm walk, the concurrent-slot
// conflict recovery, the date horizon, and backward transitions.

use std::collections::HashSet;

use assert_matches::assert_matches;
use chrono::{Duration, NaiveTime, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::AppointmentError;
use appointment_cell::services::flow::{BookingFlow, BookingStep};
use doctor_cell::models::{Doctor, DoctorSearchFilters, Specialization};
use shared_config::AppConfig;
use shared_utils::test_utils::TestConfig;

const TOKEN: &str = "test-token";

fn mock_config(server: &MockServer) -> AppConfig {
    TestConfig::with_mock_server(&server.uri()).to_app_config()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn doctor_json(id: Uuid, name: &str, rating: f32, fee: f64, experience: i32) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": Uuid::new_v4(),
        "name": name,
        "specialization": "Cardiologist",
        "years_experience": experience,
        "bio": "Experienced cardiologist",
        "consultation_fee": fee,
        "rating": rating,
        "availability": {
            "monday": true, "tuesday": true, "wednesday": true, "thursday": true,
            "friday": true, "saturday": true, "sunday": false
        },
        "is_featured": false,
        "created_at": Utc::now().to_rfc3339()
    })
}

fn test_doctor(id: Uuid) -> Doctor {
    serde_json::from_value(doctor_json(id, "Dr. Riley Hart", 4.5, 100.0, 10)).unwrap()
}

fn appointment_json(patient_id: Uuid, doctor_id: Uuid, date: &str, time: &str) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "appointment_date": date,
        "appointment_time": time,
        "status": "scheduled",
        "notes": "checkup",
        "reminder_sent": false,
        "created_at": Utc::now().to_rfc3339(),
        "updated_at": Utc::now().to_rfc3339()
    })
}

async fn mock_occupied_slots(server: &MockServer, doctor_id: Uuid, times: &[&str]) {
    let rows: Vec<_> = times
        .iter()
        .map(|time| json!({ "appointment_time": time }))
        .collect();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;
}

#[tokio::test]
async fn wizard_walks_criteria_to_success() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let patient_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let date = Utc::now().date_naive() + Duration::days(7);

    // Directory search must carry all four predicates conjunctively.
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("specialization", "eq.Cardiologist"))
        .and(query_param("consultation_fee", "lte.150"))
        .and(query_param("rating", "gte.4"))
        .and(query_param("years_experience", "gte.5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_json(doctor_id, "Dr. Riley Hart", 4.5, 100.0, 10),
            doctor_json(Uuid::new_v4(), "Dr. Sam Okafor", 4.2, 120.0, 8),
        ])))
        .mount(&server)
        .await;

    mock_occupied_slots(&server, doctor_id, &[]).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            appointment_json(patient_id, doctor_id, &date.to_string(), "09:00:00")
        ])))
        .mount(&server)
        .await;

    let mut flow = BookingFlow::new(&config);
    assert_eq!(flow.step(), BookingStep::Criteria);

    let candidates = flow
        .apply_criteria(DoctorSearchFilters {
            specialization: Some(Specialization::Cardiologist),
            max_fee: Some(150.0),
            min_rating: Some(4.0),
            min_experience: Some(5),
        })
        .await
        .unwrap();
    assert_eq!(candidates.len(), 2);
    // Directory contract: non-increasing by rating.
    assert!(candidates.windows(2).all(|w| w[0].rating >= w[1].rating));

    flow.select_doctor(doctor_id).unwrap();
    assert_eq!(flow.step(), BookingStep::SelectDate);

    let occupied = flow.select_date(date, TOKEN).await.unwrap();
    assert!(occupied.is_empty());

    flow.select_time(t(9, 0)).unwrap();
    flow.set_notes(Some("checkup".to_string()));

    let appointment = flow.confirm(patient_id, TOKEN).await.unwrap();
    assert_eq!(appointment.doctor_id, doctor_id);
    assert_eq!(appointment.appointment_time, t(9, 0));
    assert_eq!(flow.step(), BookingStep::Success);
}

#[tokio::test]
async fn losing_confirm_rewinds_to_time_with_refreshed_occupancy() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let doctor_id = Uuid::new_v4();
    let date = Utc::now().date_naive() + Duration::days(3);

    // First occupancy read (at date selection) sees the slot free...
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    // ...the refresh after the conflict sees it taken.
    mock_occupied_slots(&server, doctor_id, &["09:00:00"]).await;

    // Storage rejects the insert: another booking won the race.
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_slot_key\""
        })))
        .mount(&server)
        .await;

    let mut flow = BookingFlow::with_doctor(&config, test_doctor(doctor_id));
    assert_eq!(flow.step(), BookingStep::SelectDate);

    flow.select_date(date, TOKEN).await.unwrap();
    flow.select_time(t(9, 0)).unwrap();

    let result = flow.confirm(Uuid::new_v4(), TOKEN).await;
    assert_matches!(result, Err(AppointmentError::SlotTaken));

    // Recoverable: back on the time step, contested slot now shown occupied.
    assert_eq!(flow.step(), BookingStep::SelectTime);
    let expected: HashSet<NaiveTime> = [t(9, 0)].into_iter().collect();
    assert_eq!(flow.occupied_slots(), &expected);

    // The contested slot is no longer selectable.
    assert_matches!(
        flow.select_time(t(9, 0)),
        Err(AppointmentError::InvalidTime(_))
    );
    flow.select_time(t(9, 30)).unwrap();
    assert_eq!(flow.step(), BookingStep::Confirm);
}

#[tokio::test]
async fn non_conflict_insert_failure_stays_on_confirm() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let doctor_id = Uuid::new_v4();
    mock_occupied_slots(&server, doctor_id, &[]).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("storage offline"))
        .mount(&server)
        .await;

    let mut flow = BookingFlow::with_doctor(&config, test_doctor(doctor_id));
    let date = Utc::now().date_naive() + Duration::days(1);
    flow.select_date(date, TOKEN).await.unwrap();
    flow.select_time(t(14, 0)).unwrap();

    let result = flow.confirm(Uuid::new_v4(), TOKEN).await;
    assert_matches!(result, Err(AppointmentError::DatabaseError(_)));
    // Fatal for this step: the user retries from confirm.
    assert_eq!(flow.step(), BookingStep::Confirm);
}

#[tokio::test]
async fn dates_outside_the_horizon_are_rejected() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let today = Utc::now().date_naive();
    let mut flow = BookingFlow::with_doctor(&config, test_doctor(Uuid::new_v4()));

    assert_matches!(
        flow.select_date(today - Duration::days(1), TOKEN).await,
        Err(AppointmentError::InvalidDate(_))
    );
    assert_matches!(
        flow.select_date(today + Duration::days(30), TOKEN).await,
        Err(AppointmentError::InvalidDate(_))
    );
    // A rejected date does not advance the flow.
    assert_eq!(flow.step(), BookingStep::SelectDate);
}

#[tokio::test]
async fn times_off_the_slot_grid_are_rejected() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let doctor_id = Uuid::new_v4();
    mock_occupied_slots(&server, doctor_id, &["10:00:00"]).await;

    let mut flow = BookingFlow::with_doctor(&config, test_doctor(doctor_id));
    let date = Utc::now().date_naive() + Duration::days(2);
    flow.select_date(date, TOKEN).await.unwrap();

    assert_matches!(
        flow.select_time(t(12, 30)),
        Err(AppointmentError::InvalidTime(_))
    );
    assert_matches!(
        flow.select_time(t(10, 0)),
        Err(AppointmentError::InvalidTime(_))
    );
    flow.select_time(t(10, 30)).unwrap();
}

#[tokio::test]
async fn back_rewinds_one_step_and_discards_later_choices() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            doctor_json(doctor_id, "Dr. Riley Hart", 4.5, 100.0, 10)
        ])))
        .mount(&server)
        .await;
    mock_occupied_slots(&server, doctor_id, &[]).await;

    let mut flow = BookingFlow::new(&config);
    flow.apply_criteria(DoctorSearchFilters::default()).await.unwrap();
    flow.select_doctor(doctor_id).unwrap();

    let date = Utc::now().date_naive() + Duration::days(5);
    flow.select_date(date, TOKEN).await.unwrap();
    flow.select_time(t(9, 30)).unwrap();
    assert_eq!(flow.step(), BookingStep::Confirm);

    assert!(flow.back());
    assert_eq!(flow.step(), BookingStep::SelectTime);
    assert!(flow.back());
    assert_eq!(flow.step(), BookingStep::SelectDate);
    assert!(flow.back());
    assert_eq!(flow.step(), BookingStep::SelectDoctor);
    assert!(flow.back());
    assert_eq!(flow.step(), BookingStep::Criteria);
    assert!(!flow.back());
}

#[tokio::test]
async fn dialog_variant_has_no_step_before_date() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let mut flow = BookingFlow::with_doctor(&config, test_doctor(Uuid::new_v4()));
    assert_eq!(flow.step(), BookingStep::SelectDate);
    assert!(!flow.back());

    // Reset keeps the preselected doctor and reopens on the date step.
    flow.reset();
    assert_eq!(flow.step(), BookingStep::SelectDate);
    assert!(flow.selected_doctor().is_some());
}

#[tokio::test]
async fn skipping_steps_is_not_possible() {
    let server = MockServer::start().await;
    let config = mock_config(&server);

    let mut flow = BookingFlow::new(&config);

    assert_matches!(
        flow.select_time(t(9, 0)),
        Err(AppointmentError::InvalidStep(_))
    );
    assert_matches!(
        flow.confirm(Uuid::new_v4(), TOKEN).await,
        Err(AppointmentError::InvalidStep(_))
    );
}
