// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::{NaiveDate, Utc};
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::directory::DirectoryService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AppointmentError, BookAppointmentRequest, OccupiedSlotsResponse};
use crate::services::flow::BookingFlow;
use crate::services::ledger::AppointmentLedger;
use crate::slots;

#[derive(Debug, Deserialize)]
pub struct OccupiedSlotsQuery {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
}

fn appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::SlotTaken => {
            AppError::SlotTaken("Slot is no longer available, pick another".to_string())
        }
        AppointmentError::InvalidDate(msg)
        | AppointmentError::InvalidTime(msg)
        | AppointmentError::InvalidStep(msg)
        | AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        AppointmentError::Unauthorized => {
            AppError::Auth("Not authorized for this appointment".to_string())
        }
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
        AppointmentError::DirectoryError(msg) => AppError::ExternalService(msg),
    }
}

fn acting_patient(user: &User) -> Result<Uuid, AppError> {
    user.id
        .parse()
        .map_err(|_| AppError::Auth("Acting user has no valid id".to_string()))
}

/// Occupied (status != cancelled) times for a doctor and date, alongside the
/// full slot list so clients can render availability in one round trip.
#[axum::debug_handler]
pub async fn get_occupied_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<OccupiedSlotsQuery>,
) -> Result<Json<Value>, AppError> {
    slots::validate_booking_date(query.date, Utc::now().date_naive())
        .map_err(appointment_error)?;

    let ledger = AppointmentLedger::new(&state);

    let occupied = ledger
        .occupied_slots(query.doctor_id, query.date, auth.token())
        .await
        .map_err(appointment_error)?;

    let mut occupied: Vec<_> = occupied.into_iter().collect();
    occupied.sort();

    Ok(Json(json!({
        "response": OccupiedSlotsResponse {
            doctor_id: query.doctor_id,
            date: query.date,
            occupied,
        },
        "all_slots": slots::all_slots(),
    })))
}

/// Single-shot booking. Internally this drives the same state machine as the
/// interactive wizard, opened with the doctor preselected, so date-horizon
/// and slot checks cannot diverge between the two paths.
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = acting_patient(&user)?;
    let token = auth.token();

    let directory = DirectoryService::new(&state);
    let doctor = directory
        .get_doctor(request.doctor_id)
        .await
        .map_err(|e| match e {
            DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::DatabaseError(msg) => AppError::Database(msg),
        })?;

    let mut flow = BookingFlow::with_doctor(&state, doctor);
    flow.select_date(request.appointment_date, token)
        .await
        .map_err(appointment_error)?;
    flow.select_time(request.appointment_time)
        .map_err(appointment_error)?;
    flow.set_notes(request.notes);

    let appointment = flow
        .confirm(patient_id, token)
        .await
        .map_err(appointment_error)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let patient_id = acting_patient(&user)?;
    let ledger = AppointmentLedger::new(&state);

    let appointments = ledger
        .list_for_patient(patient_id, auth.token())
        .await
        .map_err(appointment_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let patient_id = acting_patient(&user)?;
    let ledger = AppointmentLedger::new(&state);

    let appointment = ledger
        .cancel(appointment_id, patient_id, auth.token())
        .await
        .map_err(appointment_error)?;

    Ok(Json(json!(appointment)))
}
