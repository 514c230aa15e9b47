// libs/appointment-cell/src/services/ledger.rs
use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, SupabaseError};

use crate::models::{Appointment, AppointmentError, AppointmentStatus};

/// Persistence boundary for appointments. The uniqueness invariant on
/// (doctor, date, time) among non-cancelled rows lives in the database as a
/// partial unique index; this service performs the optimistic check-then-insert
/// and translates the storage conflict into `AppointmentError::SlotTaken`.
pub struct AppointmentLedger {
    supabase: SupabaseClient,
}

impl AppointmentLedger {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Times already reserved for (doctor, date), cancelled rows excluded.
    pub async fn occupied_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<HashSet<NaiveTime>, AppointmentError> {
        debug!("Fetching occupied slots for doctor {} on {}", doctor_id, date);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&status=neq.{}&select=appointment_time",
            doctor_id,
            date,
            AppointmentStatus::Cancelled,
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_supabase_error)?;

        let mut occupied = HashSet::new();
        for row in rows {
            let time: NaiveTime = serde_json::from_value(row["appointment_time"].clone())
                .map_err(|e| {
                    AppointmentError::DatabaseError(format!("Bad appointment_time in row: {}", e))
                })?;
            occupied.insert(time);
        }

        Ok(occupied)
    }

    /// Insert a new appointment with status `scheduled`. A storage-level
    /// uniqueness rejection comes back as `SlotTaken`.
    pub async fn insert_appointment(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Inserting appointment for patient {} with doctor {} at {} {}",
            patient_id, doctor_id, date, time
        );

        let now = Utc::now();
        let body = json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time,
            "status": AppointmentStatus::Scheduled.to_string(),
            "notes": notes,
            "reminder_sent": false,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(return_representation()),
            )
            .await
            .map_err(|e| match e {
                SupabaseError::Conflict(msg) => {
                    warn!(
                        "Slot conflict for doctor {} at {} {}: {}",
                        doctor_id, date, time, msg
                    );
                    AppointmentError::SlotTaken
                }
                other => map_supabase_error(other),
            })?;

        let row = result.into_iter().next().ok_or_else(|| {
            AppointmentError::DatabaseError("Insert returned no row".to_string())
        })?;

        let appointment: Appointment = serde_json::from_value(row).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse created appointment: {}", e))
        })?;

        info!("Appointment {} booked with doctor {}", appointment.id, doctor_id);
        Ok(appointment)
    }

    /// Set status to cancelled on an appointment the acting patient owns.
    /// The row filter carries both id and patient_id, so a foreign id comes
    /// back empty and is reported as not found. Cancelling an already
    /// cancelled appointment is a normal update that leaves it cancelled.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment {} for patient {}", appointment_id, patient_id);

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&patient_id=eq.{}",
            appointment_id, patient_id
        );
        let body = json!({
            "status": AppointmentStatus::Cancelled.to_string(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(return_representation()),
            )
            .await
            .map_err(map_supabase_error)?;

        let row = result.into_iter().next().ok_or(AppointmentError::NotFound)?;

        let appointment: Appointment = serde_json::from_value(row).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse updated appointment: {}", e))
        })?;

        info!("Appointment {} cancelled", appointment.id);
        Ok(appointment)
    }

    /// The acting patient's appointments, newest first.
    pub async fn list_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=appointment_date.desc,appointment_time.desc",
            patient_id
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(map_supabase_error)?;

        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| {
                AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e))
            })
    }
}

fn return_representation() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn map_supabase_error(e: SupabaseError) -> AppointmentError {
    match e {
        SupabaseError::Auth(_) => AppointmentError::Unauthorized,
        SupabaseError::NotFound(_) => AppointmentError::NotFound,
        other => AppointmentError::DatabaseError(other.to_string()),
    }
}
