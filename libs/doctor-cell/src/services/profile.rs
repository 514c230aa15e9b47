// libs/doctor-cell/src/services/profile.rs
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorError, UpsertDoctorRequest, WeeklyAvailability};

/// Write side of the directory: a doctor-role user maintains exactly one
/// profile row. Writes ride on `on_conflict=user_id` so repeated submissions
/// replace the existing row instead of growing duplicates.
pub struct DoctorProfileService {
    supabase: SupabaseClient,
}

impl DoctorProfileService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn upsert_profile(
        &self,
        user_id: &str,
        request: UpsertDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        request.validate()?;
        debug!("Upserting doctor profile for user {}", user_id);

        let availability = request.availability.unwrap_or_else(WeeklyAvailability::default);
        let body = json!({
            "user_id": user_id,
            "name": request.name,
            "specialization": request.specialization,
            "years_experience": request.years_experience,
            "bio": request.bio,
            "consultation_fee": request.consultation_fee,
            "availability": availability,
        });

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctors?on_conflict=user_id",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::DatabaseError("Upsert returned no row".to_string()))?;

        let doctor: Doctor = serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        info!("Doctor profile {} upserted for user {}", doctor.id, user_id);
        Ok(doctor)
    }
}
