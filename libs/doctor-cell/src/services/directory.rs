// libs/doctor-cell/src/services/directory.rs
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorError, DoctorSearchFilters};

/// Read side of the doctor directory: criteria search, single fetch and the
/// featured strip. All queries go through PostgREST; results come back
/// ordered by rating descending.
pub struct DirectoryService {
    supabase: SupabaseClient,
}

impl DirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Criteria search. Every present filter is applied conjunctively; an
    /// empty result set is a normal answer, not an error.
    pub async fn search(
        &self,
        filters: DoctorSearchFilters,
        limit: Option<i32>,
        offset: Option<i32>,
    ) -> Result<Vec<Doctor>, DoctorError> {
        filters.validate()?;
        debug!("Searching doctors with filters: {:?}", filters);

        let mut query_parts = Vec::new();

        if let Some(specialization) = filters.specialization {
            query_parts.push(format!("specialization=eq.{}", specialization));
        }
        if let Some(max_fee) = filters.max_fee {
            query_parts.push(format!("consultation_fee=lte.{}", max_fee));
        }
        if let Some(min_rating) = filters.min_rating {
            query_parts.push(format!("rating=gte.{}", min_rating));
        }
        if let Some(min_experience) = filters.min_experience {
            query_parts.push(format!("years_experience=gte.{}", min_experience));
        }

        query_parts.push("order=rating.desc".to_string());
        let mut path = format!("/rest/v1/doctors?{}", query_parts.join("&"));

        if let Some(limit) = limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        parse_doctors(result)
    }

    pub async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let row = result.into_iter().next().ok_or(DoctorError::NotFound)?;
        serde_json::from_value(row)
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))
    }

    /// Doctors flagged for the landing-page strip, best rated first.
    pub async fn list_featured(&self) -> Result<Vec<Doctor>, DoctorError> {
        let path = "/rest/v1/doctors?is_featured=eq.true&order=rating.desc&limit=6";
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, None, None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        parse_doctors(result)
    }
}

fn parse_doctors(rows: Vec<Value>) -> Result<Vec<Doctor>, DoctorError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Doctor>, _>>()
        .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))
}
