// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DoctorError, DoctorSearchFilters, UpsertDoctorRequest};
use crate::services::{directory::DirectoryService, profile::DoctorProfileService};

#[derive(Debug, Deserialize)]
pub struct DoctorSearchQuery {
    /// Specialization name, or "any" / absent for no restriction.
    pub specialization: Option<String>,
    pub max_fee: Option<f64>,
    pub min_rating: Option<f32>,
    pub min_experience: Option<i32>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

impl DoctorSearchQuery {
    fn into_filters(self) -> Result<DoctorSearchFilters, AppError> {
        let specialization = match self.specialization.as_deref() {
            None | Some("any") | Some("") => None,
            Some(name) => Some(name.parse().map_err(doctor_error)?),
        };
        Ok(DoctorSearchFilters {
            specialization,
            max_fee: self.max_fee,
            min_rating: self.min_rating,
            min_experience: self.min_experience,
        })
    }
}

fn doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC HANDLERS (NO AUTHENTICATION REQUIRED)
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = DirectoryService::new(&state);

    let limit = query.limit;
    let offset = query.offset;
    let filters = query.into_filters()?;

    let doctors = directory
        .search(filters, limit, offset)
        .await
        .map_err(doctor_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn list_featured_doctors(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let directory = DirectoryService::new(&state);
    let doctors = directory.list_featured().await.map_err(doctor_error)?;

    Ok(Json(json!({ "doctors": doctors })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let directory = DirectoryService::new(&state);
    let doctor = directory.get_doctor(doctor_id).await.map_err(doctor_error)?;

    Ok(Json(json!(doctor)))
}

// ==============================================================================
// PROTECTED HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn upsert_my_profile(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpsertDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.has_role("doctor") {
        return Err(AppError::Auth(
            "Only doctor accounts can manage a doctor profile".to_string(),
        ));
    }

    let profile_service = DoctorProfileService::new(&state);
    let doctor = profile_service
        .upsert_profile(&user.id, request, auth.token())
        .await
        .map_err(doctor_error)?;

    Ok(Json(json!(doctor)))
}
