// libs/doctor-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The clinic's fixed set of specializations. Closed on purpose: filter
/// parameters and stored rows both parse into this enum, so an unknown
/// specialization is rejected at the boundary instead of leaking through
/// as an ad hoc string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specialization {
    GeneralPhysician,
    Cardiologist,
    Dermatologist,
    Neurologist,
    Orthopedic,
    Pediatrician,
    Psychiatrist,
    Gynecologist,
}

impl Specialization {
    pub const ALL: [Specialization; 8] = [
        Specialization::GeneralPhysician,
        Specialization::Cardiologist,
        Specialization::Dermatologist,
        Specialization::Neurologist,
        Specialization::Orthopedic,
        Specialization::Pediatrician,
        Specialization::Psychiatrist,
        Specialization::Gynecologist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Specialization::GeneralPhysician => "GeneralPhysician",
            Specialization::Cardiologist => "Cardiologist",
            Specialization::Dermatologist => "Dermatologist",
            Specialization::Neurologist => "Neurologist",
            Specialization::Orthopedic => "Orthopedic",
            Specialization::Pediatrician => "Pediatrician",
            Specialization::Psychiatrist => "Psychiatrist",
            Specialization::Gynecologist => "Gynecologist",
        }
    }
}

impl fmt::Display for Specialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Specialization {
    type Err = DoctorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Specialization::ALL
            .iter()
            .find(|sp| sp.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| DoctorError::ValidationError(format!("Unknown specialization: {}", s)))
    }
}

/// Day-name -> available map on the doctor profile. Stored and served as-is;
/// the booking flow does not consult it when offering slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyAvailability {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl Default for WeeklyAvailability {
    fn default() -> Self {
        Self {
            monday: true,
            tuesday: true,
            wednesday: true,
            thursday: true,
            friday: true,
            saturday: true,
            sunday: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub specialization: Specialization,
    pub years_experience: i32,
    pub bio: Option<String>,
    pub consultation_fee: f64,
    pub rating: f32,
    pub availability: WeeklyAvailability,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

/// Conjunctive directory filters: a doctor must satisfy every present
/// predicate to appear in the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchFilters {
    pub specialization: Option<Specialization>,
    pub max_fee: Option<f64>,
    pub min_rating: Option<f32>,
    pub min_experience: Option<i32>,
}

impl DoctorSearchFilters {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if let Some(fee) = self.max_fee {
            if fee < 0.0 {
                return Err(DoctorError::ValidationError(
                    "max_fee must be non-negative".to_string(),
                ));
            }
        }
        if let Some(rating) = self.min_rating {
            if !(1.0..=5.0).contains(&rating) {
                return Err(DoctorError::ValidationError(
                    "min_rating must be between 1.0 and 5.0".to_string(),
                ));
            }
        }
        if let Some(exp) = self.min_experience {
            if exp < 0 {
                return Err(DoctorError::ValidationError(
                    "min_experience must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Upsert payload for a doctor-role user's own profile. One row per identity:
/// submitting again replaces the previous profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertDoctorRequest {
    pub name: String,
    pub specialization: Specialization,
    pub years_experience: i32,
    pub bio: Option<String>,
    pub consultation_fee: f64,
    pub availability: Option<WeeklyAvailability>,
}

impl UpsertDoctorRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        if self.name.trim().is_empty() {
            return Err(DoctorError::ValidationError("name is required".to_string()));
        }
        if self.years_experience < 0 {
            return Err(DoctorError::ValidationError(
                "years_experience must be non-negative".to_string(),
            ));
        }
        if self.consultation_fee < 0.0 {
            return Err(DoctorError::ValidationError(
                "consultation_fee must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
