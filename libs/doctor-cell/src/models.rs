use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;
use shared_models::error::AppError;

/// Specialization allowed to operate in surgery rooms.
pub const SURGEON: &str = "SURGEON";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub doctor_number: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub department: String,
    pub phone_number: String,
    pub email: String,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_surgeon(&self) -> bool {
        self.specialization.eq_ignore_ascii_case(SURGEON)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDoctorRequest {
    pub doctor_number: String,
    pub first_name: String,
    pub last_name: String,
    pub specialization: String,
    pub department: String,
    pub phone_number: String,
    pub email: String,
}

impl CreateDoctorRequest {
    pub fn validate(&self) -> Result<(), DoctorError> {
        let required = [
            ("doctor_number", &self.doctor_number),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("specialization", &self.specialization),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DoctorError::Validation(format!("{} is required", field)));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Doctor number {0} already exists")]
    DuplicateNumber(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] SupabaseError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound(err.to_string()),
            DoctorError::DuplicateNumber(_) | DoctorError::Validation(_) => {
                AppError::ValidationError(err.to_string())
            }
            DoctorError::Store(e) => e.into(),
        }
    }
}
