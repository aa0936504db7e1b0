use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{CreateDoctorRequest, Doctor, DoctorError};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    async fn query(&self, path: &str, auth_token: &str) -> Result<Vec<Doctor>, DoctorError> {
        let doctors: Vec<Doctor> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await?;
        Ok(doctors)
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Creating doctor {}", request.doctor_number);
        request.validate()?;

        if self.find_by_number(&request.doctor_number, auth_token).await?.is_some() {
            return Err(DoctorError::DuplicateNumber(request.doctor_number));
        }

        let body = json!({
            "doctor_number": request.doctor_number,
            "first_name": request.first_name,
            "last_name": request.last_name,
            "specialization": request.specialization,
            "department": request.department,
            "phone_number": request.phone_number,
            "email": request.email,
        });

        let created: Vec<Doctor> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/doctors", auth_token, body)
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    DoctorError::DuplicateNumber(request.doctor_number.clone())
                } else {
                    DoctorError::Store(e)
                }
            })?;

        let doctor = created.into_iter().next().ok_or(DoctorError::NotFound)?;
        info!("Doctor {} created with id {}", doctor.doctor_number, doctor.id);
        Ok(doctor)
    }

    pub async fn list_doctors(&self, auth_token: &str) -> Result<Vec<Doctor>, DoctorError> {
        self.query("/rest/v1/doctors?order=last_name.asc", auth_token).await
    }

    pub async fn find_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Doctor>, DoctorError> {
        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        Ok(self.query(&path, auth_token).await?.into_iter().next())
    }

    pub async fn get_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor {}", doctor_id);
        self.find_doctor(doctor_id, auth_token)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    pub async fn find_by_number(
        &self,
        doctor_number: &str,
        auth_token: &str,
    ) -> Result<Option<Doctor>, DoctorError> {
        let path = format!(
            "/rest/v1/doctors?doctor_number=eq.{}",
            urlencoding::encode(doctor_number)
        );
        Ok(self.query(&path, auth_token).await?.into_iter().next())
    }

    pub async fn get_by_number(
        &self,
        doctor_number: &str,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        self.find_by_number(doctor_number, auth_token)
            .await?
            .ok_or(DoctorError::NotFound)
    }

    pub async fn by_specialization(
        &self,
        specialization: &str,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        let path = format!(
            "/rest/v1/doctors?specialization=eq.{}",
            urlencoding::encode(specialization)
        );
        self.query(&path, auth_token).await
    }

    pub async fn by_department(
        &self,
        department: &str,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        let path = format!(
            "/rest/v1/doctors?department=eq.{}",
            urlencoding::encode(department)
        );
        self.query(&path, auth_token).await
    }

    pub async fn delete_doctor(&self, doctor_id: Uuid, auth_token: &str) -> Result<(), DoctorError> {
        self.get_doctor(doctor_id, auth_token).await?;

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        info!("Doctor {} deleted", doctor_id);
        Ok(())
    }
}
