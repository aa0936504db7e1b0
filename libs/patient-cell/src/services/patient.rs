use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{CreatePatientRequest, Patient, PatientError, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient {}", request.patient_number);
        let patient = request.into_patient()?;

        let existing_path = format!(
            "/rest/v1/patients?patient_number=eq.{}",
            urlencoding::encode(&patient.patient_number)
        );
        let existing: Vec<Patient> = self
            .supabase
            .request(Method::GET, &existing_path, Some(auth_token), None)
            .await?;

        if !existing.is_empty() {
            return Err(PatientError::DuplicateNumber(patient.patient_number));
        }

        let created: Vec<Patient> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/patients", auth_token, json!(patient))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    PatientError::DuplicateNumber(patient.patient_number.clone())
                } else {
                    PatientError::Store(e)
                }
            })?;

        let patient = created.into_iter().next().unwrap_or(patient);
        info!("Patient {} created with id {}", patient.patient_number, patient.id);
        Ok(patient)
    }

    pub async fn list_patients(&self, auth_token: &str) -> Result<Vec<Patient>, PatientError> {
        let patients: Vec<Patient> = self
            .supabase
            .request(
                Method::GET,
                "/rest/v1/patients?order=last_name.asc",
                Some(auth_token),
                None,
            )
            .await?;
        Ok(patients)
    }

    pub async fn find_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Patient>, PatientError> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(result.into_iter().next())
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient {}", patient_id);
        self.find_patient(patient_id, auth_token)
            .await?
            .ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let mut patient = self.get_patient(patient_id, auth_token).await?;
        patient.update_information(request)?;

        let body = json!({
            "first_name": patient.first_name,
            "last_name": patient.last_name,
            "date_of_birth": patient.date_of_birth,
            "gender": patient.gender,
            "address": patient.address,
            "phone_number": patient.phone_number,
            "email": patient.email,
        });

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let updated: Vec<Patient> = self
            .supabase
            .write_returning(Method::PATCH, &path, auth_token, body)
            .await?;

        info!("Patient {} updated", patient_id);
        Ok(updated.into_iter().next().unwrap_or(patient))
    }

    pub async fn delete_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<(), PatientError> {
        self.get_patient(patient_id, auth_token).await?;

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        self.supabase
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await?;

        info!("Patient {} deleted", patient_id);
        Ok(())
    }
}
