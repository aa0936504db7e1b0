use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupabaseClient;

use crate::models::{CreateInsuranceRequest, Insurance, PatientError};
use crate::services::PatientService;

pub struct InsuranceService {
    supabase: SupabaseClient,
    patients: PatientService,
}

impl InsuranceService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
        }
    }

    pub async fn add_insurance(
        &self,
        patient_id: Uuid,
        request: CreateInsuranceRequest,
        auth_token: &str,
    ) -> Result<Insurance, PatientError> {
        self.patients.get_patient(patient_id, auth_token).await?;
        let policy = Insurance::new(patient_id, request)?;

        let created: Vec<Insurance> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/insurance", auth_token, json!(policy))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    PatientError::Validation(format!(
                        "Policy number {} already exists",
                        policy.policy_number
                    ))
                } else {
                    PatientError::Store(e)
                }
            })?;

        info!("Policy {} registered for patient {}", policy.policy_number, patient_id);
        Ok(created.into_iter().next().unwrap_or(policy))
    }

    pub async fn policies_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Insurance>, PatientError> {
        let path = format!("/rest/v1/insurance?patient_id=eq.{}", patient_id);
        let policies: Vec<Insurance> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(policies)
    }

    pub async fn get_policy(&self, policy_number: &str, auth_token: &str) -> Result<Insurance, PatientError> {
        debug!("Fetching insurance policy {}", policy_number);
        let path = format!(
            "/rest/v1/insurance?policy_number=eq.{}",
            urlencoding::encode(policy_number)
        );
        let policies: Vec<Insurance> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        policies
            .into_iter()
            .next()
            .ok_or(PatientError::InsuranceNotFound)
    }

    /// Coverage granted by a still-valid policy for `amount`.
    pub async fn coverage_for(
        &self,
        policy_number: &str,
        amount: f64,
        auth_token: &str,
    ) -> Result<f64, PatientError> {
        let policy = self.get_policy(policy_number, auth_token).await?;

        if !policy.is_valid() {
            return Err(PatientError::Validation(format!(
                "Insurance policy {} expired on {}",
                policy.policy_number, policy.expiry_date
            )));
        }

        Ok(policy.calculate_coverage(amount))
    }
}
