use std::sync::LazyLock;

use chrono::{NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::SupabaseError;
use shared_models::error::AppError;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]\d{9}$").expect("phone pattern compiles"));

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles"));

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Insurance policy not found")]
    InsuranceNotFound,

    #[error("Patient number {0} already exists")]
    DuplicateNumber(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] SupabaseError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound | PatientError::InsuranceNotFound => {
                AppError::NotFound(err.to_string())
            }
            PatientError::DuplicateNumber(_) | PatientError::Validation(_) => {
                AppError::ValidationError(err.to_string())
            }
            PatientError::Store(e) => e.into(),
        }
    }
}

fn validate_gender(gender: &str) -> Result<(), PatientError> {
    match gender {
        "H" | "F" => Ok(()),
        _ => Err(PatientError::Validation("Gender must be either 'H' or 'F'".into())),
    }
}

fn validate_phone(phone: &str) -> Result<(), PatientError> {
    if PHONE_PATTERN.is_match(phone) {
        Ok(())
    } else {
        Err(PatientError::Validation("Phone number must contain exactly 10 digits".into()))
    }
}

fn validate_email(email: &str) -> Result<(), PatientError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(PatientError::Validation("Invalid email format".into()))
    }
}

fn require(field: &str, value: &str) -> Result<(), PatientError> {
    if value.trim().is_empty() {
        Err(PatientError::Validation(format!("{} is required", field)))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub patient_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
}

impl Patient {
    pub fn builder() -> PatientBuilder {
        PatientBuilder::default()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Overwrites demographic fields. `id` and `patient_number` never change.
    pub fn update_information(&mut self, update: UpdatePatientRequest) -> Result<(), PatientError> {
        if let Some(gender) = &update.gender {
            validate_gender(gender)?;
        }
        if let Some(phone) = &update.phone_number {
            validate_phone(phone)?;
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(first_name) = &update.first_name {
            require("first_name", first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            require("last_name", last_name)?;
        }

        if let Some(v) = update.first_name {
            self.first_name = v;
        }
        if let Some(v) = update.last_name {
            self.last_name = v;
        }
        if let Some(v) = update.date_of_birth {
            self.date_of_birth = v;
        }
        if let Some(v) = update.gender {
            self.gender = v;
        }
        if let Some(v) = update.address {
            self.address = v;
        }
        if let Some(v) = update.phone_number {
            self.phone_number = v;
        }
        if let Some(v) = update.email {
            self.email = v;
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PatientBuilder {
    patient_number: String,
    first_name: String,
    last_name: String,
    date_of_birth: Option<NaiveDate>,
    gender: String,
    address: String,
    phone_number: String,
    email: String,
}

impl PatientBuilder {
    pub fn patient_number(mut self, value: impl Into<String>) -> Self {
        self.patient_number = value.into();
        self
    }

    pub fn first_name(mut self, value: impl Into<String>) -> Self {
        self.first_name = value.into();
        self
    }

    pub fn last_name(mut self, value: impl Into<String>) -> Self {
        self.last_name = value.into();
        self
    }

    pub fn date_of_birth(mut self, value: NaiveDate) -> Self {
        self.date_of_birth = Some(value);
        self
    }

    pub fn gender(mut self, value: impl Into<String>) -> Self {
        self.gender = value.into();
        self
    }

    pub fn address(mut self, value: impl Into<String>) -> Self {
        self.address = value.into();
        self
    }

    pub fn phone_number(mut self, value: impl Into<String>) -> Self {
        self.phone_number = value.into();
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.email = value.into();
        self
    }

    pub fn build(self) -> Result<Patient, PatientError> {
        require("patient_number", &self.patient_number)?;
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        validate_gender(&self.gender)?;
        validate_phone(&self.phone_number)?;
        validate_email(&self.email)?;

        let date_of_birth = self
            .date_of_birth
            .ok_or_else(|| PatientError::Validation("date_of_birth is required".into()))?;

        Ok(Patient {
            id: Uuid::new_v4(),
            patient_number: self.patient_number,
            first_name: self.first_name,
            last_name: self.last_name,
            date_of_birth,
            gender: self.gender,
            address: self.address,
            phone_number: self.phone_number,
            email: self.email,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub patient_number: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    #[serde(default)]
    pub address: String,
    pub phone_number: String,
    pub email: String,
}

impl CreatePatientRequest {
    pub fn into_patient(self) -> Result<Patient, PatientError> {
        Patient::builder()
            .patient_number(self.patient_number)
            .first_name(self.first_name)
            .last_name(self.last_name)
            .date_of_birth(self.date_of_birth)
            .gender(self.gender)
            .address(self.address)
            .phone_number(self.phone_number)
            .email(self.email)
            .build()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatientRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insurance {
    pub id: Uuid,
    pub policy_number: String,
    pub patient_id: Uuid,
    pub provider: String,
    pub coverage_percentage: f64,
    pub max_coverage: f64,
    pub expiry_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInsuranceRequest {
    pub policy_number: String,
    pub provider: String,
    pub coverage_percentage: f64,
    pub max_coverage: f64,
    pub expiry_date: NaiveDate,
}

impl Insurance {
    pub fn new(patient_id: Uuid, request: CreateInsuranceRequest) -> Result<Self, PatientError> {
        require("policy_number", &request.policy_number)?;

        if request.coverage_percentage < 0.0 {
            return Err(PatientError::Validation(
                "Coverage percentage cannot be negative".into(),
            ));
        }
        if request.max_coverage < 0.0 {
            return Err(PatientError::Validation("Max coverage cannot be negative".into()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            policy_number: request.policy_number,
            patient_id,
            provider: request.provider,
            coverage_percentage: request.coverage_percentage,
            max_coverage: request.max_coverage,
            expiry_date: request.expiry_date,
        })
    }

    pub fn calculate_coverage(&self, bill_amount: f64) -> f64 {
        (bill_amount * self.coverage_percentage / 100.0).min(self.max_coverage)
    }

    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        date < self.expiry_date
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_on(Utc::now().date_naive())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientHistory {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub visit_date: NaiveDate,
    pub diagnosis: String,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHistoryRequest {
    pub patient_id: Uuid,
    pub visit_date: NaiveDate,
    pub diagnosis: String,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySearchQuery {
    pub keyword: Option<String>,
    pub patient_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub patient_id: Uuid,
    pub visit_count: usize,
    pub total_billed: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn valid_builder() -> PatientBuilder {
        Patient::builder()
            .patient_number("P-001")
            .first_name("Jane")
            .last_name("Doe")
            .date_of_birth(NaiveDate::from_ymd_opt(1985, 4, 12).unwrap())
            .gender("F")
            .address("12 Harbour Road")
            .phone_number("0612345678")
            .email("jane.doe@example.com")
    }

    fn policy(pct: f64, max: f64) -> Insurance {
        Insurance::new(
            Uuid::new_v4(),
            CreateInsuranceRequest {
                policy_number: "POL-1".into(),
                provider: "Mutual Health".into(),
                coverage_percentage: pct,
                max_coverage: max,
                expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            },
        )
        .unwrap()
    }

    #[test]
    fn builder_accepts_valid_patient() {
        let patient = valid_builder().build().unwrap();
        assert_eq!(patient.full_name(), "Jane Doe");
    }

    #[test]
    fn gender_must_be_h_or_f() {
        assert_matches!(valid_builder().gender("M").build(), Err(PatientError::Validation(_)));
        assert!(valid_builder().gender("H").build().is_ok());
    }

    #[test]
    fn phone_must_have_ten_digits() {
        assert_matches!(valid_builder().phone_number("061234567").build(), Err(PatientError::Validation(_)));
        assert_matches!(valid_builder().phone_number("06123456789").build(), Err(PatientError::Validation(_)));
        assert_matches!(valid_builder().phone_number("06-1234567").build(), Err(PatientError::Validation(_)));
    }

    #[test]
    fn email_needs_domain_and_tld() {
        assert_matches!(valid_builder().email("jane.doe").build(), Err(PatientError::Validation(_)));
        assert_matches!(valid_builder().email("jane@localhost").build(), Err(PatientError::Validation(_)));
    }

    #[test]
    fn update_keeps_identity_fields() {
        let mut patient = valid_builder().build().unwrap();
        let id = patient.id;

        patient
            .update_information(UpdatePatientRequest {
                address: Some("1 New Street".into()),
                phone_number: Some("0700000000".into()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(patient.id, id);
        assert_eq!(patient.patient_number, "P-001");
        assert_eq!(patient.address, "1 New Street");
    }

    #[test]
    fn invalid_update_leaves_patient_untouched() {
        let mut patient = valid_builder().build().unwrap();
        let before = patient.clone();

        let result = patient.update_information(UpdatePatientRequest {
            address: Some("elsewhere".into()),
            gender: Some("X".into()),
            ..Default::default()
        });

        assert!(result.is_err());
        assert_eq!(patient, before);
    }

    #[test]
    fn coverage_is_capped_by_max() {
        assert_eq!(policy(90.0, 200.0).calculate_coverage(1000.0), 200.0);
        assert_eq!(policy(80.0, 1000.0).calculate_coverage(1000.0), 800.0);
    }

    #[test]
    fn negative_terms_are_rejected() {
        let request = |pct, max| CreateInsuranceRequest {
            policy_number: "POL-2".into(),
            provider: "Mutual Health".into(),
            coverage_percentage: pct,
            max_coverage: max,
            expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        };

        assert_matches!(Insurance::new(Uuid::new_v4(), request(-1.0, 100.0)), Err(PatientError::Validation(_)));
        assert_matches!(Insurance::new(Uuid::new_v4(), request(50.0, -100.0)), Err(PatientError::Validation(_)));
    }

    #[test]
    fn policy_expires_on_expiry_date() {
        let policy = policy(50.0, 100.0);
        assert!(policy.is_valid_on(NaiveDate::from_ymd_opt(2029, 12, 31).unwrap()));
        assert!(!policy.is_valid_on(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()));
    }
}
