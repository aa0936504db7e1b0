use std::path::PathBuf;

use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use billing_cell::{Bill, BillingService, PRESCRIPTION_PREFIX};
use doctor_cell::DoctorService;
use patient_cell::PatientService;
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::files::{FileHandler, FileRoot};

use crate::models::{
    audit_line, cost_with_vat, prescription_number, units_per_code, AddPrescriptionRequest,
    Inventory, Prescription, PrescriptionError,
};
use crate::services::InventoryService;

/// Result of registering a prescription.
#[derive(Debug, Clone)]
pub struct IssuedPrescription {
    pub prescription: Prescription,
    pub bill_number: Option<String>,
}

pub struct PrescriptionService {
    supabase: SupabaseClient,
    inventory: InventoryService,
    patients: PatientService,
    doctors: DoctorService,
    billing: BillingService,
    audit_file: PathBuf,
    system_doctor_number: String,
}

impl PrescriptionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            inventory: InventoryService::new(config),
            patients: PatientService::new(config),
            doctors: DoctorService::new(config),
            billing: BillingService::new(config),
            audit_file: config.prescription_audit_file.clone(),
            system_doctor_number: config.system_doctor_number.clone(),
        }
    }

    pub async fn add_prescription(
        &self,
        request: AddPrescriptionRequest,
        auth_token: &str,
    ) -> Result<IssuedPrescription, PrescriptionError> {
        debug!(
            "Adding prescription for patient {} with {} medicines",
            request.patient_id,
            request.medicine_codes.len()
        );

        if request.medicine_codes.is_empty() {
            return Err(PrescriptionError::Validation(
                "At least one medicine code is required".to_string(),
            ));
        }

        let mut picked: Vec<(Inventory, i32)> = Vec::new();
        for (code, units) in units_per_code(&request.medicine_codes) {
            let item = self.inventory.get_item(code, auth_token).await?;
            item.clone().decrement(units)?;
            picked.push((item, units));
        }

        self.patients.get_patient(request.patient_id, auth_token).await?;

        let total_cost: f64 = picked
            .iter()
            .map(|(item, units)| item.unit_price * f64::from(*units))
            .sum();

        let taken = self.take_stock(&picked, auth_token).await?;

        let mut prescription = Prescription::new(
            prescription_number(Utc::now().timestamp_millis()),
            request.patient_id,
            request.medicine_codes,
            request.notes,
            total_cost,
        );
        prescription.inventory_updated = true;

        let bill_number = match self.record(&mut prescription, auth_token).await {
            Ok(bill_number) => bill_number,
            Err(e) => {
                self.return_stock(&taken, auth_token).await;
                return Err(e);
            }
        };

        info!(
            "Prescription {} issued for patient {} costing {:.2}",
            prescription.prescription_number, prescription.patient_id, prescription.total_cost
        );
        Ok(IssuedPrescription {
            prescription,
            bill_number,
        })
    }

    /// Decrements every picked item, putting back what was taken if one of them fails.
    async fn take_stock(
        &self,
        picked: &[(Inventory, i32)],
        auth_token: &str,
    ) -> Result<Vec<(Inventory, i32)>, PrescriptionError> {
        let mut taken = Vec::with_capacity(picked.len());
        for (item, units) in picked {
            match self.inventory.decrement_stock(item, *units, auth_token).await {
                Ok(remaining) => taken.push((remaining, *units)),
                Err(e) => {
                    self.return_stock(&taken, auth_token).await;
                    return Err(e);
                }
            }
        }
        Ok(taken)
    }

    async fn return_stock(&self, taken: &[(Inventory, i32)], auth_token: &str) {
        for (item, units) in taken {
            if let Err(e) = self.inventory.restock_stock(item, *units, auth_token).await {
                warn!("Failed to return {} units of {}: {}", units, item.item_code, e);
            }
        }
    }

    /// Stores the prescription, bills it and appends the audit line.
    async fn record(
        &self,
        prescription: &mut Prescription,
        auth_token: &str,
    ) -> Result<Option<String>, PrescriptionError> {
        self.supabase
            .execute(
                Method::POST,
                "/rest/v1/prescriptions",
                Some(auth_token),
                Some(json!(prescription)),
            )
            .await?;

        let bill = match self.bill(prescription, auth_token).await {
            Ok(bill) => bill,
            Err(e) => {
                self.withdraw(prescription, auth_token).await;
                return Err(e);
            }
        };

        if let Err(e) = self.audit(prescription).await {
            if let Some(bill) = &bill {
                self.billing.discard(bill, auth_token).await;
            }
            self.withdraw(prescription, auth_token).await;
            return Err(e);
        }

        prescription.is_billed = bill.is_some();
        prescription.modified_at = Utc::now();
        Ok(bill.map(|b| b.bill_number))
    }

    async fn bill(&self, prescription: &Prescription, auth_token: &str) -> Result<Option<Bill>, PrescriptionError> {
        match self
            .doctors
            .find_by_number(&self.system_doctor_number, auth_token)
            .await?
        {
            Some(doctor) => {
                let treatment = format!("{}{}", PRESCRIPTION_PREFIX, prescription.prescription_number);
                let bill = self
                    .billing
                    .process_bill(prescription.patient_id, doctor.id, &[treatment], auth_token)
                    .await?;
                Ok(Some(bill))
            }
            None => {
                warn!(
                    "No doctor numbered {}, prescription {} left unbilled",
                    self.system_doctor_number, prescription.prescription_number
                );
                Ok(None)
            }
        }
    }

    async fn audit(&self, prescription: &Prescription) -> Result<(), PrescriptionError> {
        let (root, name) = FileRoot::containing(&self.audit_file)?;
        FileHandler::append(
            &root.resolve(&name)?,
            &audit_line(Utc::now(), &prescription.prescription_number),
        )
        .await?;
        Ok(())
    }

    async fn withdraw(&self, prescription: &Prescription, auth_token: &str) {
        let path = format!(
            "/rest/v1/prescriptions?prescription_number=eq.{}",
            urlencoding::encode(&prescription.prescription_number)
        );
        if let Err(e) = self
            .supabase
            .execute(Method::DELETE, &path, Some(auth_token), None)
            .await
        {
            warn!("Failed to withdraw prescription {}: {}", prescription.prescription_number, e);
        }
    }

    pub async fn patient_prescriptions(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Prescription>, PrescriptionError> {
        self.patients.get_patient(patient_id, auth_token).await?;
        let path = format!(
            "/rest/v1/prescriptions?patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        let prescriptions: Vec<Prescription> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(prescriptions)
    }

    pub async fn get_prescription(
        &self,
        prescription_number: &str,
        auth_token: &str,
    ) -> Result<Prescription, PrescriptionError> {
        let path = format!(
            "/rest/v1/prescriptions?prescription_number=eq.{}",
            urlencoding::encode(prescription_number)
        );
        let prescriptions: Vec<Prescription> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        prescriptions
            .into_iter()
            .next()
            .ok_or(PrescriptionError::NotFound)
    }

    /// Cost including VAT, priced at today's inventory prices.
    pub async fn prescription_cost(
        &self,
        prescription_number: &str,
        auth_token: &str,
    ) -> Result<f64, PrescriptionError> {
        let prescription = self.get_prescription(prescription_number, auth_token).await?;

        let mut prices = Vec::with_capacity(prescription.medicine_codes.len());
        for code in &prescription.medicine_codes {
            prices.push(self.inventory.get_item(code, auth_token).await?.unit_price);
        }
        Ok(cost_with_vat(prices))
    }
}
