use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::DoctorService;
use patient_cell::{InsuranceService, PatientService};
use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_mailer::{EmailService, EmailSource};
use shared_utils::files::{FileError, FileHandler, FileRoot};

use crate::models::{
    Bill, BillDetail, Billable, BillableRef, BillingError, MedicalAct, PrescriptionCharge,
    STATUS_PAID, STATUS_PENDING,
};
use crate::services::invoice::{calculate_total, render_bill, reprice_bill};
use crate::services::security::{BillSeal, BillSecurity};

#[derive(Debug, Deserialize)]
struct BillTotal {
    total_amount: f64,
}

#[derive(Debug, Deserialize)]
struct BillId {
    id: Uuid,
}

pub fn bill_number(epoch_millis: i64) -> String {
    format!("BILL{}", epoch_millis)
}

/// How many following milliseconds are tried when a bill number is already on disk.
const BILL_NUMBER_ATTEMPTS: i64 = 8;

pub struct BillingService {
    supabase: SupabaseClient,
    patients: PatientService,
    doctors: DoctorService,
    insurance: InsuranceService,
    mailer: EmailService,
    security: BillSecurity,
    bills_directory: PathBuf,
}

impl BillingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            patients: PatientService::new(config),
            doctors: DoctorService::new(config),
            insurance: InsuranceService::new(config),
            mailer: EmailService::new(config),
            security: BillSecurity::new(&config.billing_hash_secret),
            bills_directory: config.bills_directory.clone(),
        }
    }

    /// Swaps the hashing parameters, mostly so tests stay fast.
    pub fn with_security(mut self, security: BillSecurity) -> Self {
        self.security = security;
        self
    }

    /// Location of a bill file, kept inside the bills directory.
    pub fn bill_path(&self, bill_number: &str) -> Result<PathBuf, BillingError> {
        let root = FileRoot::open(&self.bills_directory)?;
        Ok(root.resolve(&format!("{}.txt", bill_number))?)
    }

    async fn find_medical_act(&self, name: &str, auth_token: &str) -> Result<Option<MedicalAct>, BillingError> {
        let path = format!("/rest/v1/medical_acts?name=eq.{}", urlencoding::encode(name));
        let acts: Vec<MedicalAct> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(acts.into_iter().next())
    }

    async fn resolve(&self, treatment: &str, auth_token: &str) -> Result<Billable, BillingError> {
        match BillableRef::parse(treatment) {
            BillableRef::MedicalAct(name) => self
                .find_medical_act(name, auth_token)
                .await?
                .map(Billable::from)
                .ok_or_else(|| BillingError::TreatmentNotFound(name.to_string())),
            BillableRef::Prescription(number) => {
                let path = format!(
                    "/rest/v1/prescriptions?prescription_number=eq.{}&select=prescription_number,total_cost",
                    urlencoding::encode(number)
                );
                let charges: Vec<PrescriptionCharge> = self
                    .supabase
                    .request(Method::GET, &path, Some(auth_token), None)
                    .await?;
                charges
                    .into_iter()
                    .next()
                    .map(Billable::from)
                    .ok_or_else(|| BillingError::PrescriptionNotFound(number.to_string()))
            }
        }
    }

    pub async fn process_bill(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        treatments: &[String],
        auth_token: &str,
    ) -> Result<Bill, BillingError> {
        debug!("Processing bill for patient {} with doctor {}", patient_id, doctor_id);

        self.patients.get_patient(patient_id, auth_token).await?;
        self.doctors.get_doctor(doctor_id, auth_token).await?;

        if treatments.is_empty() {
            return Err(BillingError::NoTreatments);
        }

        let mut items = Vec::with_capacity(treatments.len());
        for treatment in treatments {
            items.push(self.resolve(treatment, auth_token).await?);
        }

        let bill_id = Uuid::new_v4();
        let details: Vec<BillDetail> = items
            .iter()
            .map(|item| BillDetail::for_item(bill_id, item))
            .collect();

        let bill_date = Utc::now();
        let mut bill = Bill {
            id: bill_id,
            bill_number: bill_number(bill_date.timestamp_millis()),
            patient_id,
            doctor_id,
            bill_date,
            total_amount: calculate_total(&details),
            status: STATUS_PENDING.to_string(),
            integrity_hash: None,
            integrity_salt: None,
            bill_details: details,
        };

        let content = self.file_bill(&mut bill).await?;

        let seal = match self.security.seal(&content) {
            Ok(seal) => seal,
            Err(e) => {
                self.remove_bill_file(&bill.bill_number).await;
                return Err(e);
            }
        };
        bill.integrity_hash = Some(seal.hash);
        bill.integrity_salt = Some(seal.salt);

        let mut row = json!(bill);
        if let Some(fields) = row.as_object_mut() {
            fields.remove("bill_details");
        }
        if let Err(e) = self
            .supabase
            .execute(Method::POST, "/rest/v1/bills", Some(auth_token), Some(row))
            .await
        {
            self.remove_bill_file(&bill.bill_number).await;
            return Err(e.into());
        }

        if let Err(e) = self.store_lines(&bill, &items, auth_token).await {
            self.discard(&bill, auth_token).await;
            return Err(e);
        }

        self.mailer
            .send_to(
                EmailSource::Admin,
                "New Bill Generated",
                &format!("Bill Number: {}\nTotal: ${:.2}", bill.bill_number, bill.total_amount),
            )
            .await;

        info!(
            "Bill {} issued for patient {} with total {:.2}",
            bill.bill_number, patient_id, bill.total_amount
        );
        Ok(bill)
    }

    /// Writes the bill file under the first free bill number from the bill date on.
    async fn file_bill(&self, bill: &mut Bill) -> Result<String, BillingError> {
        let issued = bill.bill_date.timestamp_millis();
        let mut last_taken = None;

        for offset in 0..BILL_NUMBER_ATTEMPTS {
            bill.bill_number = bill_number(issued + offset);
            let content = render_bill(bill);
            match FileHandler::write_new(&self.bill_path(&bill.bill_number)?, &content).await {
                Ok(()) => return Ok(content),
                Err(FileError::AlreadyExists(path)) => {
                    debug!("Bill file {} already taken", path.display());
                    last_taken = Some(path);
                }
                Err(e) => return Err(e.into()),
            }
        }

        let path = last_taken.unwrap_or_else(|| self.bills_directory.clone());
        Err(FileError::AlreadyExists(path).into())
    }

    async fn store_lines(&self, bill: &Bill, items: &[Billable], auth_token: &str) -> Result<(), BillingError> {
        self.supabase
            .execute(
                Method::POST,
                "/rest/v1/bill_details",
                Some(auth_token),
                Some(json!(bill.bill_details)),
            )
            .await?;

        for item in items {
            if let Billable::Prescription { number, .. } = item {
                self.flag_prescription(number, true, auth_token).await?;
            }
        }
        Ok(())
    }

    async fn flag_prescription(&self, number: &str, billed: bool, auth_token: &str) -> Result<(), BillingError> {
        let path = format!(
            "/rest/v1/prescriptions?prescription_number=eq.{}",
            urlencoding::encode(number)
        );
        self.supabase
            .execute(Method::PATCH, &path, Some(auth_token), Some(json!({ "is_billed": billed })))
            .await?;
        Ok(())
    }

    async fn remove_bill_file(&self, bill_number: &str) {
        let removed = match self.bill_path(bill_number) {
            Ok(path) => FileHandler::remove(&path).await.map_err(BillingError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            warn!("Failed to remove file of bill {}: {}", bill_number, e);
        }
    }

    /// Withdraws a bill that was issued as part of a failed operation.
    pub async fn discard(&self, bill: &Bill, auth_token: &str) {
        for detail in &bill.bill_details {
            if let BillableRef::Prescription(number) = BillableRef::parse(&detail.treatment_name) {
                if let Err(e) = self.flag_prescription(number, false, auth_token).await {
                    warn!("Failed to unflag prescription {}: {}", number, e);
                }
            }
        }

        let details_path = format!("/rest/v1/bill_details?bill_id=eq.{}", bill.id);
        if let Err(e) = self
            .supabase
            .execute(Method::DELETE, &details_path, Some(auth_token), None)
            .await
        {
            warn!("Failed to delete lines of bill {}: {}", bill.bill_number, e);
        }

        let bill_path = format!("/rest/v1/bills?id=eq.{}", bill.id);
        if let Err(e) = self
            .supabase
            .execute(Method::DELETE, &bill_path, Some(auth_token), None)
            .await
        {
            warn!("Failed to delete bill {}: {}", bill.bill_number, e);
        }

        self.remove_bill_file(&bill.bill_number).await;
        warn!("Bill {} discarded", bill.bill_number);
    }

    pub async fn add_medical_act(
        &self,
        name: &str,
        price: f64,
        auth_token: &str,
    ) -> Result<MedicalAct, BillingError> {
        if name.trim().is_empty() {
            return Err(BillingError::Validation("Treatment name is required".to_string()));
        }
        if price < 0.0 {
            return Err(BillingError::Validation("Price cannot be negative".to_string()));
        }

        let act = MedicalAct {
            id: Uuid::new_v4(),
            name: name.to_string(),
            price,
        };

        let created: Vec<MedicalAct> = self
            .supabase
            .write_returning(Method::POST, "/rest/v1/medical_acts", auth_token, json!(act))
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    BillingError::Validation(format!("Treatment {} already exists", name))
                } else {
                    BillingError::Store(e)
                }
            })?;

        info!("Medical act {} added at {:.2}", name, price);
        Ok(created.into_iter().next().unwrap_or(act))
    }

    /// Sets a new catalog price and reprices pending bills. Returns how many bills changed.
    pub async fn update_price(&self, treatment: &str, price: f64, auth_token: &str) -> Result<usize, BillingError> {
        if price < 0.0 {
            return Err(BillingError::Validation("Price cannot be negative".to_string()));
        }

        let path = format!("/rest/v1/medical_acts?name=eq.{}", urlencoding::encode(treatment));
        let updated: Vec<MedicalAct> = self
            .supabase
            .write_returning(Method::PATCH, &path, auth_token, json!({ "price": price }))
            .await?;
        if updated.is_empty() {
            return Err(BillingError::TreatmentNotFound(treatment.to_string()));
        }

        let pending_path = format!(
            "/rest/v1/bills?status=eq.{}&select=*,bill_details(*)",
            STATUS_PENDING
        );
        let pending: Vec<Bill> = self
            .supabase
            .request(Method::GET, &pending_path, Some(auth_token), None)
            .await?;

        let mut recalculated = 0;
        for mut bill in pending {
            if !reprice_bill(&mut bill, treatment, price) {
                continue;
            }

            for detail in bill.bill_details.iter().filter(|d| d.treatment_name == treatment) {
                let detail_path = format!("/rest/v1/bill_details?id=eq.{}", detail.id);
                self.supabase
                    .execute(
                        Method::PATCH,
                        &detail_path,
                        Some(auth_token),
                        Some(json!({ "unit_price": detail.unit_price, "line_total": detail.line_total })),
                    )
                    .await?;
            }

            let bill_path = format!("/rest/v1/bills?id=eq.{}", bill.id);
            self.supabase
                .execute(
                    Method::PATCH,
                    &bill_path,
                    Some(auth_token),
                    Some(json!({ "total_amount": bill.total_amount, "status": bill.status })),
                )
                .await?;
            recalculated += 1;
        }

        info!("Price of {} set to {:.2}, {} pending bills recalculated", treatment, price, recalculated);
        Ok(recalculated)
    }

    pub async fn price_list(&self, auth_token: &str) -> Result<BTreeMap<String, f64>, BillingError> {
        let acts: Vec<MedicalAct> = self
            .supabase
            .request(Method::GET, "/rest/v1/medical_acts?order=name.asc", Some(auth_token), None)
            .await?;
        Ok(acts.into_iter().map(|act| (act.name, act.price)).collect())
    }

    pub async fn total_revenue(&self, auth_token: &str) -> Result<f64, BillingError> {
        let totals: Vec<BillTotal> = self
            .supabase
            .request(Method::GET, "/rest/v1/bills?select=total_amount", Some(auth_token), None)
            .await?;
        Ok(totals.iter().map(|t| t.total_amount).sum())
    }

    pub async fn pending_bill_ids(&self, auth_token: &str) -> Result<Vec<Uuid>, BillingError> {
        let path = format!("/rest/v1/bills?status=eq.{}&select=id", STATUS_PENDING);
        let ids: Vec<BillId> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(ids.into_iter().map(|b| b.id).collect())
    }

    pub async fn get_bill(&self, bill_number: &str, auth_token: &str) -> Result<Bill, BillingError> {
        let path = format!(
            "/rest/v1/bills?bill_number=eq.{}&select=*,bill_details(*)",
            urlencoding::encode(bill_number)
        );
        let bills: Vec<Bill> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        bills.into_iter().next().ok_or(BillingError::BillNotFound)
    }

    /// Re-reads the bill file and checks it against the stored seal.
    pub async fn verify_integrity(&self, bill_number: &str, auth_token: &str) -> Result<bool, BillingError> {
        let bill = self.get_bill(bill_number, auth_token).await?;

        let seal = match (bill.integrity_hash, bill.integrity_salt) {
            (Some(hash), Some(salt)) => BillSeal { hash, salt },
            _ => {
                warn!("Bill {} has no integrity data", bill_number);
                return Ok(false);
            }
        };

        let content = FileHandler::read(&self.bill_path(bill_number)?).await?;
        let valid = self.security.verify(&content, &seal);
        if !valid {
            warn!("Bill {} failed its integrity check", bill_number);
        }
        Ok(valid)
    }

    pub async fn mark_paid(&self, bill_number: &str, auth_token: &str) -> Result<Bill, BillingError> {
        let mut bill = self.get_bill(bill_number, auth_token).await?;

        let path = format!("/rest/v1/bills?id=eq.{}", bill.id);
        self.supabase
            .execute(Method::PATCH, &path, Some(auth_token), Some(json!({ "status": STATUS_PAID })))
            .await?;

        bill.status = STATUS_PAID.to_string();
        info!("Bill {} marked as paid", bill_number);
        Ok(bill)
    }

    /// Without a policy the amount is returned untouched.
    pub async fn insurance_coverage(
        &self,
        amount: f64,
        policy_number: Option<&str>,
        auth_token: &str,
    ) -> Result<f64, BillingError> {
        match policy_number {
            Some(policy) => Ok(self.insurance.coverage_for(policy, amount, auth_token).await?),
            None => Ok(amount),
        }
    }
}
