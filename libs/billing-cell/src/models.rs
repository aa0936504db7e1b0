use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use doctor_cell::DoctorError;
use patient_cell::PatientError;
use shared_database::SupabaseError;
use shared_models::error::AppError;
use shared_utils::files::FileError;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_RECALC: &str = "RECALC";
pub const STATUS_PAID: &str = "PAID";

/// Treatment names with this prefix refer to a prescription number.
pub const PRESCRIPTION_PREFIX: &str = "PRESCRIPTION_";

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Treatment not found: {0}")]
    TreatmentNotFound(String),

    #[error("Prescription not found: {0}")]
    PrescriptionNotFound(String),

    #[error("At least one treatment is required")]
    NoTreatments,

    #[error("Bill not found")]
    BillNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Bill integrity error: {0}")]
    Integrity(String),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Store(#[from] SupabaseError),
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        match err {
            BillingError::TreatmentNotFound(_)
            | BillingError::PrescriptionNotFound(_)
            | BillingError::BillNotFound => AppError::NotFound(err.to_string()),
            BillingError::NoTreatments | BillingError::Validation(_) => {
                AppError::ValidationError(err.to_string())
            }
            BillingError::Integrity(_) => AppError::Internal(err.to_string()),
            BillingError::File(e) => e.into(),
            BillingError::Patient(e) => e.into(),
            BillingError::Doctor(e) => e.into(),
            BillingError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalAct {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
}

/// The billing columns of a prescription row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PrescriptionCharge {
    pub prescription_number: String,
    pub total_cost: f64,
}

/// Anything that can appear as a line on a bill.
#[derive(Debug, Clone, PartialEq)]
pub enum Billable {
    MedicalAct { name: String, price: f64 },
    Prescription { number: String, cost: f64 },
}

impl Billable {
    pub fn label(&self) -> String {
        match self {
            Billable::MedicalAct { name, .. } => name.clone(),
            Billable::Prescription { number, .. } => format!("{}{}", PRESCRIPTION_PREFIX, number),
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Billable::MedicalAct { price, .. } => *price,
            Billable::Prescription { cost, .. } => *cost,
        }
    }
}

impl From<MedicalAct> for Billable {
    fn from(act: MedicalAct) -> Self {
        Billable::MedicalAct {
            name: act.name,
            price: act.price,
        }
    }
}

impl From<PrescriptionCharge> for Billable {
    fn from(charge: PrescriptionCharge) -> Self {
        Billable::Prescription {
            number: charge.prescription_number,
            cost: charge.total_cost,
        }
    }
}

/// How a requested treatment name should be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillableRef<'a> {
    MedicalAct(&'a str),
    Prescription(&'a str),
}

impl<'a> BillableRef<'a> {
    pub fn parse(treatment: &'a str) -> Self {
        match treatment.strip_prefix(PRESCRIPTION_PREFIX) {
            Some(number) => BillableRef::Prescription(number),
            None => BillableRef::MedicalAct(treatment),
        }
    }
}

/// Rounds half away from zero to whole cents.
pub fn to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillDetail {
    pub id: Uuid,
    pub bill_id: Uuid,
    pub treatment_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit_price: f64,
    pub line_total: f64,
}

impl BillDetail {
    pub fn for_item(bill_id: Uuid, item: &Billable) -> Self {
        Self::new(bill_id, item.label(), 1, item.amount())
    }

    pub fn new(bill_id: Uuid, treatment_name: String, quantity: i32, unit_price: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            bill_id,
            treatment_name,
            quantity,
            unit_price,
            line_total: to_cents(f64::from(quantity) * unit_price),
        }
    }

    pub fn reprice(&mut self, unit_price: f64) {
        self.unit_price = unit_price;
        self.line_total = to_cents(f64::from(self.quantity) * unit_price);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Uuid,
    pub bill_number: String,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub bill_date: DateTime<Utc>,
    pub total_amount: f64,
    pub status: String,
    pub integrity_hash: Option<String>,
    pub integrity_salt: Option<String>,
    #[serde(default)]
    pub bill_details: Vec<BillDetail>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBillQuery {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    #[serde(default)]
    pub treatments: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceQuery {
    pub treatment: String,
    pub price: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsuranceQuery {
    pub amount: f64,
    pub policy_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_selects_prescription_lookup() {
        assert_eq!(BillableRef::parse("PRESCRIPTION_RX42"), BillableRef::Prescription("RX42"));
        assert_eq!(BillableRef::parse("XRAY"), BillableRef::MedicalAct("XRAY"));
        assert_eq!(BillableRef::parse("prescription_RX1"), BillableRef::MedicalAct("prescription_RX1"));
    }

    #[test]
    fn billable_labels_round_trip_through_prefix() {
        let item = Billable::from(PrescriptionCharge {
            prescription_number: "RX7".into(),
            total_cost: 12.5,
        });
        assert_eq!(item.label(), "PRESCRIPTION_RX7");
        assert_eq!(BillableRef::parse(&item.label()), BillableRef::Prescription("RX7"));
        assert_eq!(item.amount(), 12.5);
    }

    #[test]
    fn detail_line_total_follows_quantity() {
        let mut detail = BillDetail::new(Uuid::new_v4(), "CONSULTATION".into(), 3, 40.0);
        assert_eq!(detail.line_total, 120.0);

        detail.reprice(50.0);
        assert_eq!(detail.line_total, 150.0);
    }

    #[test]
    fn missing_quantity_defaults_to_one() {
        let detail: BillDetail = serde_json::from_value(serde_json::json!({
            "id": Uuid::new_v4(),
            "bill_id": Uuid::new_v4(),
            "treatment_name": "XRAY",
            "unit_price": 80.0,
            "line_total": 80.0
        }))
        .unwrap();
        assert_eq!(detail.quantity, 1);
    }
}
