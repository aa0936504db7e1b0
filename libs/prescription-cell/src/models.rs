use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use billing_cell::BillingError;
use doctor_cell::DoctorError;
use patient_cell::PatientError;
use shared_database::SupabaseError;
use shared_models::error::AppError;
use shared_utils::files::FileError;

pub const VAT_RATE: f64 = 1.2;

#[derive(Debug, Error)]
pub enum PrescriptionError {
    #[error("Prescription not found")]
    NotFound,

    #[error("Inventory not found for code {0}")]
    MedicineNotFound(String),

    #[error("Insufficient stock for {code}: {available} available, {requested} requested")]
    InsufficientStock {
        code: String,
        available: i32,
        requested: i32,
    },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Patient(#[from] PatientError),

    #[error(transparent)]
    Doctor(#[from] DoctorError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error(transparent)]
    Store(#[from] SupabaseError),
}

impl From<PrescriptionError> for AppError {
    fn from(err: PrescriptionError) -> Self {
        match err {
            PrescriptionError::NotFound | PrescriptionError::MedicineNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            PrescriptionError::InsufficientStock { .. } | PrescriptionError::Validation(_) => {
                AppError::ValidationError(err.to_string())
            }
            PrescriptionError::Conflict(msg) => AppError::Conflict(msg),
            PrescriptionError::File(e) => e.into(),
            PrescriptionError::Patient(e) => e.into(),
            PrescriptionError::Doctor(e) => e.into(),
            PrescriptionError::Billing(e) => e.into(),
            PrescriptionError::Store(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: Uuid,
    pub item_code: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub reorder_level: i32,
    pub last_restocked: Option<DateTime<Utc>>,
}

impl Inventory {
    pub fn needs_restock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    fn flag_low_stock(&self) {
        if self.needs_restock() {
            warn!(
                "Item {} needs restock: {} left, reorder level {}",
                self.item_code, self.quantity, self.reorder_level
            );
        }
    }

    pub fn restock(&mut self, amount: i32) -> Result<(), PrescriptionError> {
        if amount <= 0 {
            return Err(PrescriptionError::Validation(
                "Restock amount must be positive".to_string(),
            ));
        }
        self.quantity += amount;
        self.last_restocked = Some(Utc::now());
        self.flag_low_stock();
        Ok(())
    }

    pub fn decrement(&mut self, amount: i32) -> Result<(), PrescriptionError> {
        if amount <= 0 {
            return Err(PrescriptionError::Validation(
                "Decrement amount must be positive".to_string(),
            ));
        }
        if self.quantity - amount < 0 {
            return Err(PrescriptionError::InsufficientStock {
                code: self.item_code.clone(),
                available: self.quantity,
                requested: amount,
            });
        }
        self.quantity -= amount;
        self.flag_low_stock();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prescription {
    pub id: Uuid,
    pub prescription_number: String,
    pub patient_id: Uuid,
    pub medicine_codes: Vec<String>,
    pub notes: Option<String>,
    pub total_cost: f64,
    pub is_billed: bool,
    pub inventory_updated: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Prescription {
    pub fn new(
        prescription_number: String,
        patient_id: Uuid,
        medicine_codes: Vec<String>,
        notes: Option<String>,
        total_cost: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            prescription_number,
            patient_id,
            medicine_codes,
            notes,
            total_cost,
            is_billed: false,
            inventory_updated: false,
            created_at: now,
            modified_at: now,
        }
    }
}

/// How many units of each medicine a list of codes takes from stock.
pub fn units_per_code(codes: &[String]) -> BTreeMap<&str, i32> {
    let mut units = BTreeMap::new();
    for code in codes {
        *units.entry(code.as_str()).or_insert(0) += 1;
    }
    units
}

pub fn prescription_number(epoch_millis: i64) -> String {
    format!("RX{}", epoch_millis)
}

pub fn cost_with_vat(unit_prices: impl IntoIterator<Item = f64>) -> f64 {
    unit_prices.into_iter().sum::<f64>() * VAT_RATE
}

/// One line of the prescription audit trail.
pub fn audit_line(at: DateTime<Utc>, prescription_number: &str) -> String {
    format!("{} - {}\n", at.to_rfc3339(), prescription_number)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPrescriptionRequest {
    pub patient_id: Uuid,
    pub medicine_codes: Vec<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn item(quantity: i32, reorder_level: i32) -> Inventory {
        Inventory {
            id: Uuid::new_v4(),
            item_code: "PARA500".into(),
            name: "Paracetamol".into(),
            quantity,
            unit_price: 2.5,
            reorder_level,
            last_restocked: None,
        }
    }

    #[test]
    fn decrement_refuses_to_go_negative() {
        let mut stock = item(1, 0);
        stock.decrement(1).unwrap();
        assert_eq!(stock.quantity, 0);

        assert_matches!(
            stock.decrement(1),
            Err(PrescriptionError::InsufficientStock { available: 0, requested: 1, .. })
        );
        assert_eq!(stock.quantity, 0);
    }

    #[test]
    fn amounts_must_be_positive() {
        let mut stock = item(5, 1);
        assert_matches!(stock.decrement(0), Err(PrescriptionError::Validation(_)));
        assert_matches!(stock.restock(-3), Err(PrescriptionError::Validation(_)));
        assert_eq!(stock.quantity, 5);
    }

    #[test]
    fn restock_records_time() {
        let mut stock = item(2, 5);
        stock.restock(10).unwrap();
        assert_eq!(stock.quantity, 12);
        assert!(stock.last_restocked.is_some());
        assert!(!stock.needs_restock());
    }

    #[test]
    fn reorder_level_is_inclusive() {
        assert!(item(5, 5).needs_restock());
        assert!(!item(6, 5).needs_restock());
    }

    #[test]
    fn repeated_codes_take_several_units() {
        let codes = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        let units = units_per_code(&codes);
        assert_eq!(units.get("A"), Some(&2));
        assert_eq!(units.get("B"), Some(&1));
    }

    #[test]
    fn vat_is_twenty_percent() {
        assert!((cost_with_vat([10.0, 5.0]) - 18.0).abs() < 1e-9);
        assert_eq!(cost_with_vat(Vec::new()), 0.0);
    }

    #[test]
    fn audit_line_names_prescription() {
        let at = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(audit_line(at, "RX1"), "2024-03-01T10:00:00+00:00 - RX1\n");
        assert_eq!(prescription_number(42), "RX42");
    }
}
