pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Insurance, Patient, PatientError, PatientHistory, PatientSummary};
pub use services::{HistoryService, InsuranceService, PatientService};
