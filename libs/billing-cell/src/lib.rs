pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Bill, BillDetail, Billable, BillingError, MedicalAct, PRESCRIPTION_PREFIX};
pub use services::{BillSecurity, BillingService};
