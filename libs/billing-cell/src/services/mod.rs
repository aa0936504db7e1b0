pub mod billing;
pub mod invoice;
pub mod security;

pub use billing::BillingService;
pub use security::{BillSeal, BillSecurity};
