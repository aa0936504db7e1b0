pub mod inventory;
pub mod prescription;

pub use inventory::InventoryService;
pub use prescription::{IssuedPrescription, PrescriptionService};
