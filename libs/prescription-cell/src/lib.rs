pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{Inventory, Prescription, PrescriptionError};
pub use services::{InventoryService, PrescriptionService};
