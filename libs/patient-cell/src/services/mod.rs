pub mod history;
pub mod insurance;
pub mod patient;

pub use history::HistoryService;
pub use insurance::InsuranceService;
pub use patient::PatientService;
