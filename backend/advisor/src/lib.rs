pub mod advisor;
pub mod prompt;
pub mod providers;

pub use advisor::{AdvisorSettings, MedicationAdvisor};
pub use providers::ProviderRegistry;
