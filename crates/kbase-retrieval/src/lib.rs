pub mod lifecycle;
pub mod retriever;
pub mod state;

pub use lifecycle::{load_resources, IntegrityReport};
pub use retriever::Retriever;
pub use state::{AppState, HealthReport, HealthStatus};
