pub mod carbon;
pub mod config;
pub mod export;
pub mod observability;
pub mod quality;
pub mod report;
pub mod store;

pub use carbon::{enrich, EnrichedReading, EMISSION_FACTOR};
pub use store::{ReadingStore, SystemStatus};
