pub mod reading_queries;

pub use reading_queries::{recent_readings, store_stats, StoreStats};
