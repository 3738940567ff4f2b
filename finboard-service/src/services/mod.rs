pub mod aggregator;
pub mod database;
pub mod metrics;
pub mod recurring;
pub mod sync;

pub use aggregator::AggregatorClient;
pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use sync::SyncService;
