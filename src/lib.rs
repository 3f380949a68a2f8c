pub mod client;
pub mod columns;
pub mod config;
pub mod error;
pub mod extract;
pub mod numeric;
pub mod orchestrator;
pub mod table;
pub mod window;

pub use client::{classify_response, HttpQueryClient, QueryExecutor};
pub use config::EndpointContext;
pub use error::{MetricsError, Result};
pub use orchestrator::{fetch_metrics, fetch_metrics_with, fetch_metrics_with_deadline, ExtractionOutcome};
pub use table::{ColumnDef, Row, TableResult};
pub use window::Window;
