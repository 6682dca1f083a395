//! Resilient ingestion pipeline: turns untrusted stream messages into
//! validated, durably-stored order aggregates with at-least-once semantics.

pub mod pipeline;
pub mod retry;

pub use pipeline::IngestPipeline;
pub use retry::RetryPolicy;
