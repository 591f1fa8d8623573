//! Data models and structures for the network strength tester

pub mod config;
pub mod result;

// Re-export main model types
pub use config::Config;
pub use result::{MeasurementResult, ProbeOutcome, ProbeSample};
