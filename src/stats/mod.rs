//! Display counters for plumbing instances

pub mod metrics;

pub use metrics::{PlumbingCounters, PlumbingStats};
