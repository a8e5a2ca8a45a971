//! The link catalog: title resolution, the registry that reconciles sightings
//! with stored rows, and the read-side views over it.

pub mod display;
pub mod library;
pub mod registry;
pub mod title;

#[cfg(test)]
pub mod stub;

pub use registry::{LinkRegistry, RecordOutcome, ScanSummary};
pub use title::{HttpTitleFetcher, ResolvedTitle, TitleFetcher, TitleResolver};
