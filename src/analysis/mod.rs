//! Analysis modules.
//!
//! Aggregation of manifests and landfill tickets into chart series and
//! report rows.

pub mod aggregator;
pub mod landfill;

pub use aggregator::*;
pub use landfill::*;
