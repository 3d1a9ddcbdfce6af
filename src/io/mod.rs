//! Input/output helpers.
//!
//! - raw record cleaning + normalization (`ingest`)
//! - multi-series alignment (`align`)
//! - CSV export / read-back (`export`)

pub mod align;
pub mod export;
pub mod ingest;

pub use align::*;
pub use export::*;
pub use ingest::*;
