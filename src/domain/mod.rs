//! Domain types (raw records, normalized series, aligned tables) and cadence detection.

pub mod frequency;
pub mod types;

pub use frequency::*;
pub use types::*;
