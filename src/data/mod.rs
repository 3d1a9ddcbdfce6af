//! Catalog data sources: the Valet HTTP API and an on-disk mirror.

pub mod local;
pub mod source;
pub mod valet;

pub use local::LocalSource;
pub use source::{GroupDetail, GroupSummary, SeriesSource, SeriesSummary, SourceError, visible_groups};
pub use valet::ValetClient;
