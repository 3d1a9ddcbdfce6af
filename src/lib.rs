//! `valet-series` library crate.
//!
//! The binary (`valet`) is a thin wrapper around this library so that:
//!
//! - the ingestion pipeline is testable without spawning processes or touching the network
//! - the catalog client, previews and export are reusable from other front-ends

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod plot;
pub mod report;
