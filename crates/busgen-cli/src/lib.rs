//! Library interface for the busgen command

pub mod config;
pub mod pipeline;

pub use config::{Config, ProbeConfig};
pub use pipeline::{relative_to, write_proxies, Orchestrator, RunReport, UnitReport};
