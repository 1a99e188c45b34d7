//! Local adapters for single-host deployment.

pub mod fs;

pub use fs::FsDelivery;
