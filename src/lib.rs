//! Keyslice - records a time range of a key-rotating encrypted DASH channel
//! into one playable file.
//!
//! Hexagonal Architecture:
//! - domain/: Pure types and planning arithmetic (ranges, segments, jobs)
//! - ports/: Trait definitions for key lookup, download, media tools, delivery
//! - adapters/: Concrete implementations (HTTP, external processes, local fs)
//! - application/: Planner, segment pipeline and job orchestrator
//! - config: Environment configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

pub use config::RecorderConfig;
pub use error::{JobFailure, RecorderError};
