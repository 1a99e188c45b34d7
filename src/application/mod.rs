//! Application layer - Services that drive the ports.

pub mod events;
pub mod key_service;
pub mod orchestrator;
pub mod pipeline;
pub mod planner;
pub mod retry;
