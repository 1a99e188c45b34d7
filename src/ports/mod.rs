//! Ports - Trait definitions for every external collaborator.

pub mod delivery;
pub mod downloader;
pub mod key_lookup;
pub mod media;
