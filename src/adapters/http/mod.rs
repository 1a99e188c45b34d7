//! HTTP adapters: the outbound key-lookup client and the inbound job intake.

pub mod intake;
pub mod key_lookup;

pub use key_lookup::HttpKeyLookup;
