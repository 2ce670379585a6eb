//! Durable membership roster.
//!
//! One newline-delimited record per authorized principal
//! (`"<decimal-id> <token>"`), mirrored by an in-memory map that is the
//! authoritative read path. Adds append; removes compact the file through an
//! atomic rename.

pub mod store;

pub use store::RosterStore;
