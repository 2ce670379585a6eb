//! Shared types and the gateway-wide error taxonomy.

pub mod error;
pub mod types;

pub use {
    error::{Error, Result},
    types::PrincipalId,
};
