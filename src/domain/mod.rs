//! Domain layer for the Convoy coordination core
//!
//! Pure models, the error taxonomy, and the ports adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
