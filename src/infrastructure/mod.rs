//! Infrastructure layer: hierarchy stores, loaders and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod loader;
pub mod memory;
pub mod traits;

pub use error::{InfraError, InfraResult};
pub use memory::InMemoryHierarchy;
