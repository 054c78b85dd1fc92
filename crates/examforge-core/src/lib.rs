//! examforge-core: exam composition engine, ports, and allocation.
//!
//! This crate defines the exam data model, the storage/catalog ports the
//! engine talks to, and the composition logic that assembles exams from a
//! question bank either manually or from type/difficulty quotas.

pub mod allocation;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod model;
pub mod parser;
pub mod random;
pub mod request;
pub mod traits;
pub mod validation;

pub use engine::{CompositionEngine, EngineConfig};
pub use error::{CompositionError, ErrorKind, ValidationFailure};
