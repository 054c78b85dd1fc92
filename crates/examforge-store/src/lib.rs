//! examforge-store: store adapters for the composition engine.
//!
//! Implements the catalog and exam store ports in memory, persists exam
//! state as a JSON snapshot between runs, and loads the examforge
//! configuration file.

pub mod config;
pub mod memory;
pub mod snapshot;

pub use config::{load_config, load_config_from, ExamforgeConfig};
pub use memory::{MemoryCatalog, MemoryExamQuestionStore, MemoryExamStore};
pub use snapshot::Snapshot;
