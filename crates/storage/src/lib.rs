//! Storage backends for signet documents.
//!
//! The `DocumentStore` trait is the only mutation path the engine uses;
//! `MemoryStore` is the reference backend, and the `conformance` module is
//! a backend-agnostic suite any other implementation can run.

pub mod conformance;
mod memory;
mod traits;

pub use memory::MemoryStore;
pub use traits::{Committed, DocumentChanged, DocumentStore};
