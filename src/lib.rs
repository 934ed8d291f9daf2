//! # ormweld: ORM Artifact Compiler and Patcher
//!
//! ormweld turns freshly generated per-entity model classes and raw mapping
//! XML into the final framework-ready persistence tree: abstract base
//! classes, editable subclasses, repository stubs, canonical mapping XML,
//! and per-entity validation-constraint documents.
//!
//! ## Pipeline
//!
//! - **Pre-compile**: relocate generated classes under their
//!   namespace-derived directory and split each into an editable work
//!   subclass plus a repository stub.
//! - **Post-compile**: finalize the abstract base classes, compile the raw
//!   mapping XML through the canonicalizer, apply the configured namespace
//!   rename, and build the validation documents.
//! - **Patch**: a separate, idempotent pass that grafts cross-cutting
//!   behavior (audit markers, array serialization, type aliasing,
//!   reserved-word quoting) into the compiled tree.
//!
//! All stages communicate through the file system only and expect
//! exclusive access to the working tree for the duration of a run.

// Core modules
pub mod compiler;
pub mod config;
pub mod error;
pub mod fs_utils;
pub mod patcher;
pub mod utils;
pub mod validation;
pub mod xml;

// Re-export key types
pub use compiler::{ModelCompiler, PreCompileReport};
pub use config::{ProjectConfig, VersionedElements};
pub use error::Error;
pub use patcher::EntityPatcher;
pub use validation::ValidationBuilder;
pub use xml::{Canonicalizer, Element, Rule, RuleSet};
