//! # Arbor Core
//!
//! Domain types, store traits, and error definitions for the Arbor
//! fragment-to-tree assembly engine. This crate performs **no I/O**; it
//! defines the model that the store and assembly crates implement against.
//!
//! ## Design Philosophy
//!
//! Both external collaborators (the fragment store and the diagram store)
//! are defined as traits here. Implementations live in `arbor-store`.
//! This enables:
//! - Swapping the backing store via configuration
//! - Testing the engine against an in-memory store
//! - A clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod fragment;
pub mod diagram;
pub mod assignment;
pub mod store;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{FragmentError, StoreError};
pub use fragment::{Fragment, FragmentRecord, PartialFragment, SemanticType, DEFAULT_CONFIDENCE};
pub use diagram::{DiagramPayload, DiagramRecord, DiagramSummary, DiagramType, Link, NewDiagram, Node};
pub use assignment::{Assignment, Relationship, RelationshipType};
pub use store::{DiagramStore, FragmentStore, Scope, Window};
pub use event::{AssemblyEvent, EventBus};
