//! The fragment-to-tree assembly engine.
//!
//! One run moves through these stages:
//!
//! 1. **Group** recent unassigned fragments by candidate diagram type
//! 2. **Resolve** each bucket against its type's cardinality rule
//! 3. **Build** a diagram per satisfied bucket and infer its links
//! 4. **Record** every member fragment's assignment
//! 5. **Revisit** low-confidence fragments for the types they still lack
//! 6. **Relate** recent diagrams to each other
//!
//! All state lives in the stores reached through [`AssemblyContext`];
//! idempotent upserts there are the only coordination between runs.

pub mod builder;
pub mod context;
pub mod grouper;
pub mod links;
pub mod orchestrator;
pub mod pattern;
pub mod recorder;
pub mod relationships;
pub mod report;
pub mod resolver;
pub mod secondary;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::{AssemblyContext, AssemblySettings};
pub use grouper::{group_by_pattern, FragmentGroups};
pub use links::{LinkRegistry, LinkRule, SourcesToTarget};
pub use orchestrator::TreeAssembler;
pub use pattern::candidate_types;
pub use report::AssemblyReport;
pub use resolver::{cardinality_rule, resolve, CardinalityRule, Requirement};
