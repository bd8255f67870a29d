//! Grouper: buckets fragments by candidate diagram type.

use std::collections::BTreeMap;

use arbor_core::diagram::DiagramType;
use arbor_core::fragment::Fragment;

use crate::pattern::candidate_types;

/// Candidate diagram type → member fragments, in diagram-type order.
pub type FragmentGroups = BTreeMap<DiagramType, Vec<Fragment>>;

/// Add every fragment to **every** bucket its semantic type matches.
///
/// Fragment order within a bucket follows input order.
pub fn group_by_pattern(fragments: &[Fragment]) -> FragmentGroups {
    let mut groups = FragmentGroups::new();
    for fragment in fragments {
        for diagram_type in candidate_types(fragment.semantic_type) {
            groups.entry(diagram_type).or_default().push(fragment.clone());
        }
    }
    groups
}
