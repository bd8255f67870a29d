//! Pattern matcher: which diagram types a semantic type can feed.
//!
//! The mapping is rule data: each diagram type lists the semantic types
//! that belong to it. A semantic type listed under several diagram types
//! (`injection`) yields several candidates, which is what later produces
//! legitimate multi-membership.

use arbor_core::diagram::DiagramType;
use arbor_core::fragment::SemanticType;

/// The semantic types a diagram type is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternRule {
    pub diagram_type: DiagramType,
    pub members: &'static [SemanticType],
}

/// The pattern rule for a diagram type.
pub fn pattern_rule(diagram_type: DiagramType) -> PatternRule {
    use SemanticType::*;

    let members: &'static [SemanticType] = match diagram_type {
        DiagramType::EvaporatingCloud => &[Conflict, Want, Need, Assumption],
        DiagramType::PrerequisiteTree => &[Obstacle, Injection, Objective],
        DiagramType::CurrentRealityTree => &[UndesirableEffect, RootCause, IntermediateEffect],
        DiagramType::FutureRealityTree => &[DesiredEffect, Solution, Injection],
    };
    PatternRule { diagram_type, members }
}

/// All pattern rules, in diagram-type order.
pub fn pattern_rules() -> impl Iterator<Item = PatternRule> {
    DiagramType::ALL.into_iter().map(pattern_rule)
}

/// Candidate diagram types for a semantic type. Pure; no I/O.
pub fn candidate_types(semantic_type: SemanticType) -> Vec<DiagramType> {
    pattern_rules()
        .filter(|rule| rule.members.contains(&semantic_type))
        .map(|rule| rule.diagram_type)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_semantic_type_has_a_candidate() {
        for t in SemanticType::ALL {
            assert!(!candidate_types(t).is_empty(), "{t} maps to no diagram type");
        }
    }

    #[test]
    fn injection_is_polysemous() {
        assert_eq!(
            candidate_types(SemanticType::Injection),
            vec![DiagramType::PrerequisiteTree, DiagramType::FutureRealityTree]
        );
    }

    #[test]
    fn single_candidate_mappings() {
        assert_eq!(candidate_types(SemanticType::Conflict), vec![DiagramType::EvaporatingCloud]);
        assert_eq!(candidate_types(SemanticType::Assumption), vec![DiagramType::EvaporatingCloud]);
        assert_eq!(candidate_types(SemanticType::Objective), vec![DiagramType::PrerequisiteTree]);
        assert_eq!(candidate_types(SemanticType::RootCause), vec![DiagramType::CurrentRealityTree]);
        assert_eq!(candidate_types(SemanticType::Solution), vec![DiagramType::FutureRealityTree]);
    }
}
