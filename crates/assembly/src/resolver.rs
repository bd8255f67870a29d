//! Type resolver: per-type minimum-cardinality rules.
//!
//! Each diagram type owns one [`CardinalityRule`]. Rules are evaluated
//! independently, so one fragment set may satisfy several diagram types at
//! once. A bucket that satisfies nothing is not an error: its fragments
//! stay unassigned and are reconsidered by later runs.

use std::collections::HashMap;
use std::fmt;

use arbor_core::diagram::DiagramType;
use arbor_core::fragment::{Fragment, SemanticType};

/// A condition over per-semantic-type counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AtLeast(SemanticType, usize),
    All(&'static [Requirement]),
    Any(&'static [Requirement]),
}

impl Requirement {
    pub fn is_met(&self, counts: &HashMap<SemanticType, usize>) -> bool {
        match self {
            Requirement::AtLeast(t, n) => counts.get(t).copied().unwrap_or(0) >= *n,
            Requirement::All(parts) => parts.iter().all(|r| r.is_met(counts)),
            Requirement::Any(parts) => parts.iter().any(|r| r.is_met(counts)),
        }
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        let (parts, joiner) = match self {
            Requirement::AtLeast(t, n) => return write!(f, "{t}>={n}"),
            Requirement::All(parts) => (parts, " AND "),
            Requirement::Any(parts) => (parts, " OR "),
        };
        if nested {
            f.write_str("(")?;
        }
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                f.write_str(joiner)?;
            }
            part.write(f, true)?;
        }
        if nested {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, false)
    }
}

/// The minimum-cardinality rule that turns a bucket into a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardinalityRule {
    pub diagram_type: DiagramType,
    pub requirement: Requirement,
}

impl CardinalityRule {
    /// Short description used as the assignment reason.
    pub fn describe(&self) -> String {
        format!("{} rule: {}", self.diagram_type, self.requirement)
    }

    pub fn is_satisfied_by(&self, fragments: &[Fragment]) -> bool {
        self.requirement.is_met(&count_types(fragments))
    }
}

/// The cardinality rule for a diagram type.
pub fn cardinality_rule(diagram_type: DiagramType) -> CardinalityRule {
    use Requirement::*;
    use SemanticType::*;

    let requirement = match diagram_type {
        DiagramType::EvaporatingCloud => All(&[AtLeast(Conflict, 1), Any(&[AtLeast(Want, 1), AtLeast(Need, 1)])]),
        DiagramType::PrerequisiteTree => All(&[AtLeast(Obstacle, 1), AtLeast(Objective, 1)]),
        DiagramType::CurrentRealityTree => AtLeast(UndesirableEffect, 2),
        DiagramType::FutureRealityTree => Any(&[AtLeast(DesiredEffect, 1), AtLeast(Solution, 1)]),
    };
    CardinalityRule { diagram_type, requirement }
}

pub fn count_types(fragments: &[Fragment]) -> HashMap<SemanticType, usize> {
    let mut counts = HashMap::new();
    for fragment in fragments {
        *counts.entry(fragment.semantic_type).or_insert(0) += 1;
    }
    counts
}

/// Decide whether a bucket gathered for `candidate` forms that diagram.
///
/// Returns the satisfied rule, or `None` when no diagram should be built.
pub fn resolve(candidate: DiagramType, fragments: &[Fragment]) -> Option<CardinalityRule> {
    let rule = cardinality_rule(candidate);
    rule.is_satisfied_by(fragments).then_some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fragment;

    #[test]
    fn evaporating_cloud_needs_conflict_and_want_or_need() {
        let conflict = fragment("c", SemanticType::Conflict, "Speed vs Quality");
        let want = fragment("w", SemanticType::Want, "Ship fast");
        let need = fragment("n", SemanticType::Need, "Ship correct");
        let assumption = fragment("a", SemanticType::Assumption, "Tests are slow");

        let ec = DiagramType::EvaporatingCloud;
        assert!(resolve(ec, &[conflict.clone(), want.clone()]).is_some());
        assert!(resolve(ec, &[conflict.clone(), need.clone()]).is_some());
        assert!(resolve(ec, &[conflict.clone(), assumption.clone()]).is_none());
        assert!(resolve(ec, &[want, need, assumption]).is_none());
        assert!(resolve(ec, &[conflict]).is_none());
    }

    #[test]
    fn prerequisite_tree_needs_obstacle_and_objective() {
        let pt = DiagramType::PrerequisiteTree;
        let obstacle = fragment("o", SemanticType::Obstacle, "No budget");
        let objective = fragment("g", SemanticType::Objective, "Launch");
        let injection = fragment("i", SemanticType::Injection, "Grant");
        assert!(resolve(pt, &[obstacle.clone(), objective]).is_some());
        assert!(resolve(pt, &[obstacle, injection]).is_none());
    }

    #[test]
    fn current_reality_tree_needs_two_undesirable_effects() {
        let crt = DiagramType::CurrentRealityTree;
        let ude1 = fragment("u1", SemanticType::UndesirableEffect, "Late releases");
        let ude2 = fragment("u2", SemanticType::UndesirableEffect, "Angry users");
        let cause = fragment("r", SemanticType::RootCause, "No CI");
        assert!(resolve(crt, &[ude1.clone(), cause]).is_none());
        assert!(resolve(crt, &[ude1, ude2]).is_some());
    }

    #[test]
    fn future_reality_tree_needs_desired_effect_or_solution() {
        let frt = DiagramType::FutureRealityTree;
        assert!(resolve(frt, &[fragment("d", SemanticType::DesiredEffect, "Calm")]).is_some());
        assert!(resolve(frt, &[fragment("s", SemanticType::Solution, "CI")]).is_some());
        assert!(resolve(frt, &[fragment("i", SemanticType::Injection, "Grant")]).is_none());
    }

    #[test]
    fn one_set_can_satisfy_several_types() {
        let fragments = vec![
            fragment("o", SemanticType::Obstacle, "No budget"),
            fragment("g", SemanticType::Objective, "Launch"),
            fragment("s", SemanticType::Solution, "Crowdfund"),
        ];
        let satisfied: Vec<DiagramType> = DiagramType::ALL
            .into_iter()
            .filter(|t| resolve(*t, &fragments).is_some())
            .collect();
        assert_eq!(satisfied, vec![DiagramType::PrerequisiteTree, DiagramType::FutureRealityTree]);
    }

    #[test]
    fn rule_descriptions_read_naturally() {
        assert_eq!(
            cardinality_rule(DiagramType::EvaporatingCloud).describe(),
            "evaporating_cloud rule: conflict>=1 AND (want>=1 OR need>=1)"
        );
        assert_eq!(
            cardinality_rule(DiagramType::CurrentRealityTree).describe(),
            "current_reality_tree rule: undesirable_effect>=2"
        );
    }
}
