//! Membership and evolution records.
//!
//! An [`Assignment`] ties a fragment to a diagram; the pair
//! `(fragment_id, diagram_id)` is its unique key, so re-recording the same
//! pair updates rather than duplicates. A [`Relationship`] is a directed
//! edge between two diagrams, unique per `(from, to, type)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A fragment's membership in one diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub fragment_id: String,
    pub diagram_id: String,
    /// Node representing the fragment inside the diagram
    pub node_id: String,
    /// Always within `[0, 1]`
    pub confidence: f64,
    /// Names the rule that produced this membership
    pub reason: String,
    pub assigned_at: DateTime<Utc>,
}

impl Assignment {
    /// The unique key of this assignment.
    pub fn key(&self) -> (&str, &str) {
        (&self.fragment_id, &self.diagram_id)
    }
}

/// Kinds of inter-diagram relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    EvolvedFrom,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::EvolvedFrom => "evolved_from",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "evolved_from" => Ok(RelationshipType::EvolvedFrom),
            other => Err(format!("unknown relationship type '{other}'")),
        }
    }
}

/// A directed edge between two diagrams.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub from_diagram_id: String,
    pub to_diagram_id: String,
    pub relationship_type: RelationshipType,
}

impl Relationship {
    pub fn evolved_from(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from_diagram_id: from.into(),
            to_diagram_id: to.into(),
            relationship_type: RelationshipType::EvolvedFrom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_type_roundtrip() {
        let t: RelationshipType = "evolved_from".parse().unwrap();
        assert_eq!(t, RelationshipType::EvolvedFrom);
        assert_eq!(t.to_string(), "evolved_from");
        assert!("supersedes".parse::<RelationshipType>().is_err());
    }

    #[test]
    fn assignment_serialization() {
        let assignment = Assignment {
            fragment_id: "f1".into(),
            diagram_id: "d1".into(),
            node_id: "n_f1".into(),
            confidence: 0.7,
            reason: "evaporating_cloud rule".into(),
            assigned_at: Utc::now(),
        };
        assert_eq!(assignment.key(), ("f1", "d1"));
        let json = serde_json::to_string(&assignment).unwrap();
        assert!(json.contains("evaporating_cloud rule"));
    }
}
