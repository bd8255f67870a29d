//! Diagrams (trees): typed reasoning graphs assembled from fragments.
//!
//! The [`DiagramPayload`] is the wire contract consumed by downstream
//! renderers: `diagramId`, `diagramType`, `title`, a node map keyed by node
//! id, and a list of `{from, to}` links. Its JSON shape must not drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::fragment::SemanticType;

/// The kind of reasoning diagram. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramType {
    EvaporatingCloud,
    PrerequisiteTree,
    CurrentRealityTree,
    FutureRealityTree,
}

impl DiagramType {
    pub const ALL: [DiagramType; 4] = [
        DiagramType::EvaporatingCloud,
        DiagramType::PrerequisiteTree,
        DiagramType::CurrentRealityTree,
        DiagramType::FutureRealityTree,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagramType::EvaporatingCloud => "evaporating_cloud",
            DiagramType::PrerequisiteTree => "prerequisite_tree",
            DiagramType::CurrentRealityTree => "current_reality_tree",
            DiagramType::FutureRealityTree => "future_reality_tree",
        }
    }

    /// Human-readable name, e.g. "Evaporating Cloud".
    pub fn display_name(&self) -> &'static str {
        match self {
            DiagramType::EvaporatingCloud => "Evaporating Cloud",
            DiagramType::PrerequisiteTree => "Prerequisite Tree",
            DiagramType::CurrentRealityTree => "Current Reality Tree",
            DiagramType::FutureRealityTree => "Future Reality Tree",
        }
    }
}

impl fmt::Display for DiagramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagramType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown diagram type '{s}'"))
    }
}

/// One node per assigned fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique within the diagram
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    pub x: f64,
    pub y: f64,
}

/// A directed, diagram-scoped edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub from: String,
    pub to: String,
}

impl Link {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// The persisted diagram body handed to renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramPayload {
    pub diagram_id: String,
    pub diagram_type: DiagramType,
    pub title: String,
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl DiagramPayload {
    /// Nodes ordered by id.
    pub fn node_list(&self) -> Vec<&Node> {
        self.nodes.values().collect()
    }

    pub fn has_link(&self, link: &Link) -> bool {
        self.links.contains(link)
    }
}

/// A diagram about to be persisted.
#[derive(Debug, Clone)]
pub struct NewDiagram {
    pub client_id: i64,
    pub session_id: String,
    pub payload: DiagramPayload,
    pub created_at: DateTime<Utc>,
}

impl NewDiagram {
    pub fn id(&self) -> &str {
        &self.payload.diagram_id
    }

    pub fn diagram_type(&self) -> DiagramType {
        self.payload.diagram_type
    }
}

/// A stored diagram, including its payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagramRecord {
    pub id: String,
    pub diagram_type: DiagramType,
    pub title: String,
    pub client_id: i64,
    pub session_id: String,
    /// Only active ("open") diagrams are extended by later passes
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub payload: DiagramPayload,
}

/// The lightweight projection used for relationship detection and listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramSummary {
    pub id: String,
    pub diagram_type: DiagramType,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

impl From<&DiagramRecord> for DiagramSummary {
    fn from(record: &DiagramRecord) -> Self {
        Self {
            id: record.id.clone(),
            diagram_type: record.diagram_type,
            title: record.title.clone(),
            created_at: record.created_at,
        }
    }
}
