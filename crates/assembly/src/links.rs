//! Link inferencer: per-type heuristics that draw edges between nodes.
//!
//! Rules are registered per diagram type in a [`LinkRegistry`]. A type with
//! no rules, or a diagram missing the nodes a rule needs, simply gets no
//! edges.

use std::collections::HashMap;

use tracing::trace;

use arbor_core::diagram::{DiagramType, Link, Node};
use arbor_core::fragment::SemanticType;

/// A link-inference heuristic for one diagram type.
pub trait LinkRule: Send + Sync {
    fn name(&self) -> &str;

    fn diagram_type(&self) -> DiagramType;

    /// Infer links over `nodes`, given in grid order.
    fn infer(&self, nodes: &[&Node]) -> Vec<Link>;
}

/// Edge from every node of a source type to the first node of the target type.
#[derive(Debug, Clone)]
pub struct SourcesToTarget {
    pub name: &'static str,
    pub diagram_type: DiagramType,
    pub sources: &'static [SemanticType],
    pub target: SemanticType,
}

impl LinkRule for SourcesToTarget {
    fn name(&self) -> &str {
        self.name
    }

    fn diagram_type(&self) -> DiagramType {
        self.diagram_type
    }

    fn infer(&self, nodes: &[&Node]) -> Vec<Link> {
        let Some(target) = nodes.iter().find(|n| n.semantic_type == self.target) else {
            return Vec::new();
        };
        nodes
            .iter()
            .filter(|n| self.sources.contains(&n.semantic_type))
            .map(|n| Link::new(n.id.as_str(), target.id.as_str()))
            .collect()
    }
}

/// Built-in link rules.
pub const DEFAULT_LINK_RULES: &[SourcesToTarget] = &[SourcesToTarget {
    name: "want_need_to_conflict",
    diagram_type: DiagramType::EvaporatingCloud,
    sources: &[SemanticType::Want, SemanticType::Need],
    target: SemanticType::Conflict,
}];

/// Link rules keyed by diagram type.
pub struct LinkRegistry {
    rules: HashMap<DiagramType, Vec<Box<dyn LinkRule>>>,
}

impl LinkRegistry {
    /// An empty registry: no type gets inferred links.
    pub fn new() -> Self {
        Self { rules: HashMap::new() }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for rule in DEFAULT_LINK_RULES {
            registry.register(Box::new(rule.clone()));
        }
        registry
    }

    pub fn register(&mut self, rule: Box<dyn LinkRule>) {
        self.rules.entry(rule.diagram_type()).or_default().push(rule);
    }

    /// Run every rule for `diagram_type`, dropping duplicate edges.
    pub fn infer(&self, diagram_type: DiagramType, nodes: &[&Node]) -> Vec<Link> {
        let mut links: Vec<Link> = Vec::new();
        for rule in self.rules.get(&diagram_type).into_iter().flatten() {
            let inferred = rule.infer(nodes);
            trace!(rule = rule.name(), %diagram_type, count = inferred.len(), "Link rule applied");
            for link in inferred {
                if !links.contains(&link) {
                    links.push(link);
                }
            }
        }
        links
    }
}

impl Default for LinkRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
