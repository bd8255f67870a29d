//! Thinking fragments: small typed units of reasoning extracted upstream.
//!
//! Fragments are created by the external extractor and are read-only to
//! the assembly engine. Stores hand back raw [`FragmentRecord`]s; the
//! engine validates them into [`Fragment`]s before classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::diagram::DiagramType;
use crate::error::FragmentError;

/// Confidence used when a fragment carries none (or an unusable value).
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// The fixed category of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Want,
    Need,
    Conflict,
    Assumption,
    Obstacle,
    Injection,
    Objective,
    UndesirableEffect,
    RootCause,
    IntermediateEffect,
    DesiredEffect,
    Solution,
}

impl SemanticType {
    pub const ALL: [SemanticType; 12] = [
        SemanticType::Want,
        SemanticType::Need,
        SemanticType::Conflict,
        SemanticType::Assumption,
        SemanticType::Obstacle,
        SemanticType::Injection,
        SemanticType::Objective,
        SemanticType::UndesirableEffect,
        SemanticType::RootCause,
        SemanticType::IntermediateEffect,
        SemanticType::DesiredEffect,
        SemanticType::Solution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Want => "want",
            SemanticType::Need => "need",
            SemanticType::Conflict => "conflict",
            SemanticType::Assumption => "assumption",
            SemanticType::Obstacle => "obstacle",
            SemanticType::Injection => "injection",
            SemanticType::Objective => "objective",
            SemanticType::UndesirableEffect => "undesirable_effect",
            SemanticType::RootCause => "root_cause",
            SemanticType::IntermediateEffect => "intermediate_effect",
            SemanticType::DesiredEffect => "desired_effect",
            SemanticType::Solution => "solution",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SemanticType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown semantic type '{s}'"))
    }
}

/// A fragment row as the store returns it, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub id: String,

    /// Semantic type as stored (e.g. `"undesirable_effect"`)
    #[serde(default, alias = "semanticType", skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Defaults to the time the record is deserialized
    #[serde(alias = "createdAt", default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Owning client scope
    #[serde(default, alias = "clientId")]
    pub client_id: i64,

    /// Conversation session the fragment was extracted from
    #[serde(default, alias = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A validated fragment, ready for classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub semantic_type: SemanticType,
    pub label: String,
    #[serde(default)]
    pub description: String,
    /// Confidence as extracted; `None` when the extractor did not set one
    #[serde(default)]
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub client_id: i64,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Clamp a raw confidence into `[0, 1]`, falling back to `default` for
/// missing or non-finite values.
pub fn effective_confidence(raw: Option<f64>, default: f64) -> f64 {
    match raw {
        Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
        _ => default.clamp(0.0, 1.0),
    }
}

impl TryFrom<FragmentRecord> for Fragment {
    type Error = FragmentError;

    fn try_from(record: FragmentRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err(FragmentError::malformed("(empty)", "missing fragment id"));
        }

        let raw_type = record
            .semantic_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FragmentError::malformed(&record.id, "missing semantic type"))?;
        let semantic_type = raw_type
            .parse::<SemanticType>()
            .map_err(|e| FragmentError::malformed(&record.id, e))?;

        let label = record
            .label
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| FragmentError::malformed(&record.id, "missing label"))?;

        Ok(Fragment {
            id: record.id,
            semantic_type,
            label,
            description: record.description.unwrap_or_default(),
            confidence: record.confidence,
            created_at: record.created_at,
            client_id: record.client_id,
            session_id: record.session_id,
        })
    }
}

/// A fragment that already belongs to at least one diagram.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialFragment {
    pub record: FragmentRecord,

    /// Diagram types the fragment is already assigned to
    #[serde(default)]
    pub assigned_types: Vec<DiagramType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(semantic_type: Option<&str>, label: Option<&str>) -> FragmentRecord {
        FragmentRecord {
            id: "frag_1".into(),
            semantic_type: semantic_type.map(String::from),
            label: label.map(String::from),
            description: None,
            confidence: None,
            created_at: Utc::now(),
            client_id: 6,
            session_id: None,
        }
    }

    #[test]
    fn semantic_type_parses_snake_case() {
        assert_eq!("undesirable_effect".parse::<SemanticType>(), Ok(SemanticType::UndesirableEffect));
        assert_eq!(" Injection ".parse::<SemanticType>(), Ok(SemanticType::Injection));
        assert!("decision".parse::<SemanticType>().is_err());
    }

    #[test]
    fn semantic_type_serde_matches_as_str() {
        for t in SemanticType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn valid_record_converts() {
        let fragment = Fragment::try_from(record(Some("conflict"), Some("Speed vs Quality"))).unwrap();
        assert_eq!(fragment.semantic_type, SemanticType::Conflict);
        assert_eq!(fragment.label, "Speed vs Quality");
        assert_eq!(fragment.description, "");
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = Fragment::try_from(record(None, Some("orphan"))).unwrap_err();
        assert!(err.to_string().contains("missing semantic type"));
    }

    #[test]
    fn unknown_type_is_malformed() {
        let err = Fragment::try_from(record(Some("hunch"), Some("x"))).unwrap_err();
        assert!(err.to_string().contains("hunch"));
    }

    #[test]
    fn blank_label_is_malformed() {
        let err = Fragment::try_from(record(Some("want"), Some("   "))).unwrap_err();
        assert!(err.to_string().contains("missing label"));
    }

    #[test]
    fn confidence_defaults_and_clamps() {
        assert_eq!(effective_confidence(None, DEFAULT_CONFIDENCE), DEFAULT_CONFIDENCE);
        assert_eq!(effective_confidence(Some(1.7), DEFAULT_CONFIDENCE), 1.0);
        assert_eq!(effective_confidence(Some(-0.2), DEFAULT_CONFIDENCE), 0.0);
        assert_eq!(effective_confidence(Some(f64::NAN), DEFAULT_CONFIDENCE), DEFAULT_CONFIDENCE);
        assert_eq!(effective_confidence(None, 1.4), 1.0);
    }

    #[test]
    fn record_accepts_camel_case_json() {
        let json = r#"{
            "id": "f1",
            "semanticType": "want",
            "label": "Ship fast",
            "createdAt": "2026-10-17T09:00:00Z",
            "clientId": 6
        }"#;
        let record: FragmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.semantic_type.as_deref(), Some("want"));
        assert_eq!(record.client_id, 6);
        assert!(record.confidence.is_none());
    }
}
