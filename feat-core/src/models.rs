use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::version::{compare_versions, VersionConstraint};

/// Lifecycle state of a feature, derived from its version and close timestamps
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureState {
    /// No versions recorded yet
    Planned,
    /// The current version has been started but not released
    InProgress,
    /// The current version has been released
    Released,
    /// The feature has been closed
    Closed,
}

impl fmt::Display for FeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureState::Planned => write!(f, "planned"),
            FeatureState::InProgress => write!(f, "in-progress"),
            FeatureState::Released => write!(f, "released"),
            FeatureState::Closed => write!(f, "closed"),
        }
    }
}

impl FeatureState {
    /// Parse a state from a string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "planned" => Some(FeatureState::Planned),
            "in-progress" | "in_progress" | "inprogress" | "active" => {
                Some(FeatureState::InProgress)
            }
            "released" => Some(FeatureState::Released),
            "closed" => Some(FeatureState::Closed),
            _ => None,
        }
    }
}

/// A historical version record of a feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Version {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_at: Option<DateTime<Utc>>,
}

/// A directed, typed edge stored on its source feature.
///
/// Fields default when absent so that malformed records still load and can
/// be reported by the validator instead of failing the whole node set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relationship {
    /// Identifier, unique within the owning feature
    #[serde(default)]
    pub id: String,

    /// Relationship type name, a key into the schema
    #[serde(default, rename = "type")]
    pub rel_type: String,

    /// Target feature identifier
    #[serde(default)]
    pub target_id: String,

    /// Cached display name of the target; may be stale after a rename
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Version the target must currently satisfy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_constraint: Option<VersionConstraint>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// Creates a new relationship with a fresh identifier
    pub fn new(rel_type: impl Into<String>, target_id: impl Into<String>, target_name: impl Into<String>) -> Self {
        Self {
            id: new_relationship_id(),
            rel_type: rel_type.into(),
            target_id: target_id.into(),
            target_name: target_name.into(),
            description: None,
            version_constraint: None,
            created_at: Utc::now(),
        }
    }
}

/// Generates a short relationship identifier
pub fn new_relationship_id() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

/// A tracked unit of work; a node of the relationship graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feature {
    /// Stable unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Free-form classification (epic, story, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Outgoing relationships
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,

    /// Version history keyed by version string
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub versions: BTreeMap<String, Version>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Feature {
    /// Creates a new feature with no relationships or versions
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: None,
            relationships: Vec::new(),
            versions: BTreeMap::new(),
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    /// The highest version key under version ordering
    pub fn current_version(&self) -> Option<&str> {
        self.versions
            .keys()
            .max_by(|a, b| compare_versions(a, b))
            .map(|s| s.as_str())
    }

    /// Derives the lifecycle state
    pub fn state(&self) -> FeatureState {
        if self.closed_at.is_some() {
            return FeatureState::Closed;
        }
        match self.current_version().and_then(|v| self.versions.get(v)) {
            None => FeatureState::Planned,
            Some(version) if version.released_at.is_some() => FeatureState::Released,
            Some(_) => FeatureState::InProgress,
        }
    }

    /// Finds an outgoing relationship by type and target
    pub fn find_relationship(&self, rel_type: &str, target_id: &str) -> Option<&Relationship> {
        self.relationships
            .iter()
            .find(|r| r.rel_type == rel_type && r.target_id == target_id)
    }

    pub fn has_relationship(&self, rel_type: &str, target_id: &str) -> bool {
        self.find_relationship(rel_type, target_id).is_some()
    }
}
