//! Error types for the relationship graph engine
//!
//! Every failure carries the feature, relationship, type or category it
//! concerns so the message is actionable on its own.

use thiserror::Error;

/// Errors raised by relationship edits, queries and schema management
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown relationship type '{0}'")]
    UnknownType(String),

    #[error("Unknown relationship category '{0}'")]
    UnknownCategory(String),

    #[error("Relationship '{rel_type}' from '{source_id}' to '{target_id}' already exists")]
    DuplicateRelationship {
        source_id: String,
        rel_type: String,
        target_id: String,
    },

    #[error("Adding '{rel_type}' from '{source_id}' to '{target_id}' would create a cycle in category '{category}': {}", .path.join(" -> "))]
    CycleDetected {
        source_id: String,
        rel_type: String,
        target_id: String,
        category: String,
        path: Vec<String>,
    },

    #[error("{kind} '{query}' not found{}", format_suggestions(.suggestions))]
    NotFound {
        kind: String,
        query: String,
        suggestions: Vec<String>,
    },

    #[error("No hierarchy relationship type configured and no cycle-free type available")]
    NoHierarchyType,

    #[error("Invalid cycle detection mode '{0}' (expected strict, warn or none)")]
    InvalidDetectionMode(String),

    #[error("Invalid relationship schema: {0}")]
    InvalidSchema(String),

    #[error("{kind} name '{name}' is already in use")]
    NameInUse { kind: String, name: String },

    #[error("{kind} '{name}' is still in use: {usage}")]
    InUse {
        kind: String,
        name: String,
        usage: String,
    },

    #[error("Invalid version constraint '{0}'")]
    InvalidConstraint(String),
}

impl GraphError {
    /// Builds a not-found error without suggestions
    pub fn not_found(kind: &str, query: impl Into<String>) -> Self {
        GraphError::NotFound {
            kind: kind.to_string(),
            query: query.into(),
            suggestions: Vec::new(),
        }
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

/// Result alias for engine operations
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_suggestions() {
        let err = GraphError::NotFound {
            kind: "Feature".into(),
            query: "logn".into(),
            suggestions: vec!["login".into(), "logout".into()],
        };
        assert_eq!(
            err.to_string(),
            "Feature 'logn' not found (did you mean: login, logout?)"
        );
        assert_eq!(
            GraphError::not_found("Feature", "x").to_string(),
            "Feature 'x' not found"
        );
    }

    #[test]
    fn test_cycle_message_includes_path() {
        let err = GraphError::CycleDetected {
            source_id: "b".into(),
            rel_type: "depends-on".into(),
            target_id: "a".into(),
            category: "structural".into(),
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().contains("a -> b -> a"));
        assert!(err.to_string().contains("structural"));
    }
}
