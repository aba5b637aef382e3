//! Relationship schema registry
//!
//! Holds the configured catalog of relationship categories and types, and
//! resolves type names (or their aliases) to the behavior the engine applies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{GraphError, GraphResult};

/// How cycles are handled within a category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    /// Reject edges that would close a cycle
    Strict,
    /// Accept such edges but report a warning
    Warn,
    /// Skip cycle detection
    #[default]
    None,
}

impl DetectionMode {
    /// Parse a detection mode, rejecting anything but the three valid modes
    pub fn parse(s: &str) -> GraphResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(DetectionMode::Strict),
            "warn" => Ok(DetectionMode::Warn),
            "none" => Ok(DetectionMode::None),
            _ => Err(GraphError::InvalidDetectionMode(s.to_string())),
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMode::Strict => write!(f, "strict"),
            DetectionMode::Warn => write!(f, "warn"),
            DetectionMode::None => write!(f, "none"),
        }
    }
}

/// A group of relationship types sharing a cycle policy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RelationshipCategory {
    #[serde(default)]
    pub allow_cycles: bool,

    #[serde(default)]
    pub cycle_detection: DetectionMode,

    #[serde(default)]
    pub include_in_impact: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl RelationshipCategory {
    /// Detection mode actually applied; allowing cycles disables detection
    pub fn effective_detection(&self) -> DetectionMode {
        if self.allow_cycles {
            DetectionMode::None
        } else {
            self.cycle_detection
        }
    }
}

/// Configuration of a single relationship type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RelationshipTypeConfig {
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,

    #[serde(default)]
    pub bidirectional: bool,

    /// Marks the reverse half of an inverse pair (e.g. `required-by`)
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reverse: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl RelationshipTypeConfig {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Default::default()
        }
    }
}

/// How a relationship type behaves with respect to its reverse direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeBehavior {
    /// One edge represents both directions
    Bidirectional,
    /// Directed with a declared inverse type; `forward` is false for the
    /// reverse half of the pair
    Directed { inverse: String, forward: bool },
    /// Directed without an inverse
    OneWay,
}

/// The full relationship schema: categories and types keyed by name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Schema {
    #[serde(default)]
    pub categories: BTreeMap<String, RelationshipCategory>,

    #[serde(default)]
    pub types: BTreeMap<String, RelationshipTypeConfig>,
}

impl Schema {
    /// Creates an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a type name or alias to its canonical name and config.
    /// Alias matching is exact and case-sensitive.
    pub fn resolve_type(&self, name: &str) -> GraphResult<(&str, &RelationshipTypeConfig)> {
        if let Some((key, config)) = self.types.get_key_value(name) {
            return Ok((key.as_str(), config));
        }
        self.types
            .iter()
            .find(|(_, config)| config.aliases.iter().any(|a| a == name))
            .map(|(key, config)| (key.as_str(), config))
            .ok_or_else(|| GraphError::UnknownType(name.to_string()))
    }

    /// Looks up a type by canonical name only
    pub fn get_type(&self, name: &str) -> GraphResult<&RelationshipTypeConfig> {
        self.types
            .get(name)
            .ok_or_else(|| GraphError::UnknownType(name.to_string()))
    }

    pub fn get_category(&self, name: &str) -> GraphResult<&RelationshipCategory> {
        self.categories
            .get(name)
            .ok_or_else(|| GraphError::UnknownCategory(name.to_string()))
    }

    /// Category of a type, resolving aliases
    pub fn category_of(&self, type_name: &str) -> GraphResult<(&str, &RelationshipCategory)> {
        let (_, config) = self.resolve_type(type_name)?;
        let (key, category) = self
            .categories
            .get_key_value(config.category.as_str())
            .ok_or_else(|| GraphError::UnknownCategory(config.category.clone()))?;
        Ok((key.as_str(), category))
    }

    /// Canonical names of the types that belong to a category
    pub fn types_in_category(&self, category: &str) -> GraphResult<Vec<&str>> {
        self.get_category(category)?;
        Ok(self
            .types
            .iter()
            .filter(|(_, config)| config.category == category)
            .map(|(name, _)| name.as_str())
            .collect())
    }

    /// Determines the behavior of a type.
    ///
    /// When neither half of a pair is marked `reverse`, the lexicographically
    /// smaller name is treated as the forward half.
    pub fn behavior(&self, type_name: &str) -> GraphResult<TypeBehavior> {
        let (name, config) = self.resolve_type(type_name)?;
        if config.bidirectional {
            return Ok(TypeBehavior::Bidirectional);
        }
        let Some(inverse) = config.inverse.as_deref() else {
            return Ok(TypeBehavior::OneWay);
        };

        let inverse_reverse = self.types.get(inverse).map(|c| c.reverse).unwrap_or(false);
        let forward = match (config.reverse, inverse_reverse) {
            (false, true) => true,
            (true, false) => false,
            _ => name <= inverse,
        };

        Ok(TypeBehavior::Directed {
            inverse: inverse.to_string(),
            forward,
        })
    }

    /// The inverse type that auto-inverse should maintain for `type_name`,
    /// if the type has one and it exists in the schema
    pub fn maintained_inverse(&self, type_name: &str) -> Option<String> {
        match self.behavior(type_name).ok()? {
            TypeBehavior::Directed { inverse, .. } if self.types.contains_key(&inverse) => {
                Some(inverse)
            }
            _ => None,
        }
    }

    /// Names of types whose category disallows cycles, in name order
    pub fn cycle_free_types(&self) -> Vec<&str> {
        self.types
            .iter()
            .filter(|(_, config)| {
                self.categories
                    .get(&config.category)
                    .map(|c| !c.allow_cycles)
                    .unwrap_or(false)
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether a name is taken by a type or by any type's alias
    pub fn type_name_taken(&self, name: &str) -> bool {
        self.resolve_type(name).is_ok()
    }

    /// Checks the structural invariants of the schema itself
    pub fn check(&self) -> GraphResult<()> {
        for (name, category) in &self.categories {
            if category.allow_cycles && category.cycle_detection != DetectionMode::None {
                return Err(GraphError::InvalidSchema(format!(
                    "category '{}' allows cycles but sets detection mode '{}'",
                    name, category.cycle_detection
                )));
            }
        }

        let mut seen_aliases: BTreeMap<&str, &str> = BTreeMap::new();
        for (name, config) in &self.types {
            if !self.categories.contains_key(&config.category) {
                return Err(GraphError::InvalidSchema(format!(
                    "type '{}' references unknown category '{}'",
                    name, config.category
                )));
            }
            if config.bidirectional && config.inverse.is_some() {
                return Err(GraphError::InvalidSchema(format!(
                    "type '{}' is bidirectional and must not declare an inverse",
                    name
                )));
            }
            if let Some(inverse) = &config.inverse {
                if let Some(other) = self.types.get(inverse) {
                    if other.inverse.as_deref() != Some(name.as_str()) {
                        return Err(GraphError::InvalidSchema(format!(
                            "type '{}' declares inverse '{}' but '{}' does not declare '{}' back",
                            name, inverse, inverse, name
                        )));
                    }
                }
            }
            for alias in &config.aliases {
                if self.types.contains_key(alias) {
                    return Err(GraphError::InvalidSchema(format!(
                        "alias '{}' of type '{}' collides with a type name",
                        alias, name
                    )));
                }
                if let Some(owner) = seen_aliases.insert(alias, name) {
                    return Err(GraphError::InvalidSchema(format!(
                        "alias '{}' is declared by both '{}' and '{}'",
                        alias, owner, name
                    )));
                }
            }
        }

        Ok(())
    }
}

fn category(
    allow_cycles: bool,
    cycle_detection: DetectionMode,
    include_in_impact: bool,
    description: &str,
) -> RelationshipCategory {
    RelationshipCategory {
        allow_cycles,
        cycle_detection,
        include_in_impact,
        description: description.to_string(),
    }
}

fn directed(category: &str, inverse: &str, reverse: bool, description: &str, aliases: &[&str]) -> RelationshipTypeConfig {
    RelationshipTypeConfig {
        category: category.to_string(),
        inverse: Some(inverse.to_string()),
        bidirectional: false,
        reverse,
        description: description.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}

fn symmetric(category: &str, description: &str, aliases: &[&str]) -> RelationshipTypeConfig {
    RelationshipTypeConfig {
        category: category.to_string(),
        inverse: None,
        bidirectional: true,
        reverse: false,
        description: description.to_string(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
    }
}

/// Built-in schema used when no configuration file exists
pub fn default_schema() -> Schema {
    let mut schema = Schema::new();

    schema.categories.insert(
        "structural".into(),
        category(false, DetectionMode::Strict, true, "Dependencies that must never form a cycle"),
    );
    schema.categories.insert(
        "hierarchical".into(),
        category(false, DetectionMode::Strict, true, "Parent/child containment"),
    );
    schema.categories.insert(
        "sequencing".into(),
        category(false, DetectionMode::Warn, false, "Preferred ordering of work"),
    );
    schema.categories.insert(
        "associative".into(),
        category(true, DetectionMode::None, false, "Informational links"),
    );

    let types = [
        ("depends-on", directed("structural", "required-by", false, "Needs the target to work", &["depends", "requires"])),
        ("required-by", directed("structural", "depends-on", true, "Is needed by the target", &[])),
        ("blocks", directed("structural", "blocked-by", false, "Prevents progress on the target", &[])),
        ("blocked-by", directed("structural", "blocks", true, "Cannot progress until the target does", &[])),
        ("contains", directed("hierarchical", "part-of", false, "Parent of the target", &["parent-of"])),
        ("part-of", directed("hierarchical", "contains", true, "Child of the target", &["child-of"])),
        ("precedes", directed("sequencing", "follows", false, "Should be done before the target", &[])),
        ("follows", directed("sequencing", "precedes", true, "Should be done after the target", &[])),
        ("related-to", symmetric("associative", "Loosely related", &["relates-to"])),
        ("duplicates", symmetric("associative", "Covers the same work", &[])),
    ];
    for (name, config) in types {
        schema.types.insert(name.to_string(), config);
    }

    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_consistent() {
        let schema = default_schema();
        assert!(schema.check().is_ok());
        assert_eq!(schema.categories.len(), 4);
        assert_eq!(schema.types.len(), 10);
    }

    #[test]
    fn test_resolve_type_and_alias() {
        let schema = default_schema();
        let (name, config) = schema.resolve_type("requires").unwrap();
        assert_eq!(name, "depends-on");
        assert_eq!(config.category, "structural");

        // Alias resolution is case-sensitive
        assert_eq!(
            schema.resolve_type("Requires").unwrap_err(),
            GraphError::UnknownType("Requires".into())
        );
    }

    #[test]
    fn test_category_lookups() {
        let schema = default_schema();
        let (name, category) = schema.category_of("part-of").unwrap();
        assert_eq!(name, "hierarchical");
        assert!(category.include_in_impact);

        assert_eq!(
            schema.types_in_category("structural").unwrap(),
            vec!["blocked-by", "blocks", "depends-on", "required-by"]
        );
        assert!(matches!(
            schema.types_in_category("missing"),
            Err(GraphError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_behavior_variants() {
        let schema = default_schema();
        assert_eq!(schema.behavior("related-to").unwrap(), TypeBehavior::Bidirectional);
        assert_eq!(
            schema.behavior("depends-on").unwrap(),
            TypeBehavior::Directed { inverse: "required-by".into(), forward: true }
        );
        assert_eq!(
            schema.behavior("blocked-by").unwrap(),
            TypeBehavior::Directed { inverse: "blocks".into(), forward: false }
        );

        let mut schema = schema;
        schema.types.insert("mentions".into(), RelationshipTypeConfig::new("associative"));
        assert_eq!(schema.behavior("mentions").unwrap(), TypeBehavior::OneWay);
    }

    #[test]
    fn test_behavior_falls_back_to_name_order() {
        let mut schema = default_schema();
        schema.types.get_mut("blocked-by").unwrap().reverse = false;
        // Neither half is marked, so the smaller name is forward
        assert_eq!(
            schema.behavior("blocked-by").unwrap(),
            TypeBehavior::Directed { inverse: "blocks".into(), forward: true }
        );
    }

    #[test]
    fn test_check_rejects_bidirectional_with_inverse() {
        let mut schema = default_schema();
        schema.types.get_mut("related-to").unwrap().inverse = Some("duplicates".into());
        assert!(matches!(schema.check(), Err(GraphError::InvalidSchema(_))));
    }

    #[test]
    fn test_check_rejects_asymmetric_inverse() {
        let mut schema = default_schema();
        schema.types.get_mut("required-by").unwrap().inverse = Some("blocks".into());
        assert!(matches!(schema.check(), Err(GraphError::InvalidSchema(_))));
    }

    #[test]
    fn test_check_rejects_allow_cycles_with_detection() {
        let mut schema = default_schema();
        schema.categories.get_mut("associative").unwrap().cycle_detection = DetectionMode::Warn;
        assert!(matches!(schema.check(), Err(GraphError::InvalidSchema(_))));
    }

    #[test]
    fn test_detection_mode_parse() {
        assert_eq!(DetectionMode::parse("Strict").unwrap(), DetectionMode::Strict);
        assert_eq!(
            DetectionMode::parse("loose").unwrap_err(),
            GraphError::InvalidDetectionMode("loose".into())
        );
    }

    #[test]
    fn test_cycle_free_types() {
        let schema = default_schema();
        let types = schema.cycle_free_types();
        assert_eq!(types.first(), Some(&"blocked-by"));
        assert!(!types.contains(&"related-to"));
    }
}
