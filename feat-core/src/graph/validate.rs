//! Whole-graph validation
//!
//! Six independent checks over every stored edge. The validator never
//! mutates the node set and never fails on malformed data; bad edges become
//! issues instead.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use super::Engine;
use crate::models::{Feature, Relationship};
use crate::node_set::NodeSet;
use crate::schema::{DetectionMode, TypeBehavior};

/// Stable code of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IssueCode {
    /// Edge target does not exist
    #[serde(rename = "E001")]
    Orphaned,
    /// Forward edge without its inverse on the target. Only checked with
    /// `auto_inverse` on
    #[serde(rename = "E002")]
    MissingInverse,
    /// Inverse edge without its forward edge on the target. Only checked with
    /// `auto_inverse` on
    #[serde(rename = "E003")]
    DanglingInverse,
    /// Unknown type, empty field or duplicate edge id
    #[serde(rename = "E004")]
    SchemaViolation,
    /// Cycle in a category that disallows cycles
    #[serde(rename = "E005")]
    CycleViolation,
    /// Target's current version fails the edge's constraint
    #[serde(rename = "E006")]
    VersionConstraint,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::Orphaned => "E001",
            IssueCode::MissingInverse => "E002",
            IssueCode::DanglingInverse => "E003",
            IssueCode::SchemaViolation => "E004",
            IssueCode::CycleViolation => "E005",
            IssueCode::VersionConstraint => "E006",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            IssueCode::Orphaned => "orphaned relationship",
            IssueCode::MissingInverse => "missing inverse",
            IssueCode::DanglingInverse => "dangling inverse",
            IssueCode::SchemaViolation => "schema violation",
            IssueCode::CycleViolation => "cycle violation",
            IssueCode::VersionConstraint => "version constraint violation",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    /// Cycles in `warn` categories
    Warning,
}

/// A single structural defect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub feature_id: String,
    pub feature_name: String,
    pub relationship_id: String,
    pub rel_type: String,
    pub target_id: String,
    pub message: String,
    pub fixable: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub features_checked: usize,
    pub relationships_checked: usize,
    /// Whether E002 and E003 were checked
    pub inverse_checks: bool,
}

impl ValidationReport {
    pub fn by_code(&self) -> BTreeMap<IssueCode, Vec<&ValidationIssue>> {
        let mut groups: BTreeMap<IssueCode, Vec<&ValidationIssue>> = BTreeMap::new();
        for issue in &self.issues {
            groups.entry(issue.code).or_default().push(issue);
        }
        groups
    }

    pub fn count(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_fixable_issues(&self) -> bool {
        self.issues.iter().any(|i| i.fixable)
    }

    pub fn fixable_count(&self) -> usize {
        self.issues.iter().filter(|i| i.fixable).count()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        super::to_json_lines(&self.issues)
    }
}

fn issue(code: IssueCode, feature: &Feature, rel: &Relationship, message: String) -> ValidationIssue {
    ValidationIssue {
        code,
        severity: Severity::Error,
        feature_id: feature.id.clone(),
        feature_name: feature.name.clone(),
        relationship_id: rel.id.clone(),
        rel_type: rel.rel_type.clone(),
        target_id: rel.target_id.clone(),
        message,
        fixable: matches!(
            code,
            IssueCode::Orphaned | IssueCode::MissingInverse | IssueCode::DanglingInverse
        ),
    }
}

impl<'a> Engine<'a> {
    /// Runs every check over the node set. Inverse pairing (E002, E003)
    /// is skipped when `auto_inverse` is off, since edges are then stored
    /// one-sided on purpose.
    pub fn validate(&self, nodes: &NodeSet) -> ValidationReport {
        let mut report = ValidationReport {
            features_checked: nodes.len(),
            inverse_checks: self.settings.auto_inverse,
            ..Default::default()
        };

        for feature in nodes.iter() {
            let mut seen_ids: HashSet<&str> = HashSet::new();
            for rel in &feature.relationships {
                report.relationships_checked += 1;
                if let Some(problem) = self.check_fields(feature, rel, &mut seen_ids) {
                    report.issues.push(problem);
                    continue;
                }

                let Some(target) = nodes.get(&rel.target_id) else {
                    report.issues.push(issue(
                        IssueCode::Orphaned,
                        feature,
                        rel,
                        format!(
                            "'{}' has a {} relationship to missing feature '{}'",
                            feature.id, rel.rel_type, rel.target_id
                        ),
                    ));
                    continue;
                };

                if self.settings.auto_inverse {
                    if let Some(problem) = self.check_inverse(feature, rel, target) {
                        report.issues.push(problem);
                    }
                }

                if let Some(constraint) = &rel.version_constraint {
                    let satisfied = target
                        .current_version()
                        .map(|v| constraint.is_satisfied_by(v))
                        .unwrap_or(false);
                    if !satisfied {
                        let current = target.current_version().unwrap_or("no version");
                        report.issues.push(issue(
                            IssueCode::VersionConstraint,
                            feature,
                            rel,
                            format!(
                                "'{}' requires '{}' {} but it is at {}",
                                feature.id, target.id, constraint, current
                            ),
                        ));
                    }
                }
            }
        }

        for cycle in self.find_cycles(nodes) {
            let Some(owner) = nodes.get(&cycle.owner) else {
                continue;
            };
            let Some(rel) = owner.relationships.iter().find(|r| r.id == cycle.relationship_id) else {
                continue;
            };
            let mut message = format!(
                "cycle in category '{}': {}",
                cycle.category,
                cycle.path.join(" -> ")
            );
            if cycle.members.len() + 1 > cycle.path.len() {
                message.push_str(&format!(
                    " (cyclic component: {})",
                    cycle.members.join(", ")
                ));
            }
            let mut problem = issue(IssueCode::CycleViolation, owner, rel, message);
            let warn_only = self
                .schema
                .categories
                .get(&cycle.category)
                .map(|c| c.effective_detection() == DetectionMode::Warn)
                .unwrap_or(false);
            if warn_only {
                problem.severity = Severity::Warning;
            }
            report.issues.push(problem);
        }

        report.issues.sort_by_key(|i| i.code);
        tracing::debug!(
            features = report.features_checked,
            relationships = report.relationships_checked,
            issues = report.issues.len(),
            "validation finished"
        );
        report
    }

    /// E004: empty fields, duplicate edge ids and unknown types
    fn check_fields<'f>(
        &self,
        feature: &Feature,
        rel: &'f Relationship,
        seen_ids: &mut HashSet<&'f str>,
    ) -> Option<ValidationIssue> {
        let message = if rel.id.is_empty() {
            Some("relationship has no id".to_string())
        } else if rel.rel_type.is_empty() {
            Some("relationship has no type".to_string())
        } else if rel.target_id.is_empty() {
            Some("relationship has no target".to_string())
        } else if !seen_ids.insert(rel.id.as_str()) {
            Some(format!("duplicate relationship id '{}'", rel.id))
        } else if self.schema.get_type(&rel.rel_type).is_err() {
            Some(format!("unknown relationship type '{}'", rel.rel_type))
        } else {
            None
        };

        message.map(|m| issue(IssueCode::SchemaViolation, feature, rel, format!("'{}': {}", feature.id, m)))
    }

    /// E002/E003 for one edge whose target exists
    fn check_inverse(&self, feature: &Feature, rel: &Relationship, target: &Feature) -> Option<ValidationIssue> {
        let TypeBehavior::Directed { inverse, forward } = self.schema.behavior(&rel.rel_type).ok()? else {
            return None;
        };
        if !self.schema.types.contains_key(&inverse) || target.has_relationship(&inverse, &feature.id) {
            return None;
        }

        if forward {
            Some(issue(
                IssueCode::MissingInverse,
                feature,
                rel,
                format!(
                    "'{}' {} '{}' but '{}' has no {} back",
                    feature.id, rel.rel_type, target.id, target.id, inverse
                ),
            ))
        } else {
            Some(issue(
                IssueCode::DanglingInverse,
                feature,
                rel,
                format!(
                    "'{}' {} '{}' but '{}' has no {} forward edge",
                    feature.id, rel.rel_type, target.id, target.id, inverse
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::fixtures::{config, nodes, raw_edge};
    use crate::graph::LinkOptions;
    use crate::models::Version;
    use crate::version::{ConstraintOp, VersionConstraint};
    use chrono::Utc;

    #[test]
    fn test_clean_graph_has_no_issues() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c"]);
        engine
            .add_relationship(&mut nodes, "a", "depends-on", "b", LinkOptions::default())
            .unwrap();
        engine
            .add_relationship(&mut nodes, "b", "related-to", "c", LinkOptions::default())
            .unwrap();

        let report = engine.validate(&nodes);
        assert!(report.is_clean());
        assert_eq!(report.features_checked, 3);
        assert_eq!(report.relationships_checked, 3);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_orphaned_edge_single_issue() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["x"]);
        raw_edge(&mut nodes, "x", "depends-on", "y");

        let report = engine.validate(&nodes);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].code, IssueCode::Orphaned);
        assert!(report.issues[0].fixable);
        assert!(report.has_errors());
        assert!(report.has_fixable_issues());
    }

    #[test]
    fn test_missing_and_dangling_inverse() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c", "d"]);
        raw_edge(&mut nodes, "a", "depends-on", "b");
        raw_edge(&mut nodes, "c", "required-by", "d");

        let report = engine.validate(&nodes);
        let groups = report.by_code();
        assert_eq!(groups[&IssueCode::MissingInverse].len(), 1);
        assert_eq!(groups[&IssueCode::MissingInverse][0].feature_id, "a");
        assert_eq!(groups[&IssueCode::DanglingInverse].len(), 1);
        assert_eq!(groups[&IssueCode::DanglingInverse][0].feature_id, "c");
        assert_eq!(report.fixable_count(), 2);
    }

    #[test]
    fn test_inverse_checks_skipped_without_auto_inverse() {
        let mut config = Config::default();
        config.settings.auto_inverse = false;
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b"]);
        raw_edge(&mut nodes, "a", "depends-on", "b");

        let report = engine.validate(&nodes);
        assert!(report.is_clean());
        assert!(!report.inverse_checks);

        let defaults = Config::default();
        let report = Engine::new(&defaults).validate(&nodes);
        assert!(report.inverse_checks);
        assert_eq!(report.count(IssueCode::MissingInverse), 1);
    }

    #[test]
    fn test_schema_violations() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b"]);
        raw_edge(&mut nodes, "a", "mentors", "b");
        let dup = raw_edge(&mut nodes, "a", "related-to", "b");
        raw_edge(&mut nodes, "a", "duplicates", "b");
        nodes.get_mut("a").unwrap().relationships[2].id = dup;
        raw_edge(&mut nodes, "b", "related-to", "");

        let report = engine.validate(&nodes);
        assert_eq!(report.count(IssueCode::SchemaViolation), 3);
        assert!(report.issues.iter().all(|i| !i.fixable));
    }

    #[test]
    fn test_cycle_violation_reported_once() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c"]);
        raw_edge(&mut nodes, "a", "blocks", "b");
        raw_edge(&mut nodes, "b", "blocks", "c");
        raw_edge(&mut nodes, "c", "blocks", "a");
        raw_edge(&mut nodes, "b", "blocked-by", "a");
        raw_edge(&mut nodes, "c", "blocked-by", "b");
        raw_edge(&mut nodes, "a", "blocked-by", "c");

        let report = engine.validate(&nodes);
        assert_eq!(report.count(IssueCode::CycleViolation), 1);
        assert_eq!(report.issues.len(), 1);
        assert!(!report.issues[0].fixable);
        assert_eq!(report.issues[0].severity, Severity::Error);
    }

    fn cycle_issues(report: &ValidationReport) -> Vec<&ValidationIssue> {
        report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::CycleViolation)
            .collect()
    }

    #[test]
    fn test_overlapping_cycles_reported_once() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c"]);
        raw_edge(&mut nodes, "a", "blocks", "b");
        raw_edge(&mut nodes, "b", "blocks", "c");
        raw_edge(&mut nodes, "c", "blocks", "a");
        raw_edge(&mut nodes, "a", "blocks", "c");

        let report = engine.validate(&nodes);
        let cycles = cycle_issues(&report);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].feature_id, "c");
        assert!(cycles[0].message.contains("a -> b -> c -> a"));
        assert!(!cycles[0].message.contains("cyclic component"));
    }

    #[test]
    fn test_short_cycle_names_whole_component() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c"]);
        raw_edge(&mut nodes, "a", "blocks", "b");
        raw_edge(&mut nodes, "b", "blocks", "a");
        raw_edge(&mut nodes, "b", "blocks", "c");
        raw_edge(&mut nodes, "c", "blocks", "b");

        let report = engine.validate(&nodes);
        let cycles = cycle_issues(&report);
        assert_eq!(cycles.len(), 1);
        assert!(cycles[0].message.contains("a -> b -> a"));
        assert!(cycles[0].message.contains("cyclic component: a, b, c"));
    }

    #[test]
    fn test_warn_category_cycle_is_a_warning() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b"]);
        raw_edge(&mut nodes, "a", "precedes", "b");
        raw_edge(&mut nodes, "b", "precedes", "a");
        raw_edge(&mut nodes, "b", "follows", "a");
        raw_edge(&mut nodes, "a", "follows", "b");

        let report = engine.validate(&nodes);
        assert_eq!(report.count(IssueCode::CycleViolation), 1);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_version_constraints() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["app", "lib", "new"]);
        engine
            .add_relationship(
                &mut nodes,
                "app",
                "depends-on",
                "lib",
                LinkOptions {
                    version_constraint: Some(VersionConstraint::new(ConstraintOp::Ge, "2.0")),
                    ..Default::default()
                },
            )
            .unwrap();
        engine
            .add_relationship(
                &mut nodes,
                "app",
                "related-to",
                "new",
                LinkOptions {
                    version_constraint: Some(VersionConstraint::new(ConstraintOp::Ge, "1.0")),
                    ..Default::default()
                },
            )
            .unwrap();
        nodes.get_mut("lib").unwrap().versions.insert(
            "1.5".into(),
            Version {
                started_at: Utc::now(),
                released_at: None,
            },
        );

        let report = engine.validate(&nodes);
        assert_eq!(report.count(IssueCode::VersionConstraint), 2);

        nodes.get_mut("lib").unwrap().versions.insert(
            "2.1".into(),
            Version {
                started_at: Utc::now(),
                released_at: None,
            },
        );
        let report = engine.validate(&nodes);
        assert_eq!(report.count(IssueCode::VersionConstraint), 1);
        assert_eq!(report.issues[0].target_id, "new");
    }

    #[test]
    fn test_validate_is_deterministic() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c"]);
        raw_edge(&mut nodes, "a", "depends-on", "ghost");
        raw_edge(&mut nodes, "a", "depends-on", "b");
        raw_edge(&mut nodes, "c", "part-of", "a");

        let first = engine.validate(&nodes);
        let second = engine.validate(&nodes);
        assert_eq!(first.issues, second.issues);

        let lines = first.to_json_lines().unwrap();
        assert_eq!(lines.lines().count(), 3);
        assert!(lines.contains("\"code\":\"E001\""));
    }
}
