//! Mechanical repair of validator issues

use serde::Serialize;
use std::collections::BTreeSet;

use super::validate::{IssueCode, ValidationIssue, ValidationReport};
use super::Engine;
use crate::models::Relationship;
use crate::node_set::NodeSet;
use crate::schema::TypeBehavior;

#[derive(Debug, Clone, Copy, Default)]
pub struct FixOptions {
    /// Report what would change without mutating the node set
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum FixStatus {
    Fixed,
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FixOutcome {
    pub issue: ValidationIssue,
    #[serde(flatten)]
    pub status: FixStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FixReport {
    pub outcomes: Vec<FixOutcome>,
    pub fixed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub dry_run: bool,
    /// Features that were (or would be) modified
    #[serde(skip)]
    pub touched: BTreeSet<String>,
}

impl FixReport {
    fn push(&mut self, issue: &ValidationIssue, status: FixStatus) {
        match &status {
            FixStatus::Fixed => self.fixed += 1,
            FixStatus::Skipped(reason) => {
                tracing::warn!(code = %issue.code, feature = %issue.feature_id, reason = %reason, "fix skipped");
                self.skipped += 1;
            }
            FixStatus::Failed(reason) => {
                tracing::warn!(code = %issue.code, feature = %issue.feature_id, reason = %reason, "fix failed");
                self.failed += 1;
            }
        }
        self.outcomes.push(FixOutcome {
            issue: issue.clone(),
            status,
        });
    }

    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        super::to_json_lines(&self.outcomes)
    }
}

impl<'a> Engine<'a> {
    /// Repairs the fixable issues of `report`: E001 and E003 edges are
    /// removed, E002 inverses are created. Never fabricates forward edges.
    pub fn fix(&self, nodes: &mut NodeSet, report: &ValidationReport, opts: &FixOptions) -> FixReport {
        let mut result = FixReport {
            dry_run: opts.dry_run,
            ..Default::default()
        };

        let mut scratch;
        let target: &mut NodeSet = if opts.dry_run {
            scratch = nodes.clone();
            &mut scratch
        } else {
            nodes
        };

        for issue in &report.issues {
            let status = if issue.fixable {
                self.fix_issue(target, issue, &mut result.touched)
            } else {
                FixStatus::Skipped("not mechanically fixable".to_string())
            };
            result.push(issue, status);
        }

        tracing::info!(
            fixed = result.fixed,
            skipped = result.skipped,
            failed = result.failed,
            dry_run = opts.dry_run,
            "auto-fix finished"
        );
        result
    }

    fn fix_issue(&self, nodes: &mut NodeSet, issue: &ValidationIssue, touched: &mut BTreeSet<String>) -> FixStatus {
        match issue.code {
            IssueCode::Orphaned => {
                if nodes.contains(&issue.target_id) {
                    return FixStatus::Skipped(format!("target '{}' now exists", issue.target_id));
                }
                remove_edge(nodes, issue, touched)
            }
            IssueCode::DanglingInverse => remove_edge(nodes, issue, touched),
            IssueCode::MissingInverse => self.create_inverse(nodes, issue, touched),
            _ => FixStatus::Skipped("not mechanically fixable".to_string()),
        }
    }

    fn create_inverse(&self, nodes: &mut NodeSet, issue: &ValidationIssue, touched: &mut BTreeSet<String>) -> FixStatus {
        let inverse = match self.schema.behavior(&issue.rel_type) {
            Ok(TypeBehavior::Directed { inverse, .. }) => inverse,
            Ok(_) => return FixStatus::Failed(format!("'{}' has no inverse type", issue.rel_type)),
            Err(e) => return FixStatus::Failed(e.to_string()),
        };
        let Some(source) = nodes.get(&issue.feature_id) else {
            return FixStatus::Failed(format!("feature '{}' not found", issue.feature_id));
        };
        let source_name = source.name.clone();
        let description = source
            .relationships
            .iter()
            .find(|r| r.id == issue.relationship_id)
            .and_then(|r| r.description.clone());

        let Some(target) = nodes.get_mut(&issue.target_id) else {
            return FixStatus::Failed(format!("feature '{}' not found", issue.target_id));
        };
        if target.has_relationship(&inverse, &issue.feature_id) {
            return FixStatus::Skipped("inverse already present".to_string());
        }

        let mut back = Relationship::new(inverse, issue.feature_id.as_str(), source_name);
        back.description = description;
        target.relationships.push(back);
        touched.insert(target.id.clone());
        FixStatus::Fixed
    }
}

fn remove_edge(nodes: &mut NodeSet, issue: &ValidationIssue, touched: &mut BTreeSet<String>) -> FixStatus {
    let Some(feature) = nodes.get_mut(&issue.feature_id) else {
        return FixStatus::Failed(format!("feature '{}' not found", issue.feature_id));
    };
    match feature
        .relationships
        .iter()
        .position(|r| r.id == issue.relationship_id)
    {
        Some(pos) => {
            feature.relationships.remove(pos);
            touched.insert(feature.id.clone());
            FixStatus::Fixed
        }
        None => FixStatus::Skipped("relationship already removed".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::{config, edges, nodes, raw_edge};

    #[test]
    fn test_orphan_fixed_then_clean() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["x"]);
        raw_edge(&mut nodes, "x", "depends-on", "y");

        let report = engine.validate(&nodes);
        assert_eq!(report.count(IssueCode::Orphaned), 1);

        let fixed = engine.fix(&mut nodes, &report, &FixOptions::default());
        assert_eq!(fixed.fixed, 1);
        assert!(fixed.touched.contains("x"));
        assert!(nodes.get("x").unwrap().relationships.is_empty());
        assert!(engine.validate(&nodes).is_clean());
    }

    #[test]
    fn test_fix_then_revalidate_has_no_fixable_issues() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c", "d"]);
        raw_edge(&mut nodes, "a", "depends-on", "b");
        raw_edge(&mut nodes, "c", "required-by", "d");
        raw_edge(&mut nodes, "d", "contains", "ghost");
        raw_edge(&mut nodes, "a", "mentors", "b");

        let report = engine.validate(&nodes);
        assert_eq!(report.fixable_count(), 3);

        let fixed = engine.fix(&mut nodes, &report, &FixOptions::default());
        assert_eq!(fixed.fixed, 3);
        assert_eq!(fixed.skipped, 1);
        assert_eq!(fixed.failed, 0);

        // Inverse synthesized, dangling inverse removed, not forward-fabricated
        assert_eq!(edges(&nodes, "b"), vec![("required-by".to_string(), "a".to_string())]);
        assert!(edges(&nodes, "c").is_empty());
        assert!(edges(&nodes, "d").is_empty());

        let after = engine.validate(&nodes);
        assert_eq!(after.fixable_count(), 0);
        assert_eq!(after.count(IssueCode::SchemaViolation), 1);
    }

    #[test]
    fn test_dry_run_leaves_nodes_unchanged() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b"]);
        raw_edge(&mut nodes, "a", "depends-on", "b");
        raw_edge(&mut nodes, "a", "blocks", "ghost");
        let before = nodes.clone();

        let report = engine.validate(&nodes);
        let fixed = engine.fix(&mut nodes, &report, &FixOptions { dry_run: true });
        assert!(fixed.dry_run);
        assert_eq!(fixed.fixed, 2);
        assert_eq!(fixed.touched.len(), 2);
        assert_eq!(edges(&nodes, "a"), edges(&before, "a"));
        assert!(edges(&nodes, "b").is_empty());
    }

    #[test]
    fn test_stale_issue_is_skipped() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b"]);
        raw_edge(&mut nodes, "a", "depends-on", "b");

        let report = engine.validate(&nodes);
        engine.fix(&mut nodes, &report, &FixOptions::default());
        let again = engine.fix(&mut nodes, &report, &FixOptions::default());
        assert_eq!(again.fixed, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(edges(&nodes, "b").len(), 1);
    }

    #[test]
    fn test_outcomes_serialize_with_status() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["x"]);
        raw_edge(&mut nodes, "x", "blocks", "gone");

        let report = engine.validate(&nodes);
        let fixed = engine.fix(&mut nodes, &report, &FixOptions::default());
        let line = fixed.to_json_lines().unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["status"], "fixed");
        assert_eq!(value["issue"]["code"], "E001");
    }
}
