//! Bounded impact analysis
//!
//! Breadth-first walk over outgoing edges in impact-eligible categories. A
//! global visited set keeps every feature to a single entry, reached by the
//! shortest path found first.

use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet, VecDeque};

use super::adjacency::FeatureGraph;
use super::Engine;
use crate::error::GraphResult;
use crate::node_set::NodeSet;

/// Which categories impact analysis follows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImpactScope {
    /// Categories flagged `include_in_impact`
    #[default]
    Default,
    /// Every category
    All,
    /// Only the listed categories
    Include(Vec<String>),
    /// Every category except the listed ones
    Exclude(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct ImpactOptions {
    /// Maximum depth; 0 means unlimited
    pub max_depth: usize,
    pub scope: ImpactScope,
}

/// A feature reached by impact analysis
#[derive(Debug, Clone, Serialize)]
pub struct ImpactEntry {
    pub feature_id: String,
    pub feature_name: String,
    /// Relationship type of the edge that reached this feature
    pub rel_type: String,
    /// Feature the edge was followed from
    pub via: String,
    pub depth: usize,
    /// Names from the root to this feature, inclusive
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImpactReport {
    pub root_id: String,
    pub root_name: String,
    pub categories: Vec<String>,
    pub entries: Vec<ImpactEntry>,
    pub total: usize,
    pub max_depth_reached: usize,
    /// True when the depth limit stopped further expansion
    pub truncated: bool,
    /// Warnings about edges leaving the root itself
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub root_warnings: Vec<String>,
}

impl ImpactReport {
    /// Entries grouped by depth
    pub fn by_depth(&self) -> BTreeMap<usize, Vec<&ImpactEntry>> {
        let mut groups: BTreeMap<usize, Vec<&ImpactEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.depth).or_default().push(entry);
        }
        groups
    }

    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        super::to_json_lines(&self.entries)
    }
}

struct Pending<'n> {
    id: &'n str,
    depth: usize,
    path_ids: Vec<&'n str>,
    path_names: Vec<String>,
    /// Index into entries; None for the root
    entry: Option<usize>,
}

impl<'a> Engine<'a> {
    /// Resolves an impact scope to the category names it covers
    fn impact_categories(&self, scope: &ImpactScope) -> GraphResult<HashSet<String>> {
        let check = |names: &[String]| -> GraphResult<()> {
            for name in names {
                self.schema.get_category(name)?;
            }
            Ok(())
        };

        let categories = &self.schema.categories;
        let selected: HashSet<String> = match scope {
            ImpactScope::Default => categories
                .iter()
                .filter(|(_, c)| c.include_in_impact)
                .map(|(name, _)| name.clone())
                .collect(),
            ImpactScope::All => categories.keys().cloned().collect(),
            ImpactScope::Include(names) => {
                check(names)?;
                names.iter().cloned().collect()
            }
            ImpactScope::Exclude(names) => {
                check(names)?;
                categories
                    .keys()
                    .filter(|name| !names.contains(*name))
                    .cloned()
                    .collect()
            }
        };
        Ok(selected)
    }

    /// Finds every feature reachable from `start` through impact-eligible edges
    pub fn impact(&self, nodes: &NodeSet, start: &str, opts: &ImpactOptions) -> GraphResult<ImpactReport> {
        let root = nodes.require(start)?;
        let categories = self.impact_categories(&opts.scope)?;

        let mut report = ImpactReport {
            root_id: root.id.clone(),
            root_name: root.name.clone(),
            categories: {
                let mut names: Vec<String> = categories.iter().cloned().collect();
                names.sort();
                names
            },
            entries: Vec::new(),
            total: 0,
            max_depth_reached: 0,
            truncated: false,
            root_warnings: Vec::new(),
        };

        let graph = FeatureGraph::build(nodes, |rel| {
            self.schema
                .category_of(&rel.rel_type)
                .map(|(cat, _)| categories.contains(cat))
                .unwrap_or(false)
        });

        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(root.id.as_str());

        let mut queue = VecDeque::new();
        queue.push_back(Pending {
            id: root.id.as_str(),
            depth: 0,
            path_ids: vec![root.id.as_str()],
            path_names: vec![root.name.clone()],
            entry: None,
        });

        while let Some(current) = queue.pop_front() {
            let Some(feature) = nodes.get(current.id) else {
                continue;
            };

            for (target_id, rel) in graph.neighbors(current.id, Direction::Outgoing) {
                let Some(target) = nodes.get(target_id) else {
                    continue;
                };

                if current.path_ids.contains(&target_id) {
                    let warning = format!(
                        "cycle: '{}' leads back to '{}' via {}",
                        feature.name, target.name, rel.rel_type
                    );
                    match current.entry {
                        Some(i) => report.entries[i].warnings.push(warning),
                        None => report.root_warnings.push(warning),
                    }
                    continue;
                }
                if visited.contains(target_id) {
                    continue;
                }

                let depth = current.depth + 1;
                if opts.max_depth > 0 && depth > opts.max_depth {
                    report.truncated = true;
                    continue;
                }

                visited.insert(target_id);
                let mut path_ids = current.path_ids.clone();
                path_ids.push(target_id);
                let mut path_names = current.path_names.clone();
                path_names.push(target.name.clone());

                report.entries.push(ImpactEntry {
                    feature_id: target.id.clone(),
                    feature_name: target.name.clone(),
                    rel_type: rel.rel_type.clone(),
                    via: feature.id.clone(),
                    depth,
                    path: path_names.clone(),
                    warnings: Vec::new(),
                });
                report.max_depth_reached = report.max_depth_reached.max(depth);

                queue.push_back(Pending {
                    id: target_id,
                    depth,
                    path_ids,
                    path_names,
                    entry: Some(report.entries.len() - 1),
                });
            }
        }

        report.total = report.entries.len();
        tracing::debug!(root = %report.root_id, total = report.total, "impact analysis finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::graph::fixtures::{config, nodes, raw_edge};

    #[test]
    fn test_impact_follows_impact_categories_only() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c", "d"]);
        raw_edge(&mut nodes, "a", "required-by", "b");
        raw_edge(&mut nodes, "b", "contains", "c");
        raw_edge(&mut nodes, "a", "related-to", "d");

        let report = engine.impact(&nodes, "a", &ImpactOptions::default()).unwrap();
        let ids: Vec<&str> = report.entries.iter().map(|e| e.feature_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(report.entries[1].path, vec!["A", "B", "C"]);
        assert_eq!(report.entries[1].depth, 2);
        assert_eq!(report.max_depth_reached, 2);
    }

    #[test]
    fn test_impact_scope_overrides() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "d"]);
        raw_edge(&mut nodes, "a", "required-by", "b");
        raw_edge(&mut nodes, "a", "related-to", "d");

        let all = ImpactOptions { max_depth: 0, scope: ImpactScope::All };
        assert_eq!(engine.impact(&nodes, "a", &all).unwrap().total, 2);

        let include = ImpactOptions {
            max_depth: 0,
            scope: ImpactScope::Include(vec!["associative".into()]),
        };
        let report = engine.impact(&nodes, "a", &include).unwrap();
        assert_eq!(report.entries[0].feature_id, "d");
        assert_eq!(report.total, 1);

        let exclude = ImpactOptions {
            max_depth: 0,
            scope: ImpactScope::Exclude(vec!["structural".into()]),
        };
        let report = engine.impact(&nodes, "a", &exclude).unwrap();
        assert_eq!(report.total, 1);
        assert_eq!(report.entries[0].feature_id, "d");

        let unknown = ImpactOptions {
            max_depth: 0,
            scope: ImpactScope::Include(vec!["nope".into()]),
        };
        assert_eq!(
            engine.impact(&nodes, "a", &unknown).unwrap_err(),
            GraphError::UnknownCategory("nope".into())
        );
    }

    #[test]
    fn test_impact_depth_limit() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c"]);
        raw_edge(&mut nodes, "a", "blocks", "b");
        raw_edge(&mut nodes, "b", "blocks", "c");

        let opts = ImpactOptions { max_depth: 1, scope: ImpactScope::Default };
        let report = engine.impact(&nodes, "a", &opts).unwrap();
        assert_eq!(report.total, 1);
        assert!(report.truncated);
    }

    #[test]
    fn test_impact_visits_each_node_once_on_cycles() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c", "d"]);
        // Malformed cyclic data plus a diamond
        raw_edge(&mut nodes, "a", "blocks", "b");
        raw_edge(&mut nodes, "a", "blocks", "c");
        raw_edge(&mut nodes, "b", "blocks", "d");
        raw_edge(&mut nodes, "c", "blocks", "d");
        raw_edge(&mut nodes, "d", "blocks", "a");

        let report = engine.impact(&nodes, "a", &ImpactOptions::default()).unwrap();
        let mut ids: Vec<&str> = report.entries.iter().map(|e| e.feature_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        // d is reached through b first (breadth-first, shortest path)
        let d = report.entries.iter().find(|e| e.feature_id == "d").unwrap();
        assert_eq!(d.via, "b");
        assert_eq!(d.depth, 2);
        assert_eq!(d.warnings.len(), 1);
        assert!(d.warnings[0].contains("leads back to 'A'"));
    }

    #[test]
    fn test_impact_root_warning_on_self_loop() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a"]);
        raw_edge(&mut nodes, "a", "blocks", "a");

        let report = engine.impact(&nodes, "a", &ImpactOptions::default()).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.root_warnings.len(), 1);
    }

    #[test]
    fn test_impact_grouping_and_json_lines() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["a", "b", "c", "e"]);
        raw_edge(&mut nodes, "a", "blocks", "b");
        raw_edge(&mut nodes, "a", "blocks", "c");
        raw_edge(&mut nodes, "c", "blocks", "e");
        raw_edge(&mut nodes, "a", "blocks", "ghost");

        let report = engine.impact(&nodes, "a", &ImpactOptions::default()).unwrap();
        let groups = report.by_depth();
        assert_eq!(groups[&1].len(), 2);
        assert_eq!(groups[&2].len(), 1);

        let lines = report.to_json_lines().unwrap();
        assert_eq!(lines.lines().count(), 3);
        let first: serde_json::Value = serde_json::from_str(lines.lines().next().unwrap()).unwrap();
        assert_eq!(first["feature_id"], "b");
        assert_eq!(first["depth"], 1);
    }
}
