//! Hierarchy trees over a family of relationship types

use petgraph::Direction;
use serde::Serialize;
use std::collections::HashSet;

use super::adjacency::FeatureGraph;
use super::Engine;
use crate::error::{GraphError, GraphResult};
use crate::models::{Feature, FeatureState};
use crate::node_set::NodeSet;

#[derive(Debug, Clone, Default)]
pub struct HierarchyOptions {
    /// Hierarchy types (names or aliases); empty uses the configured default
    pub types: Vec<String>,
    /// Build a single tree from this feature instead of from every root
    pub root: Option<String>,
    /// Maximum depth; 0 means unlimited
    pub max_depth: usize,
    /// Keep only features with this category (and their ancestors)
    pub category: Option<String>,
    /// Keep only features in this state (and their ancestors)
    pub state: Option<FeatureState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub state: FeatureState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Type of the edge from the parent; None for roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
    /// The edge leads back to a feature already on the path
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cycle: bool,
    /// The feature's subtree is already shown under another parent
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub seen: bool,
    /// Children exist beyond the depth limit
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl TreeNode {
    fn leaf(feature: &Feature, rel_type: Option<&str>) -> Self {
        Self {
            id: feature.id.clone(),
            name: feature.name.clone(),
            state: feature.state(),
            category: feature.category.clone(),
            rel_type: rel_type.map(String::from),
            children: Vec::new(),
            cycle: false,
            seen: false,
            truncated: false,
        }
    }

    /// Number of nodes in this subtree, including itself
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(TreeNode::size).sum::<usize>()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HierarchyReport {
    /// Canonical hierarchy types used
    pub types: Vec<String>,
    pub roots: Vec<TreeNode>,
    pub total_nodes: usize,
}

/// Depth-first tree builder. Each feature's children are expanded once;
/// later occurrences become `seen` leaves.
struct TreeWalk<'n, 'o> {
    nodes: &'n NodeSet,
    graph: &'o FeatureGraph<'n>,
    opts: &'o HierarchyOptions,
    path: Vec<&'n str>,
    expanded: HashSet<&'n str>,
}

impl<'n, 'o> TreeWalk<'n, 'o> {
    fn matches(&self, feature: &Feature) -> bool {
        let category_ok = match &self.opts.category {
            Some(wanted) => feature
                .category
                .as_deref()
                .map(|c| c.eq_ignore_ascii_case(wanted))
                .unwrap_or(false),
            None => true,
        };
        let state_ok = self.opts.state.map(|s| feature.state() == s).unwrap_or(true);
        category_ok && state_ok
    }

    fn children_of(&self, feature: &'n Feature) -> Vec<(&'n Feature, &'n str)> {
        self.graph
            .neighbors(feature.id.as_str(), Direction::Outgoing)
            .filter_map(|(id, rel)| self.nodes.get(id).map(|child| (child, rel.rel_type.as_str())))
            .collect()
    }

    /// Builds the subtree under `feature`. Returns None when the filter
    /// rejects the feature and every descendant.
    fn build(&mut self, feature: &'n Feature, rel_type: Option<&str>, depth: usize, keep: bool) -> Option<TreeNode> {
        let id = feature.id.as_str();
        let mut node = TreeNode::leaf(feature, rel_type);

        if self.path.contains(&id) {
            node.cycle = true;
            return (keep || self.matches(feature)).then_some(node);
        }
        if self.expanded.contains(id) {
            // Matching descendants were kept where the subtree was expanded
            node.seen = true;
            return (keep || self.matches(feature)).then_some(node);
        }

        let children = self.children_of(feature);
        if self.opts.max_depth > 0 && depth >= self.opts.max_depth {
            node.truncated = !children.is_empty();
        } else {
            self.expanded.insert(id);
            self.path.push(id);
            for (child, child_type) in children {
                if let Some(sub) = self.build(child, Some(child_type), depth + 1, false) {
                    node.children.push(sub);
                }
            }
            self.path.pop();
        }

        (keep || !node.children.is_empty() || self.matches(feature)).then_some(node)
    }
}

impl<'a> Engine<'a> {
    /// Resolves the hierarchy type family: the requested types, else the
    /// configured hierarchy type, else the first cycle-free type
    pub fn hierarchy_types(&self, requested: &[String]) -> GraphResult<Vec<String>> {
        if !requested.is_empty() {
            let mut types = Vec::new();
            for name in requested {
                let canonical = self.schema.resolve_type(name)?.0.to_string();
                if !types.contains(&canonical) {
                    types.push(canonical);
                }
            }
            return Ok(types);
        }

        if let Some(configured) = &self.settings.hierarchy_type {
            match self.schema.resolve_type(configured) {
                Ok((name, _)) => return Ok(vec![name.to_string()]),
                Err(_) => {
                    tracing::warn!(hierarchy_type = %configured, "configured hierarchy type is not in the schema");
                }
            }
        }

        self.schema
            .cycle_free_types()
            .first()
            .map(|name| vec![name.to_string()])
            .ok_or(GraphError::NoHierarchyType)
    }

    /// Ids of features that no other feature points to with a hierarchy edge
    pub fn find_roots(&self, nodes: &NodeSet, types: &[String]) -> Vec<String> {
        let graph = hierarchy_graph(nodes, types);
        roots_of(nodes, &graph).into_iter().map(|f| f.id.clone()).collect()
    }

    /// Builds hierarchy trees from every root, or from `opts.root` alone
    pub fn hierarchy(&self, nodes: &NodeSet, opts: &HierarchyOptions) -> GraphResult<HierarchyReport> {
        let types = self.hierarchy_types(&opts.types)?;
        let graph = hierarchy_graph(nodes, &types);

        let mut walk = TreeWalk {
            nodes,
            graph: &graph,
            opts,
            path: Vec::new(),
            expanded: HashSet::new(),
        };

        let mut roots = Vec::new();
        match &opts.root {
            Some(query) => {
                let feature = nodes.resolve(query)?;
                if let Some(tree) = walk.build(feature, None, 0, true) {
                    roots.push(tree);
                }
            }
            None => {
                for feature in roots_of(nodes, &graph) {
                    if let Some(tree) = walk.build(feature, None, 0, false) {
                        roots.push(tree);
                    }
                }
            }
        }

        let total_nodes = roots.iter().map(TreeNode::size).sum();
        tracing::debug!(roots = roots.len(), total_nodes, "hierarchy built");
        Ok(HierarchyReport {
            types,
            roots,
            total_nodes,
        })
    }
}

fn hierarchy_graph<'n>(nodes: &'n NodeSet, types: &[String]) -> FeatureGraph<'n> {
    FeatureGraph::build(nodes, |rel| types.contains(&rel.rel_type))
}

fn roots_of<'n>(nodes: &'n NodeSet, graph: &FeatureGraph<'n>) -> Vec<&'n Feature> {
    nodes
        .iter()
        .filter(|f| !graph.has_parent(f.id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::graph::fixtures::{config, nodes, raw_edge};
    use crate::schema::{RelationshipCategory, RelationshipTypeConfig, Schema};

    fn tree_nodes() -> NodeSet {
        let mut nodes = nodes(&["epic", "story1", "story2", "task", "loose"]);
        raw_edge(&mut nodes, "epic", "contains", "story1");
        raw_edge(&mut nodes, "epic", "contains", "story2");
        raw_edge(&mut nodes, "story1", "contains", "task");
        raw_edge(&mut nodes, "task", "part-of", "story1");
        nodes
    }

    fn ids_of(nodes: &[TreeNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_roots_and_tree_shape() {
        let config = config();
        let engine = Engine::new(&config);
        let nodes = tree_nodes();

        let report = engine.hierarchy(&nodes, &HierarchyOptions::default()).unwrap();
        assert_eq!(report.types, vec!["contains"]);
        assert_eq!(ids_of(&report.roots), vec!["epic", "loose"]);
        assert_eq!(ids_of(&report.roots[0].children), vec!["story1", "story2"]);
        assert_eq!(ids_of(&report.roots[0].children[0].children), vec!["task"]);
        assert_eq!(report.roots[0].children[0].rel_type.as_deref(), Some("contains"));
        assert_eq!(report.total_nodes, 5);
    }

    #[test]
    fn test_explicit_root_and_depth() {
        let config = config();
        let engine = Engine::new(&config);
        let nodes = tree_nodes();

        let opts = HierarchyOptions {
            root: Some("EPIC".into()),
            max_depth: 1,
            ..Default::default()
        };
        let report = engine.hierarchy(&nodes, &opts).unwrap();
        assert_eq!(ids_of(&report.roots), vec!["epic"]);
        let story1 = &report.roots[0].children[0];
        assert!(story1.children.is_empty());
        assert!(story1.truncated);
        assert!(!report.roots[0].children[1].truncated);
    }

    #[test]
    fn test_filter_keeps_ancestors_of_matches() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = tree_nodes();
        nodes.get_mut("task").unwrap().category = Some("bug".into());

        let opts = HierarchyOptions {
            category: Some("bug".into()),
            ..Default::default()
        };
        let report = engine.hierarchy(&nodes, &opts).unwrap();
        assert_eq!(ids_of(&report.roots), vec!["epic"]);
        assert_eq!(ids_of(&report.roots[0].children), vec!["story1"]);
        assert_eq!(ids_of(&report.roots[0].children[0].children), vec!["task"]);

        let opts = HierarchyOptions {
            state: Some(FeatureState::Released),
            ..Default::default()
        };
        assert!(engine.hierarchy(&nodes, &opts).unwrap().roots.is_empty());
    }

    #[test]
    fn test_cycles_are_marked_not_expanded() {
        let config = config();
        let engine = Engine::new(&config);
        let mut nodes = nodes(&["top", "a", "b"]);
        raw_edge(&mut nodes, "top", "contains", "a");
        raw_edge(&mut nodes, "a", "contains", "b");
        raw_edge(&mut nodes, "b", "contains", "a");

        let report = engine.hierarchy(&nodes, &HierarchyOptions::default()).unwrap();
        assert_eq!(ids_of(&report.roots), vec!["top"]);
        let back = &report.roots[0].children[0].children[0].children[0];
        assert_eq!(back.id, "a");
        assert!(back.cycle);
        assert!(back.children.is_empty());
    }

    #[test]
    fn test_hierarchy_type_fallbacks() {
        let config = config();
        let engine = Engine::new(&config);
        assert_eq!(engine.hierarchy_types(&["parent-of".into()]).unwrap(), vec!["contains"]);
        assert!(engine.hierarchy_types(&["nope".into()]).is_err());

        let mut config = Config::default();
        config.settings.hierarchy_type = None;
        let engine = Engine::new(&config);
        // First cycle-free type by name
        assert_eq!(engine.hierarchy_types(&[]).unwrap(), vec!["blocked-by"]);

        let mut schema = Schema::new();
        schema.categories.insert(
            "loose".into(),
            RelationshipCategory {
                allow_cycles: true,
                ..Default::default()
            },
        );
        schema.types.insert("near".into(), RelationshipTypeConfig::new("loose"));
        let config = Config {
            settings: config.settings.clone(),
            schema,
        };
        let engine = Engine::new(&config);
        assert_eq!(engine.hierarchy_types(&[]).unwrap_err(), GraphError::NoHierarchyType);
    }

    #[test]
    fn test_shared_children_expanded_once() {
        let config = config();
        let engine = Engine::new(&config);

        // Layers of two features, each containing both features of the next layer
        let layers = 16;
        let mut ids = vec!["top".to_string()];
        for layer in 0..layers {
            ids.push(format!("l{}a", layer));
            ids.push(format!("l{}b", layer));
        }
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut nodes = nodes(&id_refs);
        raw_edge(&mut nodes, "top", "contains", "l0a");
        raw_edge(&mut nodes, "top", "contains", "l0b");
        for layer in 0..layers - 1 {
            for parent in ["a", "b"] {
                for child in ["a", "b"] {
                    raw_edge(
                        &mut nodes,
                        &format!("l{}{}", layer, parent),
                        "contains",
                        &format!("l{}{}", layer + 1, child),
                    );
                }
            }
        }

        let report = engine.hierarchy(&nodes, &HierarchyOptions::default()).unwrap();
        assert_eq!(ids_of(&report.roots), vec!["top"]);
        // Every feature expanded once, plus one reference leaf per repeated edge
        assert!(report.total_nodes < 2 * nodes.len());

        let l0b = &report.roots[0].children[1];
        assert_eq!(l0b.id, "l0b");
        assert!(l0b.children.iter().all(|c| c.seen && c.children.is_empty()));
        assert!(!report.roots[0].children[0].children[0].seen);
    }
}
