//! Recursive relationship traversal in either direction

use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;

use super::adjacency::FeatureGraph;
use super::Engine;
use crate::error::GraphResult;
use crate::node_set::NodeSet;

/// Which edges to follow from each feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraverseDirection {
    #[default]
    Outgoing,
    Incoming,
    Both,
}

impl TraverseDirection {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "out" | "outgoing" => Some(TraverseDirection::Outgoing),
            "in" | "incoming" => Some(TraverseDirection::Incoming),
            "both" | "all" => Some(TraverseDirection::Both),
            _ => None,
        }
    }

    /// Edge directions to expand, outgoing first
    fn edge_directions(self) -> &'static [Direction] {
        match self {
            TraverseDirection::Outgoing => &[Direction::Outgoing],
            TraverseDirection::Incoming => &[Direction::Incoming],
            TraverseDirection::Both => &[Direction::Outgoing, Direction::Incoming],
        }
    }
}

/// Direction of a single traversed edge relative to the feature it was followed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDirection {
    Outgoing,
    Incoming,
}

impl From<Direction> for StepDirection {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::Outgoing => StepDirection::Outgoing,
            Direction::Incoming => StepDirection::Incoming,
        }
    }
}

impl fmt::Display for StepDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepDirection::Outgoing => write!(f, "outgoing"),
            StepDirection::Incoming => write!(f, "incoming"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    pub direction: TraverseDirection,
    /// Types to follow (names or aliases); empty follows every type
    pub types: Vec<String>,
    /// Maximum depth; 0 means unlimited
    pub max_depth: usize,
}

/// One edge followed during traversal
#[derive(Debug, Clone, Serialize)]
pub struct TraversalStep {
    pub depth: usize,
    pub direction: StepDirection,
    pub rel_type: String,
    pub relationship_id: String,
    pub source_id: String,
    pub source_name: String,
    pub target_id: String,
    pub target_name: String,
    /// The feature this step discovered
    pub reached_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraversalReport {
    pub root_id: String,
    pub root_name: String,
    pub steps: Vec<TraversalStep>,
    pub total: usize,
}

impl TraversalReport {
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        super::to_json_lines(&self.steps)
    }
}

impl<'a> Engine<'a> {
    /// Breadth-first traversal from `start` following outgoing and/or
    /// incoming edges of the selected types
    pub fn traverse(&self, nodes: &NodeSet, start: &str, opts: &TraverseOptions) -> GraphResult<TraversalReport> {
        let root = nodes.require(start)?;

        let mut types = HashSet::new();
        for name in &opts.types {
            types.insert(self.schema.resolve_type(name)?.0.to_string());
        }
        let graph = FeatureGraph::build(nodes, |rel| types.is_empty() || types.contains(&rel.rel_type));

        let mut steps = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(root.id.as_str());
        let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
        queue.push_back((root.id.as_str(), 0));

        while let Some((id, depth)) = queue.pop_front() {
            if opts.max_depth > 0 && depth >= opts.max_depth {
                continue;
            }

            for &dir in opts.direction.edge_directions() {
                for (next, rel) in graph.neighbors(id, dir) {
                    if !visited.insert(next) {
                        continue;
                    }
                    let (source_id, target_id) = match dir {
                        Direction::Outgoing => (id, next),
                        Direction::Incoming => (next, id),
                    };
                    steps.push(TraversalStep {
                        depth: depth + 1,
                        direction: dir.into(),
                        rel_type: rel.rel_type.clone(),
                        relationship_id: rel.id.clone(),
                        source_id: source_id.to_string(),
                        source_name: nodes.name_of(source_id).unwrap_or(source_id).to_string(),
                        target_id: target_id.to_string(),
                        target_name: nodes.name_of(target_id).unwrap_or(target_id).to_string(),
                        reached_id: next.to_string(),
                    });
                    queue.push_back((next, depth + 1));
                }
            }
        }

        tracing::debug!(root = %root.id, steps = steps.len(), "traversal finished");
        Ok(TraversalReport {
            root_id: root.id.clone(),
            root_name: root.name.clone(),
            total: steps.len(),
            steps,
        })
    }
}
