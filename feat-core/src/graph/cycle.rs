//! Category-scoped cycle detection
//!
//! The search follows every edge whose type belongs to the candidate's
//! category, not just edges of the candidate's type, since mixed types in one
//! category can jointly close a cycle. Edges of the reverse half of an
//! inverse pair are flipped to the forward direction first, so that a
//! forward edge and its maintained inverse never count as a cycle.

use petgraph::algo::{astar, tarjan_scc};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::HashSet;

use super::Engine;
use crate::error::GraphResult;
use crate::node_set::NodeSet;
use crate::schema::{DetectionMode, TypeBehavior};

/// Outcome of checking a candidate edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleCheck {
    /// The category does not detect cycles; no search was run
    Skipped,
    /// The edge would not close a cycle
    Clear,
    /// The edge would close a cycle
    Cycle {
        category: String,
        mode: DetectionMode,
        /// Feature ids around the cycle, first and last equal
        path: Vec<String>,
    },
}

/// The relationship behind a category graph edge
#[derive(Debug, Clone, Copy)]
pub(crate) struct CategoryEdge<'n> {
    /// Feature that stores the relationship
    pub owner: &'n str,
    pub rel_id: &'n str,
    pub rel_type: &'n str,
}

/// All edges of one category, normalized to the forward direction. Only
/// the first relationship between two features is kept as the edge weight.
pub(crate) type CategoryGraph<'n> = DiGraphMap<&'n str, CategoryEdge<'n>>;

/// A cyclic component found by the exhaustive search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundCycle {
    pub category: String,
    /// One cycle through the component, first and last equal
    pub path: Vec<String>,
    /// Every feature in the strongly connected component, in node set order
    pub members: Vec<String>,
    /// Feature storing the edge that closes `path`
    pub owner: String,
    pub relationship_id: String,
    pub rel_type: String,
}

fn shortest_path<'n>(graph: &CategoryGraph<'n>, from: &'n str, goal: &str) -> Option<Vec<&'n str>> {
    astar(graph, from, |n| n == goal, |_| 1usize, |_| 0usize).map(|(_, path)| path)
}

impl<'a> Engine<'a> {
    /// Builds the normalized graph of every edge in `category`
    pub(crate) fn category_graph<'n>(&self, nodes: &'n NodeSet, category: &str) -> CategoryGraph<'n> {
        let mut graph = CategoryGraph::new();
        let mut reversed = Vec::new();

        for feature in nodes.iter() {
            for rel in &feature.relationships {
                let Some(target) = nodes.get(&rel.target_id) else {
                    continue;
                };
                let Ok((cat, _)) = self.schema.category_of(&rel.rel_type) else {
                    continue;
                };
                if cat != category {
                    continue;
                }
                let (owner, target) = (feature.id.as_str(), target.id.as_str());
                let edge = CategoryEdge {
                    owner,
                    rel_id: rel.id.as_str(),
                    rel_type: rel.rel_type.as_str(),
                };
                match self.schema.behavior(&rel.rel_type) {
                    Ok(TypeBehavior::Directed { forward: false, .. }) => {
                        reversed.push((target, owner, edge));
                    }
                    _ => {
                        if !graph.contains_edge(owner, target) {
                            graph.add_edge(owner, target, edge);
                        }
                    }
                }
            }
        }

        // Reverse halves only add connectivity their forward edge lacks
        for (from, to, edge) in reversed {
            if !graph.contains_edge(from, to) {
                graph.add_edge(from, to, edge);
            }
        }

        graph
    }

    /// Decides whether adding `(source, rel_type, target)` would close a
    /// cycle within the type's category
    pub fn check_cycle(
        &self,
        nodes: &NodeSet,
        source: &str,
        rel_type: &str,
        target: &str,
    ) -> GraphResult<CycleCheck> {
        let (category_name, category) = self.schema.category_of(rel_type)?;
        let mode = category.effective_detection();
        if mode == DetectionMode::None {
            return Ok(CycleCheck::Skipped);
        }

        let (from, to) = match self.schema.behavior(rel_type)? {
            TypeBehavior::Directed { forward: false, .. } => (target, source),
            _ => (source, target),
        };

        if from == to {
            return Ok(CycleCheck::Cycle {
                category: category_name.to_string(),
                mode,
                path: vec![from.to_string(), to.to_string()],
            });
        }

        let graph = self.category_graph(nodes, category_name);
        let Some(to_key) = nodes.get(to).map(|f| f.id.as_str()) else {
            return Ok(CycleCheck::Clear);
        };
        if !graph.contains_node(to_key) {
            return Ok(CycleCheck::Clear);
        }

        tracing::debug!(category = category_name, from, to, "searching for cycle");
        match shortest_path(&graph, to_key, from) {
            Some(found) => {
                let mut path = vec![from.to_string()];
                path.extend(found.into_iter().map(String::from));
                Ok(CycleCheck::Cycle {
                    category: category_name.to_string(),
                    mode,
                    path,
                })
            }
            None => Ok(CycleCheck::Clear),
        }
    }

    /// Finds every cyclic strongly connected component in every category
    /// that disallows cycles. Overlapping cycles share one component.
    pub fn find_cycles(&self, nodes: &NodeSet) -> Vec<FoundCycle> {
        let mut found = Vec::new();

        for (name, category) in &self.schema.categories {
            if category.allow_cycles {
                continue;
            }
            let graph = self.category_graph(nodes, name);

            let mut components: Vec<(usize, Vec<&str>)> = Vec::new();
            for component in tarjan_scc(&graph) {
                let members: HashSet<&str> = component.iter().copied().collect();
                let cyclic = members.len() > 1
                    || component.first().map(|&n| graph.contains_edge(n, n)).unwrap_or(false);
                if !cyclic {
                    continue;
                }
                // Node set order keeps the report stable
                let ordered: Vec<&str> = nodes
                    .iter()
                    .map(|f| f.id.as_str())
                    .filter(|id| members.contains(id))
                    .collect();
                let position = nodes.iter().position(|f| members.contains(f.id.as_str())).unwrap_or(0);
                components.push((position, ordered));
            }
            components.sort_by_key(|(position, _)| *position);

            for (_, members) in components {
                let Some(cycle) = cycle_through(&graph, name, &members) else {
                    continue;
                };
                found.push(cycle);
            }
        }

        tracing::debug!(cycles = found.len(), "exhaustive cycle search finished");
        found
    }
}

/// One cycle through a strongly connected component, starting and ending at
/// its first member
fn cycle_through<'n>(graph: &CategoryGraph<'n>, category: &str, members: &[&'n str]) -> Option<FoundCycle> {
    let start = *members.first()?;

    let next = graph
        .neighbors_directed(start, Direction::Outgoing)
        .find(|n| *n != start && members.contains(n))
        .unwrap_or(start);

    let mut path = vec![start];
    if next == start {
        path.push(start);
    } else {
        // Any path between two members stays inside the component
        path.extend(shortest_path(graph, next, start)?);
    }

    let closing_from = path[path.len() - 2];
    let edge = graph.edge_weight(closing_from, start)?;

    Some(FoundCycle {
        category: category.to_string(),
        path: path.iter().map(|n| n.to_string()).collect(),
        members: members.iter().map(|n| n.to_string()).collect(),
        owner: edge.owner.to_string(),
        relationship_id: edge.rel_id.to_string(),
        rel_type: edge.rel_type.to_string(),
    })
}
