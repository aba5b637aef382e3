//! petgraph view of the relationships between loaded features

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use crate::models::Relationship;
use crate::node_set::NodeSet;

/// Directed graph keyed by feature id. Parallel relationships between the
/// same two features share one graph edge, in relationship order.
pub(crate) struct FeatureGraph<'n> {
    graph: DiGraphMap<&'n str, Vec<&'n Relationship>>,
}

impl<'n> FeatureGraph<'n> {
    /// Every loaded feature becomes a node; relationships accepted by `keep`
    /// whose target is loaded become edges
    pub fn build(nodes: &'n NodeSet, mut keep: impl FnMut(&Relationship) -> bool) -> Self {
        let mut graph: DiGraphMap<&'n str, Vec<&'n Relationship>> = DiGraphMap::new();
        for feature in nodes.iter() {
            graph.add_node(feature.id.as_str());
        }

        for feature in nodes.iter() {
            for rel in &feature.relationships {
                if !keep(rel) {
                    continue;
                }
                let Some(target) = nodes.get(&rel.target_id) else {
                    continue;
                };
                let (from, to) = (feature.id.as_str(), target.id.as_str());
                match graph.edge_weight_mut(from, to) {
                    Some(rels) => rels.push(rel),
                    None => {
                        graph.add_edge(from, to, vec![rel]);
                    }
                }
            }
        }

        Self { graph }
    }

    /// Neighbours of `id` in `dir`, each with the first relationship joining
    /// them, in the order the edges were added
    pub fn neighbors(
        &self,
        id: &'n str,
        dir: Direction,
    ) -> impl Iterator<Item = (&'n str, &'n Relationship)> + '_ {
        self.graph.neighbors_directed(id, dir).filter_map(move |other| {
            let (from, to) = match dir {
                Direction::Outgoing => (id, other),
                Direction::Incoming => (other, id),
            };
            self.graph
                .edge_weight(from, to)
                .and_then(|rels| rels.first().copied())
                .map(|rel| (other, rel))
        })
    }

    /// True when another feature has an edge into `id`
    pub fn has_parent(&self, id: &'n str) -> bool {
        self.graph
            .neighbors_directed(id, Direction::Incoming)
            .any(|parent| parent != id)
    }
}
