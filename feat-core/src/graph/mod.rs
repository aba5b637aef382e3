//! Relationship graph engine
//!
//! All operations run over an explicit [`Schema`] and [`Settings`] pair and a
//! [`NodeSet`](crate::node_set::NodeSet) loaded up front. Queries and the
//! validator are read-only; edit and fix operations mutate the node set in
//! memory and report which features the caller must persist.

mod adjacency;
mod cycle;
mod edit;
mod fix;
mod hierarchy;
mod impact;
mod traverse;
mod validate;

pub use cycle::{CycleCheck, FoundCycle};
pub use edit::{
    LinkOptions, LinkOutcome, RemoveOutcome, RemoveSelector, RemovedRelationship,
};
pub use fix::{FixOptions, FixOutcome, FixReport, FixStatus};
pub use hierarchy::{HierarchyOptions, HierarchyReport, TreeNode};
pub use impact::{ImpactEntry, ImpactOptions, ImpactReport, ImpactScope};
pub use traverse::{
    StepDirection, TraversalReport, TraversalStep, TraverseDirection, TraverseOptions,
};
pub use validate::{IssueCode, Severity, ValidationIssue, ValidationReport};

use serde::Serialize;

use crate::config::{Config, Settings};
use crate::schema::Schema;

/// Entry point for every graph operation
#[derive(Debug, Clone, Copy)]
pub struct Engine<'a> {
    schema: &'a Schema,
    settings: &'a Settings,
}

impl<'a> Engine<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            schema: &config.schema,
            settings: &config.settings,
        }
    }

    pub fn from_parts(schema: &'a Schema, settings: &'a Settings) -> Self {
        Self { schema, settings }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }
}

/// Serializes records as line-delimited JSON, one record per line
pub fn to_json_lines<'r, T, I>(records: I) -> serde_json::Result<String>
where
    T: Serialize + 'r,
    I: IntoIterator<Item = &'r T>,
{
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::config::Config;
    use crate::models::{Feature, Relationship};
    use crate::node_set::NodeSet;

    /// Default configuration (auto-inverse on, hierarchy type `contains`)
    pub fn config() -> Config {
        Config::default()
    }

    /// Node set of features with the given ids; names are upper-cased ids
    pub fn nodes(ids: &[&str]) -> NodeSet {
        NodeSet::new(
            ids.iter()
                .map(|id| Feature::new(*id, id.to_uppercase()))
                .collect(),
        )
    }

    /// Pushes a raw edge without any engine bookkeeping
    pub fn raw_edge(nodes: &mut NodeSet, source: &str, rel_type: &str, target: &str) -> String {
        let rel = Relationship::new(rel_type, target, target.to_uppercase());
        let id = rel.id.clone();
        nodes
            .get_mut(source)
            .expect("fixture source exists")
            .relationships
            .push(rel);
        id
    }

    /// Edge (type, target) pairs stored on a feature
    pub fn edges(nodes: &NodeSet, id: &str) -> Vec<(String, String)> {
        nodes
            .get(id)
            .map(|f| {
                f.relationships
                    .iter()
                    .map(|r| (r.rel_type.clone(), r.target_id.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}
