//! Relationship edit operations
//!
//! Each operation checks everything it needs before touching the node set,
//! so a failed call leaves every feature unchanged.

use serde::Serialize;
use std::collections::BTreeSet;

use super::cycle::CycleCheck;
use super::Engine;
use crate::error::{GraphError, GraphResult};
use crate::models::Relationship;
use crate::node_set::NodeSet;
use crate::schema::{DetectionMode, TypeBehavior};
use crate::version::VersionConstraint;

/// Optional attributes of a new relationship
#[derive(Debug, Clone, Default)]
pub struct LinkOptions {
    pub description: Option<String>,
    pub version_constraint: Option<VersionConstraint>,
}

/// Result of adding a relationship
#[derive(Debug, Clone, Serialize)]
pub struct LinkOutcome {
    pub source_id: String,
    /// The edge stored on the source
    pub relationship: Relationship,
    /// The inverse edge stored on the target, when one was created
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverse: Option<Relationship>,
    /// Cycle warnings raised under `warn` detection
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip)]
    pub touched: BTreeSet<String>,
}

/// Selects which relationships to remove from a feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveSelector {
    /// A single edge by its identifier
    Id(String),
    /// Edges to a target, optionally restricted to one type
    Target {
        target_id: String,
        rel_type: Option<String>,
    },
}

/// An edge removed from a feature
#[derive(Debug, Clone, Serialize)]
pub struct RemovedRelationship {
    pub feature_id: String,
    pub relationship: Relationship,
    /// True when this is an inverse removed alongside its forward edge
    pub inverse: bool,
}

/// Result of a removal
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoveOutcome {
    pub removed: Vec<RemovedRelationship>,
    #[serde(skip)]
    pub touched: BTreeSet<String>,
}

impl RemoveOutcome {
    fn record(&mut self, feature_id: &str, relationship: Relationship, inverse: bool) {
        self.touched.insert(feature_id.to_string());
        self.removed.push(RemovedRelationship {
            feature_id: feature_id.to_string(),
            relationship,
            inverse,
        });
    }
}

impl<'a> Engine<'a> {
    /// Adds `(source, rel_type, target)`, maintaining the inverse edge when
    /// auto-inverse is enabled and the type declares one
    pub fn add_relationship(
        &self,
        nodes: &mut NodeSet,
        source: &str,
        rel_type: &str,
        target: &str,
        opts: LinkOptions,
    ) -> GraphResult<LinkOutcome> {
        let (canonical, _) = self.schema.resolve_type(rel_type)?;
        let canonical = canonical.to_string();
        let behavior = self.schema.behavior(&canonical)?;

        let source_feature = nodes.require(source)?;
        let target_feature = nodes.require(target)?;
        let source_name = source_feature.name.clone();
        let target_name = target_feature.name.clone();

        let duplicate = source_feature.has_relationship(&canonical, target)
            || (behavior == TypeBehavior::Bidirectional
                && target_feature.has_relationship(&canonical, source));
        if duplicate {
            return Err(GraphError::DuplicateRelationship {
                source_id: source.to_string(),
                rel_type: canonical,
                target_id: target.to_string(),
            });
        }

        let mut warnings = Vec::new();
        if let CycleCheck::Cycle { category, mode, path } =
            self.check_cycle(nodes, source, &canonical, target)?
        {
            if mode == DetectionMode::Strict {
                return Err(GraphError::CycleDetected {
                    source_id: source.to_string(),
                    rel_type: canonical,
                    target_id: target.to_string(),
                    category,
                    path,
                });
            }
            let warning = format!(
                "'{}' from '{}' to '{}' closes a cycle in category '{}': {}",
                canonical,
                source,
                target,
                category,
                path.join(" -> ")
            );
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }

        let inverse_type = if self.settings.auto_inverse {
            self.schema.maintained_inverse(&canonical)
        } else {
            None
        };

        let mut relationship = Relationship::new(canonical.as_str(), target, target_name);
        relationship.description = opts.description;
        relationship.version_constraint = opts.version_constraint;

        let mut touched = BTreeSet::new();
        nodes.require_mut(source)?.relationships.push(relationship.clone());
        touched.insert(source.to_string());

        let mut inverse = None;
        if let Some(inverse_type) = inverse_type {
            let target_feature = nodes.require_mut(target)?;
            if !target_feature.has_relationship(&inverse_type, source) {
                let mut back = Relationship::new(inverse_type, source, source_name);
                back.description = relationship.description.clone();
                target_feature.relationships.push(back.clone());
                touched.insert(target.to_string());
                inverse = Some(back);
            }
        }

        tracing::info!(
            source,
            rel_type = %canonical,
            target,
            inverse = inverse.is_some(),
            "relationship added"
        );

        Ok(LinkOutcome {
            source_id: source.to_string(),
            relationship,
            inverse,
            warnings,
            touched,
        })
    }

    /// Removes the selected edge(s) from `source` and, under auto-inverse,
    /// their inverse edges from the targets. Missing inverses are ignored.
    pub fn remove_relationship(
        &self,
        nodes: &mut NodeSet,
        source: &str,
        selector: &RemoveSelector,
    ) -> GraphResult<RemoveOutcome> {
        let type_filter = match selector {
            RemoveSelector::Target {
                rel_type: Some(t), ..
            } => Some(self.schema.resolve_type(t)?.0.to_string()),
            _ => None,
        };

        let matches = |rel: &Relationship| match selector {
            RemoveSelector::Id(id) => rel.id == *id,
            RemoveSelector::Target { target_id, .. } => {
                rel.target_id == *target_id
                    && type_filter.as_ref().map_or(true, |t| rel.rel_type == *t)
            }
        };

        let source_feature = nodes.require(source)?;
        let on_source = source_feature.relationships.iter().any(&matches);

        // A bidirectional edge may be stored on the other end
        let mut stored_on_target = None;
        if !on_source {
            if let RemoveSelector::Target { target_id, .. } = selector {
                let target_feature = nodes.get(target_id);
                let back = target_feature.and_then(|t| {
                    t.relationships.iter().find(|r| {
                        r.target_id == source
                            && type_filter.as_ref().map_or(true, |f| r.rel_type == *f)
                            && self.schema.behavior(&r.rel_type).ok()
                                == Some(TypeBehavior::Bidirectional)
                    })
                });
                stored_on_target = back.map(|r| (target_id.clone(), r.id.clone()));
            }
        }

        if !on_source && stored_on_target.is_none() {
            let query = match selector {
                RemoveSelector::Id(id) => id.clone(),
                RemoveSelector::Target { target_id, rel_type } => match rel_type {
                    Some(t) => format!("{} -> {} ({})", source, target_id, t),
                    None => format!("{} -> {}", source, target_id),
                },
            };
            return Err(GraphError::not_found("Relationship", query));
        }

        let mut outcome = RemoveOutcome::default();

        if let Some((owner, rel_id)) = stored_on_target {
            let owner_feature = nodes.require_mut(&owner)?;
            if let Some(pos) = owner_feature.relationships.iter().position(|r| r.id == rel_id) {
                let rel = owner_feature.relationships.remove(pos);
                outcome.record(&owner, rel, false);
            }
        } else {
            let source_feature = nodes.require_mut(source)?;
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut source_feature.relationships)
                .into_iter()
                .partition(|r| matches(r));
            source_feature.relationships = kept;

            for rel in removed {
                self.remove_inverse_of(nodes, source, &rel, &mut outcome);
                outcome.record(source, rel, false);
            }
        }

        tracing::info!(source, removed = outcome.removed.len(), "relationships removed");
        Ok(outcome)
    }

    /// Removes every outgoing edge of `source` and, under auto-inverse, each
    /// corresponding inverse edge on the targets
    pub fn clear_relationships(&self, nodes: &mut NodeSet, source: &str) -> GraphResult<RemoveOutcome> {
        let source_feature = nodes.require_mut(source)?;
        let removed = std::mem::take(&mut source_feature.relationships);

        let mut outcome = RemoveOutcome::default();
        for rel in removed {
            self.remove_inverse_of(nodes, source, &rel, &mut outcome);
            outcome.record(source, rel, false);
        }

        tracing::info!(source, removed = outcome.removed.len(), "relationships cleared");
        Ok(outcome)
    }

    fn remove_inverse_of(
        &self,
        nodes: &mut NodeSet,
        source: &str,
        rel: &Relationship,
        outcome: &mut RemoveOutcome,
    ) {
        if !self.settings.auto_inverse {
            return;
        }
        let Some(inverse_type) = self.schema.maintained_inverse(&rel.rel_type) else {
            return;
        };
        let Some(target) = nodes.get_mut(&rel.target_id) else {
            return;
        };
        if let Some(pos) = target
            .relationships
            .iter()
            .position(|r| r.rel_type == inverse_type && r.target_id == source)
        {
            let back = target.relationships.remove(pos);
            let target_id = target.id.clone();
            outcome.record(&target_id, back, true);
        }
    }

    /// Re-synchronizes the cached target name on every edge whose target
    /// resolves. Returns the number of edges updated.
    pub fn refresh_target_names(&self, nodes: &mut NodeSet) -> (usize, BTreeSet<String>) {
        let names: std::collections::HashMap<String, String> = nodes
            .iter()
            .map(|f| (f.id.clone(), f.name.clone()))
            .collect();

        let mut updated = 0;
        let mut touched = BTreeSet::new();
        for feature in nodes.iter_mut() {
            for rel in &mut feature.relationships {
                if let Some(name) = names.get(&rel.target_id) {
                    if rel.target_name != *name {
                        rel.target_name = name.clone();
                        updated += 1;
                        touched.insert(feature.id.clone());
                    }
                }
            }
        }

        tracing::info!(updated, "target names refreshed");
        (updated, touched)
    }
}
