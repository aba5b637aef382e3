//! Schema management: define, update and delete relationship types and
//! categories, carrying renames and deletions through every stored edge.
//!
//! Each operation builds the new configuration on a copy, checks it, and only
//! then rewrites edges and commits, so a rejected change leaves both the
//! configuration and the node set untouched.

use anyhow::Context;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crate::config::Config;
use crate::error::{GraphError, GraphResult};
use crate::models::Relationship;
use crate::node_set::{FeatureSink, NodeSet};
use crate::schema::{DetectionMode, RelationshipCategory, RelationshipTypeConfig, TypeBehavior};

/// A new relationship type
#[derive(Debug, Clone, Default)]
pub struct TypeDefinition {
    pub category: String,
    /// Inverse type; created in the same category when it does not exist
    pub inverse: Option<String>,
    pub bidirectional: bool,
    pub description: String,
    pub aliases: Vec<String>,
}

/// Changes to an existing type; `None` leaves a field as is
#[derive(Debug, Clone, Default)]
pub struct TypeUpdate {
    pub new_name: Option<String>,
    /// Keep the old name as an alias after a rename
    pub keep_alias: bool,
    pub category: Option<String>,
    pub description: Option<String>,
    pub aliases: Option<Vec<String>>,
}

/// Changes to an existing category; `None` leaves a field as is
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub new_name: Option<String>,
    pub allow_cycles: Option<bool>,
    pub cycle_detection: Option<DetectionMode>,
    pub include_in_impact: Option<bool>,
    pub description: Option<String>,
}

/// What to do with edges of a type being deleted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Refuse while any edge uses the type
    #[default]
    Restrict,
    /// Retype edges to the named replacement
    Migrate(String),
    /// Delete every edge of the type
    Cascade,
}

/// What to do with types of a category being deleted
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryDeletePolicy {
    /// Refuse while any type belongs to the category
    #[default]
    Restrict,
    /// Move the category's types to the named category
    MoveTypesTo(String),
    /// Delete the category's types and every edge of them
    Cascade,
}

/// Summary of a schema change
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renamed_to: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types_added: Vec<String>,
    pub types_updated: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub types_removed: Vec<String>,
    pub edges_updated: usize,
    pub edges_removed: usize,
    /// Features whose edges were rewritten
    #[serde(skip)]
    pub touched: BTreeSet<String>,
}

impl SchemaChange {
    /// Writes the configuration, then every touched feature in id order.
    /// When a feature write fails the error names the features still holding
    /// edges of the old schema.
    pub fn commit(
        &self,
        config: &Config,
        config_file: &Path,
        nodes: &NodeSet,
        sink: &mut dyn FeatureSink,
    ) -> anyhow::Result<()> {
        config.save(config_file)?;

        let pending: Vec<&str> = self
            .touched
            .iter()
            .map(String::as_str)
            .filter(|id| nodes.get(id).is_some())
            .collect();
        for (i, id) in pending.iter().enumerate() {
            if let Some(feature) = nodes.get(id) {
                sink.save(feature).with_context(|| {
                    format!(
                        "configuration saved but features not rewritten: {}",
                        pending[i..].join(", ")
                    )
                })?;
            }
        }
        tracing::debug!(features = pending.len(), "schema change committed");
        Ok(())
    }
}

enum EdgeAction {
    Keep,
    Retype(String),
    Remove,
}

/// Applies `action` to every edge. A retyped edge that would duplicate an
/// existing `(type, target)` pair on the same feature is dropped instead.
fn rewrite_edges<F>(nodes: &mut NodeSet, change: &mut SchemaChange, action: F)
where
    F: Fn(&Relationship) -> EdgeAction,
{
    for feature in nodes.iter_mut() {
        let mut present: HashSet<(String, String)> = feature
            .relationships
            .iter()
            .filter(|r| matches!(action(*r), EdgeAction::Keep))
            .map(|r| (r.rel_type.clone(), r.target_id.clone()))
            .collect();

        let mut modified = false;
        let mut kept = Vec::with_capacity(feature.relationships.len());
        for mut rel in std::mem::take(&mut feature.relationships) {
            match action(&rel) {
                EdgeAction::Keep => kept.push(rel),
                EdgeAction::Retype(new_type) => {
                    modified = true;
                    if present.insert((new_type.clone(), rel.target_id.clone())) {
                        rel.rel_type = new_type;
                        kept.push(rel);
                        change.edges_updated += 1;
                    } else {
                        change.edges_removed += 1;
                    }
                }
                EdgeAction::Remove => {
                    modified = true;
                    change.edges_removed += 1;
                }
            }
        }
        feature.relationships = kept;
        if modified {
            change.touched.insert(feature.id.clone());
        }
    }
}

fn count_edges(nodes: &NodeSet, types: &[&str]) -> usize {
    nodes
        .iter()
        .flat_map(|f| f.relationships.iter())
        .filter(|r| types.contains(&r.rel_type.as_str()))
        .count()
}

impl Config {
    fn ensure_type_name_free(&self, name: &str) -> GraphResult<()> {
        if name.trim().is_empty() {
            return Err(GraphError::InvalidSchema("type name must not be empty".to_string()));
        }
        if self.schema.type_name_taken(name) {
            return Err(GraphError::NameInUse {
                kind: "Type".to_string(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Replaces self with `next` after checking it
    fn commit(&mut self, next: Config) -> GraphResult<()> {
        next.schema.check()?;
        *self = next;
        Ok(())
    }

    /// Adds a category
    pub fn define_category(&mut self, name: &str, category: RelationshipCategory) -> GraphResult<SchemaChange> {
        if name.trim().is_empty() {
            return Err(GraphError::InvalidSchema("category name must not be empty".to_string()));
        }
        if self.schema.categories.contains_key(name) {
            return Err(GraphError::NameInUse {
                kind: "Category".to_string(),
                name: name.to_string(),
            });
        }

        let mut next = self.clone();
        next.schema.categories.insert(name.to_string(), category);
        self.commit(next)?;

        tracing::info!(category = name, "category defined");
        Ok(SchemaChange::default())
    }

    /// Adds a type. When the inverse does not exist yet it is created as the
    /// reverse half in the same category; an existing inverse is pointed back.
    pub fn define_type(&mut self, name: &str, def: TypeDefinition) -> GraphResult<SchemaChange> {
        self.ensure_type_name_free(name)?;
        self.schema.get_category(&def.category)?;
        if def.bidirectional && def.inverse.is_some() {
            return Err(GraphError::InvalidSchema(format!(
                "type '{}' cannot be bidirectional and declare an inverse",
                name
            )));
        }
        for alias in &def.aliases {
            if alias == name {
                return Err(GraphError::InvalidSchema(format!("type '{}' cannot alias itself", name)));
            }
            self.ensure_type_name_free(alias)?;
        }

        let mut next = self.clone();
        let mut change = SchemaChange {
            types_added: vec![name.to_string()],
            ..Default::default()
        };

        if let Some(inverse) = &def.inverse {
            if inverse == name {
                return Err(GraphError::InvalidSchema(format!(
                    "type '{}' cannot be its own inverse; declare it bidirectional",
                    name
                )));
            }
            let paired_with = next.schema.types.get(inverse).map(|existing| {
                (existing.bidirectional, existing.inverse.clone())
            });
            match paired_with {
                Some((bidirectional, current)) => {
                    if bidirectional {
                        return Err(GraphError::InvalidSchema(format!(
                            "'{}' is bidirectional and cannot be an inverse",
                            inverse
                        )));
                    }
                    if let Some(current) = current {
                        if current != name && next.schema.types.contains_key(&current) {
                            return Err(GraphError::InvalidSchema(format!(
                                "'{}' is already the inverse of '{}'",
                                inverse, current
                            )));
                        }
                    }
                    if let Some(existing) = next.schema.types.get_mut(inverse) {
                        existing.inverse = Some(name.to_string());
                    }
                    change.types_updated += 1;
                }
                None => {
                    if def.aliases.contains(inverse) {
                        return Err(GraphError::InvalidSchema(format!(
                            "'{}' cannot be both an alias and the inverse of '{}'",
                            inverse, name
                        )));
                    }
                    self.ensure_type_name_free(inverse)?;
                    let mut back = RelationshipTypeConfig::new(def.category.clone());
                    back.inverse = Some(name.to_string());
                    back.reverse = true;
                    next.schema.types.insert(inverse.clone(), back);
                    change.types_added.push(inverse.clone());
                }
            }
        }

        next.schema.types.insert(
            name.to_string(),
            RelationshipTypeConfig {
                category: def.category,
                inverse: def.inverse,
                bidirectional: def.bidirectional,
                reverse: false,
                description: def.description,
                aliases: def.aliases,
            },
        );
        self.commit(next)?;

        tracing::info!(rel_type = name, added = change.types_added.len(), "type defined");
        Ok(change)
    }

    /// Updates a type; a rename rewrites every edge of the type
    pub fn update_type(&mut self, nodes: &mut NodeSet, name: &str, update: TypeUpdate) -> GraphResult<SchemaChange> {
        let (canonical, _) = self.schema.resolve_type(name)?;
        let old = canonical.to_string();

        let mut next = self.clone();
        let mut change = SchemaChange::default();
        let mut config = next
            .schema
            .types
            .remove(&old)
            .ok_or_else(|| GraphError::UnknownType(old.clone()))?;

        if let Some(category) = update.category {
            next.schema.get_category(&category)?;
            config.category = category;
        }
        if let Some(description) = update.description {
            config.description = description;
        }
        if let Some(aliases) = update.aliases {
            config.aliases = aliases;
        }

        let mut new_name = old.clone();
        if let Some(renamed) = update.new_name.filter(|n| *n != old) {
            // The new name may currently be one of this type's own aliases
            config.aliases.retain(|a| *a != renamed);
            if renamed.trim().is_empty() || next.schema.type_name_taken(&renamed) {
                return Err(GraphError::NameInUse {
                    kind: "Type".to_string(),
                    name: renamed,
                });
            }
            if update.keep_alias && !config.aliases.contains(&old) {
                config.aliases.push(old.clone());
            }
            if let Some(inverse) = config.inverse.as_ref().and_then(|i| next.schema.types.get_mut(i)) {
                inverse.inverse = Some(renamed.clone());
                change.types_updated += 1;
            }
            if next.settings.hierarchy_type.as_deref() == Some(old.as_str()) {
                next.settings.hierarchy_type = Some(renamed.clone());
            }
            change.renamed_from = Some(old.clone());
            change.renamed_to = Some(renamed.clone());
            new_name = renamed;
        }

        next.schema.types.insert(new_name.clone(), config);
        change.types_updated += 1;
        self.commit(next)?;

        if new_name != old {
            rewrite_edges(nodes, &mut change, |rel| {
                if rel.rel_type == old {
                    EdgeAction::Retype(new_name.clone())
                } else {
                    EdgeAction::Keep
                }
            });
            tracing::info!(from = %old, to = %new_name, edges = change.edges_updated, "type renamed");
        }
        Ok(change)
    }

    /// Updates a category; a rename rewrites every type that referenced it
    pub fn update_category(&mut self, name: &str, update: CategoryUpdate) -> GraphResult<SchemaChange> {
        let mut next = self.clone();
        let mut category = next
            .schema
            .categories
            .remove(name)
            .ok_or_else(|| GraphError::UnknownCategory(name.to_string()))?;

        if let Some(allow) = update.allow_cycles {
            category.allow_cycles = allow;
            if allow && update.cycle_detection.is_none() {
                category.cycle_detection = DetectionMode::None;
            }
        }
        if let Some(mode) = update.cycle_detection {
            category.cycle_detection = mode;
        }
        if let Some(include) = update.include_in_impact {
            category.include_in_impact = include;
        }
        if let Some(description) = update.description {
            category.description = description;
        }

        let mut change = SchemaChange::default();
        let mut new_name = name.to_string();
        if let Some(renamed) = update.new_name.filter(|n| n != name) {
            if renamed.trim().is_empty() || next.schema.categories.contains_key(&renamed) {
                return Err(GraphError::NameInUse {
                    kind: "Category".to_string(),
                    name: renamed,
                });
            }
            for config in next.schema.types.values_mut() {
                if config.category == name {
                    config.category = renamed.clone();
                    change.types_updated += 1;
                }
            }
            change.renamed_from = Some(name.to_string());
            change.renamed_to = Some(renamed.clone());
            new_name = renamed;
        }

        next.schema.categories.insert(new_name, category);
        self.commit(next)?;

        tracing::info!(category = name, types_updated = change.types_updated, "category updated");
        Ok(change)
    }

    /// Deletes a type together with its inverse
    pub fn delete_type(&mut self, nodes: &mut NodeSet, name: &str, policy: DeletePolicy) -> GraphResult<SchemaChange> {
        let (canonical, _) = self.schema.resolve_type(name)?;
        let doomed = self.type_pair(canonical);
        self.delete_types(nodes, &doomed, policy)
    }

    /// Canonical names of a type and its inverse, if the inverse exists
    fn type_pair(&self, canonical: &str) -> Vec<String> {
        let mut pair = vec![canonical.to_string()];
        if let Ok(TypeBehavior::Directed { inverse, .. }) = self.schema.behavior(canonical) {
            if self.schema.types.contains_key(&inverse) && !pair.contains(&inverse) {
                pair.push(inverse);
            }
        }
        pair
    }

    fn delete_types(&mut self, nodes: &mut NodeSet, doomed: &[String], policy: DeletePolicy) -> GraphResult<SchemaChange> {
        let doomed_refs: Vec<&str> = doomed.iter().map(String::as_str).collect();
        let in_use = count_edges(nodes, &doomed_refs);

        // Replacement for each doomed type: None removes the edge
        let mut retype: Vec<(String, Option<String>)> = Vec::new();
        match &policy {
            DeletePolicy::Restrict => {
                if in_use > 0 {
                    return Err(GraphError::InUse {
                        kind: "Type".to_string(),
                        name: doomed[0].clone(),
                        usage: format!("{} relationship(s)", in_use),
                    });
                }
            }
            DeletePolicy::Migrate(replacement) => {
                let (target, _) = self.schema.resolve_type(replacement)?;
                if doomed.iter().any(|d| d == target) {
                    return Err(GraphError::InvalidSchema(format!(
                        "cannot migrate '{}' to a type that is being deleted",
                        doomed[0]
                    )));
                }
                let target = target.to_string();
                let target_inverse = self.schema.maintained_inverse(&target);
                retype.push((doomed[0].clone(), Some(target.clone())));
                if let Some(inverse) = doomed.get(1) {
                    retype.push((inverse.clone(), target_inverse));
                }
            }
            DeletePolicy::Cascade => {
                for name in doomed {
                    retype.push((name.clone(), None));
                }
            }
        }

        let mut next = self.clone();
        let mut change = SchemaChange::default();
        for name in doomed {
            next.schema.types.remove(name);
            change.types_removed.push(name.clone());
        }
        if let Some(configured) = next.settings.hierarchy_type.clone() {
            if doomed.contains(&configured) {
                next.settings.hierarchy_type = retype
                    .iter()
                    .find(|(from, _)| *from == configured)
                    .and_then(|(_, to)| to.clone());
            }
        }
        self.commit(next)?;

        rewrite_edges(nodes, &mut change, |rel| {
            match retype.iter().find(|(from, _)| *from == rel.rel_type) {
                Some((_, Some(to))) => EdgeAction::Retype(to.clone()),
                Some((_, None)) => EdgeAction::Remove,
                None => EdgeAction::Keep,
            }
        });

        tracing::info!(
            types = %doomed.join(", "),
            edges_updated = change.edges_updated,
            edges_removed = change.edges_removed,
            "type deleted"
        );
        Ok(change)
    }

    /// Deletes a category
    pub fn delete_category(
        &mut self,
        nodes: &mut NodeSet,
        name: &str,
        policy: CategoryDeletePolicy,
    ) -> GraphResult<SchemaChange> {
        let members: Vec<String> = self
            .schema
            .types_in_category(name)?
            .into_iter()
            .map(String::from)
            .collect();

        match policy {
            CategoryDeletePolicy::Restrict => {
                if !members.is_empty() {
                    return Err(GraphError::InUse {
                        kind: "Category".to_string(),
                        name: name.to_string(),
                        usage: format!("{} type(s): {}", members.len(), members.join(", ")),
                    });
                }
                let mut next = self.clone();
                next.schema.categories.remove(name);
                self.commit(next)?;
                tracing::info!(category = name, "category deleted");
                Ok(SchemaChange::default())
            }
            CategoryDeletePolicy::MoveTypesTo(target) => {
                if target == name {
                    return Err(GraphError::InvalidSchema(format!(
                        "cannot move types of '{}' into itself",
                        name
                    )));
                }
                self.schema.get_category(&target)?;

                let mut next = self.clone();
                let mut change = SchemaChange::default();
                for member in &members {
                    if let Some(config) = next.schema.types.get_mut(member) {
                        config.category = target.clone();
                        change.types_updated += 1;
                    }
                }
                next.schema.categories.remove(name);
                self.commit(next)?;

                tracing::info!(category = name, to = %target, types = change.types_updated, "category deleted, types moved");
                Ok(change)
            }
            CategoryDeletePolicy::Cascade => {
                let mut doomed: Vec<String> = Vec::new();
                for member in &members {
                    for type_name in self.type_pair(member) {
                        if !doomed.contains(&type_name) {
                            doomed.push(type_name);
                        }
                    }
                }

                let mut next = self.clone();
                next.schema.categories.remove(name);
                for type_name in &doomed {
                    next.schema.types.remove(type_name);
                }
                if next
                    .settings
                    .hierarchy_type
                    .as_ref()
                    .map_or(false, |h| doomed.contains(h))
                {
                    next.settings.hierarchy_type = None;
                }
                self.commit(next)?;

                let mut change = SchemaChange {
                    types_removed: doomed.clone(),
                    ..Default::default()
                };
                rewrite_edges(nodes, &mut change, |rel| {
                    if doomed.contains(&rel.rel_type) {
                        EdgeAction::Remove
                    } else {
                        EdgeAction::Keep
                    }
                });

                tracing::info!(
                    category = name,
                    types = change.types_removed.len(),
                    edges = change.edges_removed,
                    "category deleted with its types"
                );
                Ok(change)
            }
        }
    }
}
