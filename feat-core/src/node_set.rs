//! The in-memory set of features the graph engine operates over

use anyhow::Result;
use std::collections::{BTreeSet, HashMap};

use crate::error::{GraphError, GraphResult};
use crate::models::Feature;

/// Maximum number of suggestions offered when a lookup misses
const MAX_SUGGESTIONS: usize = 5;

/// Minimum similarity for a name to be suggested
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// Receives features the engine has modified (the persistence callback)
pub trait FeatureSink {
    fn save(&mut self, feature: &Feature) -> Result<()>;
}

/// All features loaded for one invocation, in provider order
#[derive(Debug, Clone, Default)]
pub struct NodeSet {
    features: Vec<Feature>,
    index: HashMap<String, usize>,
    origins: HashMap<String, String>,
}

impl NodeSet {
    /// Builds a node set; a later feature with a duplicate id replaces the earlier one
    pub fn new(features: Vec<Feature>) -> Self {
        let mut set = Self::default();
        for feature in features {
            set.insert(feature);
        }
        set
    }

    /// Builds a node set from features annotated with the branch they came from
    pub fn with_origins(features: Vec<(Feature, String)>) -> Self {
        let mut set = Self::default();
        for (feature, branch) in features {
            set.origins.insert(feature.id.clone(), branch);
            set.insert(feature);
        }
        set
    }

    /// Adds or replaces a feature
    pub fn insert(&mut self, feature: Feature) {
        match self.index.get(&feature.id) {
            Some(&i) => self.features[i] = feature,
            None => {
                self.index.insert(feature.id.clone(), self.features.len());
                self.features.push(feature);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.index.get(id).map(|&i| &self.features[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Feature> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.features[i]),
            None => None,
        }
    }

    /// Looks up a feature by exact id, failing with `NotFound`
    pub fn require(&self, id: &str) -> GraphResult<&Feature> {
        self.get(id)
            .ok_or_else(|| GraphError::not_found("Feature", id))
    }

    pub(crate) fn require_mut(&mut self, id: &str) -> GraphResult<&mut Feature> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.features[i]),
            None => Err(GraphError::not_found("Feature", id)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Feature> {
        self.features.iter_mut()
    }

    /// Branch a feature was discovered on, if the provider annotated it
    pub fn origin(&self, id: &str) -> Option<&str> {
        self.origins.get(id).map(|s| s.as_str())
    }

    /// Display name of a feature, if present
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|f| f.name.as_str())
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    /// Resolves a feature by exact id, then by case-insensitive name.
    /// On a miss the error carries ranked suggestions.
    pub fn resolve(&self, query: &str) -> GraphResult<&Feature> {
        if let Some(feature) = self.get(query) {
            return Ok(feature);
        }

        let lowered = query.to_lowercase();
        if let Some(feature) = self
            .features
            .iter()
            .find(|f| f.id.to_lowercase() == lowered || f.name.to_lowercase() == lowered)
        {
            return Ok(feature);
        }

        Err(GraphError::NotFound {
            kind: "Feature".to_string(),
            query: query.to_string(),
            suggestions: self.suggest(query),
        })
    }

    /// Feature ids ranked by similarity of their id or name to `query`
    pub fn suggest(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let mut scored: Vec<(f64, &str)> = self
            .features
            .iter()
            .map(|f| {
                let by_id = strsim::jaro_winkler(&lowered, &f.id.to_lowercase());
                let by_name = strsim::jaro_winkler(&lowered, &f.name.to_lowercase());
                (by_id.max(by_name), f.id.as_str())
            })
            .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, id)| id.to_string())
            .collect()
    }

    /// Hands every touched feature to the sink, in id order
    pub fn persist(&self, touched: &BTreeSet<String>, sink: &mut dyn FeatureSink) -> Result<usize> {
        let mut saved = 0;
        for id in touched {
            if let Some(feature) = self.get(id) {
                sink.save(feature)?;
                saved += 1;
            }
        }
        Ok(saved)
    }
}
