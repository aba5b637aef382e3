use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::Feature;
use crate::node_set::{FeatureSink, NodeSet};

/// Subdirectory of the features directory holding one file per feature
pub const FEATURES_SUBDIR: &str = "features";

const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Reads and writes feature records as `<dir>/features/<id>.yaml`, with
/// file locking for rudimentary multi-process safety
pub struct FeatureStore {
    root: PathBuf,
}

impl FeatureStore {
    /// Creates a store over the given features directory
    pub fn new<P: AsRef<Path>>(features_dir: P) -> Self {
        Self {
            root: features_dir.as_ref().join(FEATURES_SUBDIR),
        }
    }

    /// Directory holding the feature files
    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.yaml", id))
    }

    fn lock_path_for(&self, id: &str) -> PathBuf {
        self.path_for(id).with_extension("yaml.lock")
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).exists()
    }

    /// Acquire an exclusive lock for writing one feature.
    /// The returned handle must be held during the write.
    fn acquire_write_lock(&self, id: &str) -> Result<File> {
        let lock_path = self.lock_path_for(id);
        fs::create_dir_all(&self.root)?;

        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {:?}", lock_path))?;

        let start = std::time::Instant::now();
        loop {
            match FileExt::try_lock_exclusive(&lock_file) {
                Ok(()) => return Ok(lock_file),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process may be editing: {:?}",
                            self.path_for(id)
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to acquire lock on {:?}", lock_path))
                }
            }
        }
    }

    /// Acquire a shared lock for reading, if a lock file exists
    fn acquire_read_lock(&self, id: &str) -> Result<Option<File>> {
        let lock_path = self.lock_path_for(id);
        if !lock_path.exists() {
            return Ok(None);
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {:?}", lock_path))?;

        let start = std::time::Instant::now();
        loop {
            match FileExt::try_lock_shared(&lock_file) {
                Ok(()) => return Ok(Some(lock_file)),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        anyhow::bail!(
                            "Timeout waiting for file lock - another process may be editing: {:?}",
                            self.path_for(id)
                        );
                    }
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to acquire lock on {:?}", lock_path))
                }
            }
        }
    }

    /// Loads one feature by id
    pub fn load(&self, id: &str) -> Result<Feature> {
        let path = self.path_for(id);
        let _lock = self.acquire_read_lock(id)?;

        let file = File::open(&path).with_context(|| format!("Failed to open file: {:?}", path))?;
        let feature: Feature = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse YAML from {:?}", path))?;
        Ok(feature)
    }

    /// Loads every feature, sorted by id
    pub fn list(&self) -> Result<Vec<Feature>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read directory: {:?}", self.root))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
        ids.sort();

        let mut features = Vec::with_capacity(ids.len());
        for id in ids {
            features.push(self.load(&id)?);
        }
        tracing::debug!(count = features.len(), dir = %self.root.display(), "features loaded");
        Ok(features)
    }

    /// Loads every feature into a node set
    pub fn load_node_set(&self) -> Result<NodeSet> {
        Ok(NodeSet::new(self.list()?))
    }

    /// Saves a feature with file locking
    pub fn save(&self, feature: &Feature) -> Result<()> {
        validate_id(&feature.id)?;
        let mut lock_file = self.acquire_write_lock(&feature.id)?;

        // Lock holder info, for debugging
        let _ = writeln!(
            lock_file,
            "Locked by PID {} at {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let path = self.path_for(&feature.id);
        let yaml = serde_yaml::to_string(feature)?;
        fs::write(&path, yaml).with_context(|| format!("Failed to write {:?}", path))?;

        tracing::debug!(id = %feature.id, "feature saved");
        Ok(())
    }

    /// Creates and saves a new feature; fails if the id is taken
    pub fn create(&self, id: &str, name: &str, category: Option<&str>) -> Result<Feature> {
        validate_id(id)?;
        if self.exists(id) {
            anyhow::bail!("Feature '{}' already exists", id);
        }

        let mut feature = Feature::new(id, name);
        feature.category = category.map(String::from);
        self.save(&feature)?;
        tracing::info!(id, "feature created");
        Ok(feature)
    }
}

impl FeatureSink for FeatureStore {
    fn save(&mut self, feature: &Feature) -> Result<()> {
        FeatureStore::save(self, feature)
    }
}

/// Feature ids become file names, so they must be plain names
fn validate_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        anyhow::bail!(
            "Invalid feature id '{}': use letters, digits, '-', '_' or '.'",
            id
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Relationship;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    #[test]
    fn test_create_load_and_list() {
        let dir = TempDir::new().unwrap();
        let store = FeatureStore::new(dir.path());

        store.create("search", "Search", Some("epic")).unwrap();
        store.create("auth", "Auth", None).unwrap();

        let loaded = store.load("search").unwrap();
        assert_eq!(loaded.name, "Search");
        assert_eq!(loaded.category.as_deref(), Some("epic"));

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["auth", "search"]);
        assert!(dir.path().join("features").join("auth.yaml").exists());
    }

    #[test]
    fn test_create_rejects_duplicates_and_bad_ids() {
        let dir = TempDir::new().unwrap();
        let store = FeatureStore::new(dir.path());

        store.create("auth", "Auth", None).unwrap();
        assert!(store.create("auth", "Again", None).is_err());
        assert!(store.create("../escape", "Nope", None).is_err());
        assert!(store.create("", "Empty", None).is_err());
    }

    #[test]
    fn test_relationships_round_trip_through_files() {
        let dir = TempDir::new().unwrap();
        let store = FeatureStore::new(dir.path());

        let mut feature = store.create("api", "API", None).unwrap();
        let mut rel = Relationship::new("depends-on", "auth", "Auth");
        rel.description = Some("token checks".into());
        feature.relationships.push(rel.clone());
        store.save(&feature).unwrap();

        let loaded = store.load("api").unwrap();
        assert_eq!(loaded.relationships, vec![rel]);
    }

    #[test]
    fn test_list_skips_lock_files_and_missing_dir() {
        let dir = TempDir::new().unwrap();
        let store = FeatureStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());

        store.create("one", "One", None).unwrap();
        store.create("two", "Two", None).unwrap();
        assert!(dir.path().join("features").join("one.yaml.lock").exists());
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_persist_through_sink() {
        let dir = TempDir::new().unwrap();
        let mut store = FeatureStore::new(dir.path());
        store.create("a", "A", None).unwrap();
        store.create("b", "B", None).unwrap();

        let mut nodes = store.load_node_set().unwrap();
        nodes
            .get_mut("a")
            .unwrap()
            .relationships
            .push(Relationship::new("blocks", "b", "B"));

        let touched: BTreeSet<String> = ["a".to_string()].into_iter().collect();
        let saved = nodes.persist(&touched, &mut store).unwrap();
        assert_eq!(saved, 1);
        assert_eq!(store.load("a").unwrap().relationships.len(), 1);
        assert!(store.load("b").unwrap().relationships.is_empty());
    }

    #[test]
    fn test_malformed_edges_still_load() {
        let dir = TempDir::new().unwrap();
        let store = FeatureStore::new(dir.path());
        fs::create_dir_all(store.path()).unwrap();
        fs::write(
            store.path_for("odd"),
            "id: odd\nname: Odd\nrelationships:\n  - type: depends-on\n",
        )
        .unwrap();

        let feature = store.load("odd").unwrap();
        assert_eq!(feature.relationships.len(), 1);
        assert!(feature.relationships[0].target_id.is_empty());
    }
}
