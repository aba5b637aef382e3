pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod node_set;
pub mod schema;
pub mod schema_ops;
pub mod storage;
pub mod version;

// Re-export commonly used types
pub use config::{
    config_path, determine_features_dir, Config, Settings, CONFIG_FILE_NAME, FEATURES_DIR_NAME,
};
pub use error::{GraphError, GraphResult};
pub use graph::{
    to_json_lines,
    // Cycle detection
    CycleCheck,
    Engine,
    // Auto-fix
    FixOptions,
    FixOutcome,
    FixReport,
    FixStatus,
    FoundCycle,
    // Hierarchy
    HierarchyOptions,
    HierarchyReport,
    // Impact analysis
    ImpactEntry,
    ImpactOptions,
    ImpactReport,
    ImpactScope,
    IssueCode,
    // Edits
    LinkOptions,
    LinkOutcome,
    RemoveOutcome,
    RemoveSelector,
    RemovedRelationship,
    Severity,
    StepDirection,
    TraversalReport,
    TraversalStep,
    // Traversal
    TraverseDirection,
    TraverseOptions,
    TreeNode,
    // Validation
    ValidationIssue,
    ValidationReport,
};
pub use models::{Feature, FeatureState, Relationship, Version};
pub use node_set::{FeatureSink, NodeSet};
pub use schema::{
    default_schema, DetectionMode, RelationshipCategory, RelationshipTypeConfig, Schema,
    TypeBehavior,
};
pub use schema_ops::{
    CategoryDeletePolicy, CategoryUpdate, DeletePolicy, SchemaChange, TypeDefinition, TypeUpdate,
};
pub use storage::FeatureStore;
pub use version::{compare_versions, ConstraintOp, VersionConstraint};
