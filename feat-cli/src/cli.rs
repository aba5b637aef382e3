use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "File-based feature tracking with a typed relationship graph")]
pub struct Cli {
    /// Features directory (defaults to FEAT_DIR, then the nearest .features/)
    #[clap(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[clap(long, short = 'v', global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new feature
    Add {
        /// Identifier of the feature (also its file name)
        id: String,

        /// Display name
        #[clap(long)]
        name: String,

        /// Free-form category (epic, story, ...)
        #[clap(long)]
        category: Option<String>,
    },

    /// List all features
    List {
        /// Emit one JSON record per line
        #[clap(long)]
        json: bool,
    },

    /// Add a relationship between two features
    Link {
        /// Source feature (id or name)
        source: String,

        /// Relationship type or alias
        #[clap(value_name = "TYPE")]
        rel_type: String,

        /// Target feature (id or name)
        target: String,

        /// Description of the relationship
        #[clap(long)]
        description: Option<String>,

        /// Version the target must satisfy, e.g. ">= 1.2"
        #[clap(long)]
        requires: Option<String>,
    },

    /// Remove relationships from a feature
    Unlink {
        /// Source feature (id or name)
        source: String,

        /// Target feature (id or name)
        target: Option<String>,

        /// Only remove relationships of this type
        #[clap(long = "type")]
        rel_type: Option<String>,

        /// Remove the relationship with this id
        #[clap(long, conflicts_with_all = &["target", "all"])]
        id: Option<String>,

        /// Remove every relationship of the source
        #[clap(long, conflicts_with = "target")]
        all: bool,
    },

    /// Show every feature affected by a change to a feature
    Impact {
        /// Feature to analyze (id or name)
        feature: String,

        /// Maximum depth (0 = unlimited)
        #[clap(long)]
        depth: Option<usize>,

        /// Follow every category, not only impact categories
        #[clap(long, conflicts_with_all = &["include", "exclude"])]
        all_categories: bool,

        /// Only follow these categories
        #[clap(long, value_delimiter = ',', conflicts_with = "exclude")]
        include: Vec<String>,

        /// Follow every category except these
        #[clap(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Emit one JSON record per line
        #[clap(long)]
        json: bool,
    },

    /// Walk relationships recursively in either direction
    Traverse {
        /// Starting feature (id or name)
        feature: String,

        /// Direction to follow: out, in or both
        #[clap(long, default_value = "out")]
        direction: String,

        /// Only follow these relationship types
        #[clap(long, value_delimiter = ',')]
        types: Vec<String>,

        /// Maximum depth (0 = unlimited)
        #[clap(long, default_value_t = 0)]
        depth: usize,

        /// Emit one JSON record per line
        #[clap(long)]
        json: bool,
    },

    /// Show the feature hierarchy as a tree
    Tree {
        /// Show only the tree under this feature
        feature: Option<String>,

        /// Hierarchy relationship types
        #[clap(long, value_delimiter = ',')]
        types: Vec<String>,

        /// Maximum depth (0 = unlimited)
        #[clap(long, default_value_t = 0)]
        depth: usize,

        /// Only show features of this category (and their ancestors)
        #[clap(long)]
        category: Option<String>,

        /// Only show features in this state (and their ancestors)
        #[clap(long)]
        state: Option<String>,

        /// Emit one JSON record per root
        #[clap(long)]
        json: bool,
    },

    /// Check the relationship graph for structural problems
    Validate {
        /// Emit one JSON record per issue
        #[clap(long)]
        json: bool,
    },

    /// Repair mechanically fixable validation issues
    Fix {
        /// Show what would be fixed without writing anything
        #[clap(long)]
        dry_run: bool,
    },

    /// Refresh cached target names on every relationship
    RefreshNames,

    /// Manage relationship types and categories
    #[clap(subcommand)]
    Schema(SchemaCommand),
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommand {
    /// Manage relationship types
    #[clap(subcommand)]
    Type(TypeCommand),

    /// Manage relationship categories
    #[clap(subcommand)]
    Category(CategoryCommand),
}

#[derive(Subcommand, Debug)]
pub enum TypeCommand {
    /// List all relationship types
    List,

    /// Show details for a relationship type
    Show {
        /// Type name or alias
        name: String,
    },

    /// Add a relationship type
    Add {
        /// Name of the type
        name: String,

        /// Category the type belongs to
        #[clap(long)]
        category: String,

        /// Inverse type (created if it does not exist)
        #[clap(long, conflicts_with = "bidirectional")]
        inverse: Option<String>,

        /// One edge represents both directions
        #[clap(long)]
        bidirectional: bool,

        /// Description of the type
        #[clap(long)]
        description: Option<String>,

        /// Alternative names (comma-separated)
        #[clap(long, value_delimiter = ',')]
        aliases: Vec<String>,
    },

    /// Edit or rename a relationship type
    Edit {
        /// Type name or alias
        name: String,

        /// New name; every relationship of the type is rewritten
        #[clap(long)]
        rename: Option<String>,

        /// Keep the old name as an alias after renaming
        #[clap(long, requires = "rename")]
        keep_alias: bool,

        /// Move the type to another category
        #[clap(long)]
        category: Option<String>,

        /// New description
        #[clap(long)]
        description: Option<String>,

        /// Replace the aliases (comma-separated)
        #[clap(long, value_delimiter = ',')]
        aliases: Option<Vec<String>>,
    },

    /// Remove a relationship type and its inverse
    Remove {
        /// Type name or alias
        name: String,

        /// Retype existing relationships to this type
        #[clap(long, conflicts_with = "cascade")]
        migrate_to: Option<String>,

        /// Delete existing relationships of the type
        #[clap(long)]
        cascade: bool,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    /// List all relationship categories
    List,

    /// Show details for a category
    Show {
        /// Category name
        name: String,
    },

    /// Add a relationship category
    Add {
        /// Name of the category
        name: String,

        /// Allow cycles among the category's relationships
        #[clap(long)]
        allow_cycles: bool,

        /// Cycle detection mode: strict, warn or none
        #[clap(long)]
        detection: Option<String>,

        /// Include the category in impact analysis
        #[clap(long)]
        impact: bool,

        /// Description of the category
        #[clap(long)]
        description: Option<String>,
    },

    /// Edit or rename a category
    Edit {
        /// Category name
        name: String,

        /// New name; every type in the category is updated
        #[clap(long)]
        rename: Option<String>,

        /// Allow or forbid cycles
        #[clap(long)]
        allow_cycles: Option<bool>,

        /// Cycle detection mode: strict, warn or none
        #[clap(long)]
        detection: Option<String>,

        /// Include or exclude the category from impact analysis
        #[clap(long)]
        impact: Option<bool>,

        /// New description
        #[clap(long)]
        description: Option<String>,
    },

    /// Remove a relationship category
    Remove {
        /// Category name
        name: String,

        /// Move the category's types to this category
        #[clap(long, conflicts_with = "cascade")]
        move_types_to: Option<String>,

        /// Delete the category's types and their relationships
        #[clap(long)]
        cascade: bool,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}
