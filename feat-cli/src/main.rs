mod cli;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feat_core::{
    config_path, determine_features_dir, CategoryDeletePolicy, CategoryUpdate, Config,
    DeletePolicy, DetectionMode, Engine, FeatureState, FeatureStore, FixOptions,
    FixStatus, HierarchyOptions, ImpactOptions, ImpactScope, LinkOptions, NodeSet,
    RelationshipCategory, RemoveOutcome, RemoveSelector, SchemaChange, Severity, StepDirection,
    TraverseDirection, TraverseOptions, TypeBehavior, TypeDefinition, TypeUpdate, VersionConstraint,
};

use crate::cli::{CategoryCommand, Cli, Command, SchemaCommand, TypeCommand};

/// Initialize tracing on stderr so stdout stays clean for JSON output
fn init_tracing(verbose: bool) {
    let directives = std::env::var("FEAT_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| if verbose { "debug" } else { "warn" }.into());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(directives))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let features_dir = determine_features_dir(cli.dir.as_deref())?;
    let config_file = config_path(&features_dir);
    let mut config = Config::load(&config_file)?;
    let mut store = FeatureStore::new(&features_dir);
    tracing::debug!(dir = %features_dir.display(), "using features directory");

    match &cli.command {
        Command::Add { id, name, category } => {
            add_feature(&store, id, name, category.as_deref())?;
        }
        Command::List { json } => {
            list_features(&store, *json)?;
        }
        Command::Link {
            source,
            rel_type,
            target,
            description,
            requires,
        } => {
            link_features(
                &config,
                &mut store,
                source,
                rel_type,
                target,
                description.clone(),
                requires.as_deref(),
            )?;
        }
        Command::Unlink {
            source,
            target,
            rel_type,
            id,
            all,
        } => {
            unlink_features(
                &config,
                &mut store,
                source,
                target.as_deref(),
                rel_type.clone(),
                id.clone(),
                *all,
            )?;
        }
        Command::Impact {
            feature,
            depth,
            all_categories,
            include,
            exclude,
            json,
        } => {
            let scope = if *all_categories {
                ImpactScope::All
            } else if !include.is_empty() {
                ImpactScope::Include(include.clone())
            } else if !exclude.is_empty() {
                ImpactScope::Exclude(exclude.clone())
            } else {
                ImpactScope::Default
            };
            let opts = ImpactOptions {
                max_depth: depth.unwrap_or(config.settings.default_impact_depth),
                scope,
            };
            show_impact(&config, &store, feature, &opts, *json)?;
        }
        Command::Traverse {
            feature,
            direction,
            types,
            depth,
            json,
        } => {
            let direction = TraverseDirection::from_str(direction).with_context(|| {
                format!("Invalid direction '{}' (expected out, in or both)", direction)
            })?;
            let opts = TraverseOptions {
                direction,
                types: types.clone(),
                max_depth: *depth,
            };
            show_traversal(&config, &store, feature, &opts, *json)?;
        }
        Command::Tree {
            feature,
            types,
            depth,
            category,
            state,
            json,
        } => {
            let state = match state {
                Some(s) => Some(
                    FeatureState::from_str(s).with_context(|| format!("Invalid state '{}'", s))?,
                ),
                None => None,
            };
            let opts = HierarchyOptions {
                types: types.clone(),
                root: feature.clone(),
                max_depth: *depth,
                category: category.clone(),
                state,
            };
            show_tree(&config, &store, &opts, *json)?;
        }
        Command::Validate { json } => {
            let has_errors = validate_graph(&config, &store, *json)?;
            if has_errors {
                std::process::exit(1);
            }
        }
        Command::Fix { dry_run } => {
            fix_graph(&config, &mut store, *dry_run)?;
        }
        Command::RefreshNames => {
            refresh_names(&config, &mut store)?;
        }
        Command::Schema(SchemaCommand::Type(cmd)) => {
            handle_type_command(cmd, &mut config, &config_file, &mut store)?;
        }
        Command::Schema(SchemaCommand::Category(cmd)) => {
            handle_category_command(cmd, &mut config, &config_file, &mut store)?;
        }
    }

    Ok(())
}

fn add_feature(store: &FeatureStore, id: &str, name: &str, category: Option<&str>) -> Result<()> {
    let feature = store.create(id, name, category)?;
    println!("{} Created feature '{}' ({})", "✓".green(), feature.name, feature.id);
    Ok(())
}

fn list_features(store: &FeatureStore, json: bool) -> Result<()> {
    let features = store.list()?;

    if json {
        print!("{}", feat_core::to_json_lines(&features)?);
        return Ok(());
    }

    if features.is_empty() {
        println!("{}", "No features found".yellow());
        return Ok(());
    }

    println!(
        "{:<20} {:<12} {:<8} {}",
        "ID".bold(),
        "STATE".bold(),
        "LINKS".bold(),
        "NAME".bold()
    );
    println!("{}", "=".repeat(60));
    for feature in &features {
        println!(
            "{:<20} {:<12} {:<8} {}",
            feature.id.cyan(),
            feature.state().to_string(),
            feature.relationships.len(),
            feature.name
        );
    }
    println!("\n{} features total", features.len());
    Ok(())
}

/// Display name of a relationship target: the live name when the target is
/// loaded, else the cached one
fn target_label<'n>(nodes: &'n NodeSet, target_id: &str, cached: &'n str) -> &'n str {
    nodes.name_of(target_id).unwrap_or(cached)
}

fn link_features(
    config: &Config,
    store: &mut FeatureStore,
    source: &str,
    rel_type: &str,
    target: &str,
    description: Option<String>,
    requires: Option<&str>,
) -> Result<()> {
    let mut nodes = store.load_node_set()?;
    let engine = Engine::new(config);

    let source_id = nodes.resolve(source)?.id.clone();
    let target_id = nodes.resolve(target)?.id.clone();
    let version_constraint = requires.map(VersionConstraint::parse).transpose()?;

    let outcome = engine.add_relationship(
        &mut nodes,
        &source_id,
        rel_type,
        &target_id,
        LinkOptions {
            description,
            version_constraint,
        },
    )?;
    nodes.persist(&outcome.touched, store)?;

    println!(
        "{} {} {} {}",
        "✓".green(),
        source_id.cyan(),
        format!("--{}-->", outcome.relationship.rel_type).yellow(),
        target_id.cyan()
    );
    if let Some(inverse) = &outcome.inverse {
        println!(
            "  {} {} {} {}",
            "↔".cyan(),
            target_id,
            format!("--{}-->", inverse.rel_type).dimmed(),
            source_id
        );
    }
    for warning in &outcome.warnings {
        println!("  {} {}", "⚠".yellow(), warning.yellow());
    }
    Ok(())
}

fn unlink_features(
    config: &Config,
    store: &mut FeatureStore,
    source: &str,
    target: Option<&str>,
    rel_type: Option<String>,
    id: Option<String>,
    all: bool,
) -> Result<()> {
    let mut nodes = store.load_node_set()?;
    let engine = Engine::new(config);
    let source_id = nodes.resolve(source)?.id.clone();

    let outcome = if all {
        engine.clear_relationships(&mut nodes, &source_id)?
    } else if let Some(id) = id {
        engine.remove_relationship(&mut nodes, &source_id, &RemoveSelector::Id(id))?
    } else if let Some(target) = target {
        // Edges may point at features that no longer exist
        let target_id = match nodes.resolve(target) {
            Ok(feature) => feature.id.clone(),
            Err(_) => target.to_string(),
        };
        engine.remove_relationship(
            &mut nodes,
            &source_id,
            &RemoveSelector::Target { target_id, rel_type },
        )?
    } else {
        anyhow::bail!("Specify a target, --id or --all");
    };

    nodes.persist(&outcome.touched, store)?;
    print_removed(&nodes, &outcome);
    Ok(())
}

fn print_removed(nodes: &NodeSet, outcome: &RemoveOutcome) {
    if outcome.removed.is_empty() {
        println!("{}", "No relationships to remove".yellow());
        return;
    }
    for removed in &outcome.removed {
        let rel = &removed.relationship;
        let marker = if removed.inverse { "↔".cyan() } else { "✓".green() };
        println!(
            "{} Removed {} {} {}",
            marker,
            removed.feature_id,
            format!("--{}-->", rel.rel_type).dimmed(),
            target_label(nodes, &rel.target_id, &rel.target_name)
        );
    }
    println!("\n{} relationships removed", outcome.removed.len());
}

fn show_impact(
    config: &Config,
    store: &FeatureStore,
    feature: &str,
    opts: &ImpactOptions,
    json: bool,
) -> Result<()> {
    let nodes = store.load_node_set()?;
    let engine = Engine::new(config);
    let start = nodes.resolve(feature)?.id.clone();
    let report = engine.impact(&nodes, &start, opts)?;

    if json {
        print!("{}", report.to_json_lines()?);
        return Ok(());
    }

    println!(
        "{} {} ({})",
        "Impact of".cyan().bold(),
        report.root_name.bold(),
        report.root_id
    );
    println!("{}", "=".repeat(60));
    println!("Categories: {}", report.categories.join(", ").dimmed());
    for warning in &report.root_warnings {
        println!("{} {}", "⚠".yellow(), warning.yellow());
    }

    if report.entries.is_empty() {
        println!("\n{}", "No affected features".green());
        return Ok(());
    }

    for (depth, entries) in report.by_depth() {
        println!("\n{}", format!("Depth {}", depth).bold());
        for entry in entries {
            println!(
                "  • {} ({}) {}",
                entry.feature_name,
                entry.feature_id.cyan(),
                format!("via {}", entry.rel_type).dimmed()
            );
            println!("    {}", entry.path.join(" → ").dimmed());
            for warning in &entry.warnings {
                println!("    {} {}", "⚠".yellow(), warning.yellow());
            }
        }
    }

    println!("\n{} affected features", report.total);
    if report.truncated {
        println!(
            "{}",
            format!("Stopped at depth {}; use --depth 0 for everything", opts.max_depth).yellow()
        );
    }
    Ok(())
}

fn show_traversal(
    config: &Config,
    store: &FeatureStore,
    feature: &str,
    opts: &TraverseOptions,
    json: bool,
) -> Result<()> {
    let nodes = store.load_node_set()?;
    let engine = Engine::new(config);
    let start = nodes.resolve(feature)?.id.clone();
    let report = engine.traverse(&nodes, &start, opts)?;

    if json {
        print!("{}", report.to_json_lines()?);
        return Ok(());
    }

    println!("{} {} ({})", "Traversal from".cyan().bold(), report.root_name.bold(), report.root_id);
    println!("{}", "=".repeat(60));
    for step in &report.steps {
        let indent = "  ".repeat(step.depth);
        let arrow = match step.direction {
            StepDirection::Outgoing => "→".green(),
            StepDirection::Incoming => "←".blue(),
        };
        println!(
            "{}{} {} {} {}",
            indent,
            arrow,
            step.source_name,
            format!("--{}-->", step.rel_type).dimmed(),
            step.target_name
        );
    }
    println!("\n{} relationships followed", report.total);
    Ok(())
}

fn show_tree(
    config: &Config,
    store: &FeatureStore,
    opts: &HierarchyOptions,
    json: bool,
) -> Result<()> {
    let nodes = store.load_node_set()?;
    let engine = Engine::new(config);
    let report = engine.hierarchy(&nodes, opts)?;

    if json {
        print!("{}", feat_core::to_json_lines(&report.roots)?);
        return Ok(());
    }

    if report.roots.is_empty() {
        println!("{}", "No features to show".yellow());
        return Ok(());
    }
    print!("{}", render::render_forest(&report.roots));
    println!(
        "\n{} features via {}",
        report.total_nodes,
        report.types.join(", ").dimmed()
    );
    Ok(())
}

/// Prints the validation report; returns whether errors were found
fn validate_graph(config: &Config, store: &FeatureStore, json: bool) -> Result<bool> {
    let nodes = store.load_node_set()?;
    let engine = Engine::new(config);
    let report = engine.validate(&nodes);

    if json {
        print!("{}", report.to_json_lines()?);
        return Ok(report.has_errors());
    }

    println!("{}", "Relationship Validation".cyan().bold());
    println!("{}", "=".repeat(60));
    println!(
        "Checked {} features, {} relationships",
        report.features_checked, report.relationships_checked
    );
    if !report.inverse_checks {
        println!(
            "{}",
            "Inverse checks (E002, E003) are off because auto_inverse is disabled".dimmed()
        );
    }

    if report.is_clean() {
        println!("\n{} No issues found", "✓".green());
        return Ok(false);
    }

    for (code, issues) in report.by_code() {
        println!(
            "\n{} {} ({})",
            code.to_string().red().bold(),
            code.title(),
            issues.len()
        );
        for issue in issues {
            let marker = match issue.severity {
                Severity::Error => "✗".red(),
                Severity::Warning => "⚠".yellow(),
            };
            let fixable = if issue.fixable { " [fixable]".green() } else { "".normal() };
            println!("  {} {}{}", marker, issue.message, fixable);
        }
    }

    println!("\n{} issues, {} fixable", report.issues.len(), report.fixable_count());
    if report.has_fixable_issues() {
        println!("Run {} to repair them", "feat fix".bold());
    }
    Ok(report.has_errors())
}

fn fix_graph(config: &Config, store: &mut FeatureStore, dry_run: bool) -> Result<()> {
    let mut nodes = store.load_node_set()?;
    let engine = Engine::new(config);
    let report = engine.validate(&nodes);

    if !report.has_fixable_issues() {
        println!("{} Nothing to fix", "✓".green());
        return Ok(());
    }

    let result = engine.fix(&mut nodes, &report, &FixOptions { dry_run });
    if !dry_run {
        nodes.persist(&result.touched, store)?;
    }

    let heading = if dry_run { "Auto-fix (dry run)" } else { "Auto-fix" };
    println!("{}", heading.cyan().bold());
    println!("{}", "=".repeat(60));
    for outcome in &result.outcomes {
        let status = match &outcome.status {
            FixStatus::Fixed if dry_run => "would fix".green(),
            FixStatus::Fixed => "fixed".green(),
            FixStatus::Skipped(reason) => format!("skipped: {}", reason).dimmed(),
            FixStatus::Failed(reason) => format!("failed: {}", reason).red(),
        };
        println!("  {} {} ({})", outcome.issue.code.to_string().bold(), outcome.issue.message, status);
    }
    println!(
        "\n{} fixed, {} skipped, {} failed",
        result.fixed, result.skipped, result.failed
    );

    if !dry_run {
        let after = engine.validate(&nodes);
        if after.is_clean() {
            println!("{} Re-validation found no issues", "✓".green());
        } else {
            println!(
                "{}",
                format!(
                    "Re-validation found {} remaining issues ({} fixable)",
                    after.issues.len(),
                    after.fixable_count()
                )
                .yellow()
            );
        }
    }
    Ok(())
}

fn refresh_names(config: &Config, store: &mut FeatureStore) -> Result<()> {
    let mut nodes = store.load_node_set()?;
    let engine = Engine::new(config);
    let (updated, touched) = engine.refresh_target_names(&mut nodes);
    let saved = nodes.persist(&touched, store)?;
    println!(
        "{} Refreshed {} relationship names across {} features",
        "✓".green(),
        updated,
        saved
    );
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    println!("{}", question);
    let confirmed = inquire::Confirm::new("Continue?")
        .with_default(false)
        .prompt()?;
    if !confirmed {
        println!("{}", "Cancelled".yellow());
    }
    Ok(confirmed)
}

/// Saves rewritten features, then the configuration
fn print_change(change: &SchemaChange) {
    if let (Some(from), Some(to)) = (&change.renamed_from, &change.renamed_to) {
        println!("  renamed {} → {}", from, to.cyan());
    }
    if !change.types_added.is_empty() {
        println!("  types added: {}", change.types_added.join(", "));
    }
    if !change.types_removed.is_empty() {
        println!("  types removed: {}", change.types_removed.join(", "));
    }
    if change.types_updated > 0 {
        println!("  types updated: {}", change.types_updated);
    }
    if change.edges_updated > 0 || change.edges_removed > 0 {
        println!(
            "  relationships updated: {}, removed: {} ({} features)",
            change.edges_updated,
            change.edges_removed,
            change.touched.len()
        );
    }
}

fn handle_type_command(
    cmd: &TypeCommand,
    config: &mut Config,
    config_file: &Path,
    store: &mut FeatureStore,
) -> Result<()> {
    match cmd {
        TypeCommand::List => {
            list_types(config);
        }
        TypeCommand::Show { name } => {
            let nodes = store.load_node_set()?;
            show_type(config, &nodes, name)?;
        }
        TypeCommand::Add {
            name,
            category,
            inverse,
            bidirectional,
            description,
            aliases,
        } => {
            let change = config.define_type(
                name,
                TypeDefinition {
                    category: category.clone(),
                    inverse: inverse.clone(),
                    bidirectional: *bidirectional,
                    description: description.clone().unwrap_or_default(),
                    aliases: aliases.clone(),
                },
            )?;
            config.save(config_file)?;
            println!("{} Added relationship type '{}'", "✓".green(), name);
            print_change(&change);
        }
        TypeCommand::Edit {
            name,
            rename,
            keep_alias,
            category,
            description,
            aliases,
        } => {
            let mut nodes = store.load_node_set()?;
            let change = config.update_type(
                &mut nodes,
                name,
                TypeUpdate {
                    new_name: rename.clone(),
                    keep_alias: *keep_alias,
                    category: category.clone(),
                    description: description.clone(),
                    aliases: aliases.clone(),
                },
            )?;
            change.commit(config, config_file, &nodes, store)?;
            println!("{} Updated relationship type '{}'", "✓".green(), name);
            print_change(&change);
        }
        TypeCommand::Remove {
            name,
            migrate_to,
            cascade,
            yes,
        } => {
            let policy = match (migrate_to, cascade) {
                (Some(target), _) => DeletePolicy::Migrate(target.clone()),
                (None, true) => DeletePolicy::Cascade,
                (None, false) => DeletePolicy::Restrict,
            };
            if !*yes {
                let question = match &policy {
                    DeletePolicy::Restrict => format!("Remove relationship type '{}' and its inverse?", name),
                    DeletePolicy::Migrate(target) => format!(
                        "Remove relationship type '{}' and its inverse, moving relationships to '{}'?",
                        name, target
                    ),
                    DeletePolicy::Cascade => format!(
                        "Remove relationship type '{}' and its inverse, deleting all their relationships?",
                        name
                    ),
                };
                if !confirm(&question)? {
                    return Ok(());
                }
            }

            let mut nodes = store.load_node_set()?;
            let change = config.delete_type(&mut nodes, name, policy)?;
            change.commit(config, config_file, &nodes, store)?;
            println!("{} Removed relationship type '{}'", "✓".green(), name);
            print_change(&change);
        }
    }
    Ok(())
}

fn list_types(config: &Config) {
    println!("{}", "Relationship Types".cyan().bold());
    println!("{}", "=".repeat(60));

    for (category_name, category) in &config.schema.categories {
        println!(
            "\n{} {}",
            category_name.green().bold(),
            format!("[{}]", category.effective_detection()).dimmed()
        );
        for (name, type_config) in config
            .schema
            .types
            .iter()
            .filter(|(_, t)| t.category == *category_name)
        {
            let shape = match config.schema.behavior(name) {
                Ok(TypeBehavior::Bidirectional) => "↔ bidirectional".to_string(),
                Ok(TypeBehavior::Directed { inverse, .. }) => format!("⇄ inverse: {}", inverse),
                _ => "→ one-way".to_string(),
            };
            println!("  {:<16} {}", name, shape.dimmed());
            if !type_config.aliases.is_empty() {
                println!("  {:<16} aliases: {}", "", type_config.aliases.join(", "));
            }
        }
    }

    println!("\n{} relationship types total", config.schema.types.len());
}

fn show_type(config: &Config, nodes: &NodeSet, name: &str) -> Result<()> {
    let (canonical, type_config) = config.schema.resolve_type(name)?;
    let usage = nodes
        .iter()
        .flat_map(|f| f.relationships.iter())
        .filter(|r| r.rel_type == canonical)
        .count();

    println!("{}", "Relationship Type".cyan().bold());
    println!("{}", "=".repeat(40));
    println!("{}: {}", "Name".bold(), canonical);
    println!("{}: {}", "Category".bold(), type_config.category);
    println!(
        "{}: {}",
        "Description".bold(),
        if type_config.description.is_empty() {
            "(none)"
        } else {
            type_config.description.as_str()
        }
    );
    println!(
        "{}: {}",
        "Bidirectional".bold(),
        if type_config.bidirectional { "Yes" } else { "No" }
    );
    if let Some(inverse) = &type_config.inverse {
        println!("{}: {}", "Inverse".bold(), inverse);
    }
    if !type_config.aliases.is_empty() {
        println!("{}: {}", "Aliases".bold(), type_config.aliases.join(", "));
    }
    println!("{}: {}", "Relationships".bold(), usage);
    Ok(())
}

fn parse_detection(value: Option<&str>) -> Result<Option<DetectionMode>> {
    Ok(value.map(DetectionMode::parse).transpose()?)
}

fn handle_category_command(
    cmd: &CategoryCommand,
    config: &mut Config,
    config_file: &Path,
    store: &mut FeatureStore,
) -> Result<()> {
    match cmd {
        CategoryCommand::List => {
            list_categories(config);
        }
        CategoryCommand::Show { name } => {
            show_category(config, name)?;
        }
        CategoryCommand::Add {
            name,
            allow_cycles,
            detection,
            impact,
            description,
        } => {
            let default_mode = if *allow_cycles {
                DetectionMode::None
            } else {
                DetectionMode::Strict
            };
            let category = RelationshipCategory {
                allow_cycles: *allow_cycles,
                cycle_detection: parse_detection(detection.as_deref())?.unwrap_or(default_mode),
                include_in_impact: *impact,
                description: description.clone().unwrap_or_default(),
            };
            config.define_category(name, category)?;
            config.save(config_file)?;
            println!("{} Added relationship category '{}'", "✓".green(), name);
        }
        CategoryCommand::Edit {
            name,
            rename,
            allow_cycles,
            detection,
            impact,
            description,
        } => {
            let change = config.update_category(
                name,
                CategoryUpdate {
                    new_name: rename.clone(),
                    allow_cycles: *allow_cycles,
                    cycle_detection: parse_detection(detection.as_deref())?,
                    include_in_impact: *impact,
                    description: description.clone(),
                },
            )?;
            config.save(config_file)?;
            println!("{} Updated relationship category '{}'", "✓".green(), name);
            print_change(&change);
        }
        CategoryCommand::Remove {
            name,
            move_types_to,
            cascade,
            yes,
        } => {
            let policy = match (move_types_to, cascade) {
                (Some(target), _) => CategoryDeletePolicy::MoveTypesTo(target.clone()),
                (None, true) => CategoryDeletePolicy::Cascade,
                (None, false) => CategoryDeletePolicy::Restrict,
            };
            if !*yes {
                let question = match &policy {
                    CategoryDeletePolicy::Restrict => format!("Remove category '{}'?", name),
                    CategoryDeletePolicy::MoveTypesTo(target) => format!(
                        "Remove category '{}', moving its types to '{}'?",
                        name, target
                    ),
                    CategoryDeletePolicy::Cascade => format!(
                        "Remove category '{}' with all its types and their relationships?",
                        name
                    ),
                };
                if !confirm(&question)? {
                    return Ok(());
                }
            }

            let mut nodes = store.load_node_set()?;
            let change = config.delete_category(&mut nodes, name, policy)?;
            change.commit(config, config_file, &nodes, store)?;
            println!("{} Removed relationship category '{}'", "✓".green(), name);
            print_change(&change);
        }
    }
    Ok(())
}

fn list_categories(config: &Config) {
    println!("{}", "Relationship Categories".cyan().bold());
    println!("{}", "=".repeat(60));

    for (name, category) in &config.schema.categories {
        let impact = if category.include_in_impact { "impact" } else { "no impact" };
        println!(
            "\n{} {}",
            name.green().bold(),
            format!("[{}, {}]", category.effective_detection(), impact).dimmed()
        );
        if !category.description.is_empty() {
            println!("  {}", category.description);
        }
        let types = config.schema.types_in_category(name).unwrap_or_default();
        if !types.is_empty() {
            println!("  {} {}", "types:".dimmed(), types.join(", "));
        }
    }

    println!("\n{} categories total", config.schema.categories.len());
}

fn show_category(config: &Config, name: &str) -> Result<()> {
    let category = config.schema.get_category(name)?;
    let types = config.schema.types_in_category(name)?;

    println!("{}", "Relationship Category".cyan().bold());
    println!("{}", "=".repeat(40));
    println!("{}: {}", "Name".bold(), name);
    println!(
        "{}: {}",
        "Description".bold(),
        if category.description.is_empty() {
            "(none)"
        } else {
            category.description.as_str()
        }
    );
    println!(
        "{}: {}",
        "Allow cycles".bold(),
        if category.allow_cycles { "Yes" } else { "No" }
    );
    println!("{}: {}", "Cycle detection".bold(), category.effective_detection());
    println!(
        "{}: {}",
        "Impact analysis".bold(),
        if category.include_in_impact { "Included" } else { "Excluded" }
    );
    if types.is_empty() {
        println!("{}: (none)", "Types".bold());
    } else {
        println!("{}: {}", "Types".bold(), types.join(", "));
    }
    Ok(())
}
