use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};

use revise_merge::{diff_entities, merge_fields, ConflictReport, EntityDiff, FieldChange};
use revise_resolver::{ResolveError, ResolverConfig, UpdateResolver};
use revise_store::{InMemoryRevisionStore, RetryingStore};
use revise_types::{DatasetId, Entity, EntityId};

use crate::cli::*;

/// Exit status for a write that could not be resolved automatically.
const EXIT_CONFLICT: i32 = 1;

pub fn run_command(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Merge(args) => cmd_merge(args, cli.format),
        Command::Diff(args) => cmd_diff(args, cli.format),
        Command::Resolve(args) => cmd_resolve(args, cli.format),
        Command::CheckConfig(args) => cmd_check_config(args),
    }
}

fn cmd_merge(args: MergeArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let incoming = load_entity(&args.incoming)?;
    let base = load_entity(&args.base)?;
    let current = load_entity(&args.current)?;

    match merge_fields(&incoming, &base, &current).into_result() {
        Ok(merged) => {
            match format {
                OutputFormat::Json => print_json(&merged.to_json())?,
                OutputFormat::Text => {
                    println!("{} Merged cleanly", "✓".green().bold());
                    println!("{}", serde_json::to_string_pretty(&merged.to_json())?);
                }
            }
            Ok(0)
        }
        Err(report) => {
            match format {
                OutputFormat::Json => print_json(&serde_json::to_value(&report)?)?,
                OutputFormat::Text => print_conflicts(&report),
            }
            Ok(EXIT_CONFLICT)
        }
    }
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let old = load_entity(&args.old)?;
    let new = load_entity(&args.new)?;
    let diff = diff_entities(&old, &new);
    match format {
        OutputFormat::Json => print_json(&serde_json::to_value(&diff)?)?,
        OutputFormat::Text => print_diff(&diff),
    }
    Ok(0)
}

fn cmd_resolve(args: ResolveArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let dataset = DatasetId::new(args.dataset.as_str())?;
    let id = EntityId::new(args.id.as_str())?;
    let resolver = build_resolver(&args, &dataset, &id)?;
    let proposed = load_entity(&args.proposed)?;

    let outcome = if args.apply {
        resolver
            .apply_write(&dataset, &id, proposed)
            .map(|applied| (applied.kind, applied.entity))
    } else {
        resolver
            .resolve_write(&dataset, &id, proposed)
            .map(|resolution| (resolution.kind, resolution.entity))
    };

    match outcome {
        Ok((kind, entity)) => {
            match format {
                OutputFormat::Json => print_json(&json!({
                    "resolution": kind,
                    "entity": entity.to_json(),
                }))?,
                OutputFormat::Text => {
                    println!("{} Resolved as {:?}", "✓".green().bold(), kind);
                    println!("{}", serde_json::to_string_pretty(&entity.to_json())?);
                }
            }
            Ok(0)
        }
        Err(ResolveError::Conflict(conflict)) => {
            match format {
                OutputFormat::Json => print_json(&conflict.to_body())?,
                OutputFormat::Text => {
                    println!(
                        "{} {} ({})",
                        "✗".red().bold(),
                        conflict.message(),
                        conflict.status_code()
                    );
                    if let revise_resolver::ConflictResult::MergeConflict { report, .. } = &conflict {
                        print_conflicts(report);
                    }
                }
            }
            Ok(EXIT_CONFLICT)
        }
        Err(other) => Err(other.into()),
    }
}

/// Seed an in-memory store from `--history` and wrap it in the retry
/// policy from `--config`.
fn build_resolver(
    args: &ResolveArgs,
    dataset: &DatasetId,
    id: &EntityId,
) -> anyhow::Result<UpdateResolver<RetryingStore<InMemoryRevisionStore>>> {
    let config = match &args.config {
        Some(path) => ResolverConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ResolverConfig::default(),
    };

    let store = InMemoryRevisionStore::new();
    store
        .seed(dataset, load_history(&args.history)?)
        .with_context(|| format!("seeding history from {}", args.history.display()))?;

    let resolver = UpdateResolver::with_retry(store, config);
    tracing::debug!(
        revisions = resolver.store().inner().revision_count(dataset, id),
        max_attempts = resolver.store().policy().max_attempts,
        conditional_writes = resolver.config().conditional_writes,
        "Seeded history for {}/{}",
        dataset,
        id
    );
    Ok(resolver)
}

fn cmd_check_config(args: CheckConfigArgs) -> anyhow::Result<i32> {
    let config = ResolverConfig::load(&args.path)
        .with_context(|| format!("loading config {}", args.path.display()))?;
    println!("{} {} is valid", "✓".green().bold(), args.path.display());
    println!(
        "  Conditional writes: {}",
        if config.conditional_writes { "on".green() } else { "off".yellow() }
    );
    println!(
        "  Retry: {} attempt(s), {}ms initial backoff, x{} growth, {}ms cap",
        config.retry.max_attempts,
        config.retry.initial_backoff_ms,
        config.retry.multiplier,
        config.retry.max_backoff_ms
    );
    Ok(0)
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

fn load_entity(path: &Path) -> anyhow::Result<Entity> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Entity::from_json_str(&text).with_context(|| format!("parsing entity {}", path.display()))
}

fn load_history(path: &Path) -> anyhow::Result<Vec<Entity>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing history {}", path.display()))?;
    let Value::Array(revisions) = value else {
        anyhow::bail!("history {} must be a JSON array of entities", path.display());
    };
    revisions
        .into_iter()
        .enumerate()
        .map(|(i, revision)| {
            Entity::from_json(revision)
                .with_context(|| format!("revision #{i} in {}", path.display()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_conflicts(report: &ConflictReport) {
    println!("{} {}", "✗".red().bold(), report.to_string().red());
    for conflict in &report.conflicts {
        println!("  {}", conflict.field.bold());
        println!("    incoming: {}", conflict.incoming.to_string().cyan());
        println!("    current:  {}", conflict.current.to_string().yellow());
        println!("    base:     {}", conflict.base.to_string().dimmed());
    }
}

fn print_diff(diff: &EntityDiff) {
    if diff.is_empty() {
        println!("No changes.");
        return;
    }
    for change in &diff.changes {
        match change {
            FieldChange::Added { field, value } => {
                println!("{} {}: {}", "+".green().bold(), field, value.to_string().green())
            }
            FieldChange::Removed { field, value } => {
                println!("{} {}: {}", "-".red().bold(), field, value.to_string().red())
            }
            FieldChange::Modified { field, old, new } => println!(
                "{} {}: {} -> {}",
                "~".yellow().bold(),
                field,
                old.to_string().dimmed(),
                new.to_string().yellow()
            ),
        }
    }
    println!(
        "{} added, {} removed, {} modified",
        diff.additions(),
        diff.removals(),
        diff.modifications()
    );
}
