//! Output formatting for CLI commands.
//!
//! This module handles formatting output as either JSON or human-readable text.

use anyhow::Result;
use repograph::{
    Collection, CompilationView, ComposedEntry, ObjectId, Principal, Resolution, ResolveReport,
    SweepReport,
};
use serde_json::{json, Value};

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_report(report: &ResolveReport) {
    if report.is_complete() {
        println!("Resolved {} references", report.fetched);
    } else {
        println!(
            "Resolved {} references ({} missing, {} invalid, {} cycles broken, {} truncated)",
            report.fetched, report.missing, report.invalid, report.cycles_broken, report.truncated
        );
    }
}

/// Print a resolved document.
pub fn print_document(
    collection: Collection,
    id: &ObjectId,
    revision: u64,
    resolution: &Resolution<Value>,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(&json!({
            "collection": collection,
            "id": id,
            "revision": revision,
            "document": resolution.document,
            "report": resolution.report,
        }));
    }
    println!("{} {} (revision {})\n", collection, id, revision);
    println!("{}\n", serde_json::to_string_pretty(&resolution.document)?);
    print_report(&resolution.report);
    Ok(())
}

/// Print an entity or compilation seen by `principal`.
pub fn print_view(
    principal: &Principal,
    document: &Value,
    report: &ResolveReport,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(&json!({
            "principal": principal,
            "document": document,
            "report": report,
        }));
    }
    println!("Viewed as {}\n", principal);
    println!("{}\n", serde_json::to_string_pretty(document)?);
    print_report(report);
    Ok(())
}

/// Print a composed compilation.
pub fn print_composition(view: &CompilationView, json: bool) -> Result<()> {
    if json {
        return print_json(view);
    }
    println!(
        "Compilation: {} ({})",
        view.compilation.name, view.compilation.id
    );
    println!(
        "Entities: {} visible, {} hidden, {} missing\n",
        view.visible_count(),
        view.hidden_count(),
        view.missing_count()
    );
    for (i, entry) in view.entries.iter().enumerate() {
        match entry {
            ComposedEntry::Visible(entity) => println!("{}. {} ({})", i + 1, entity.name, entity.id),
            ComposedEntry::Hidden { id, verdict } => println!("{}. [hidden: {}] {}", i + 1, verdict, id),
            ComposedEntry::Missing { id: Some(id) } => println!("{}. [missing] {}", i + 1, id),
            ComposedEntry::Missing { id: None } => println!("{}. [empty]", i + 1),
        }
    }
    println!();
    print_report(&view.report);
    Ok(())
}

/// Print the outcome of unlinking an owner.
pub fn print_unlink(
    collection: Collection,
    id: &ObjectId,
    owner: &ObjectId,
    removed: bool,
    orphan: bool,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(&json!({
            "collection": collection,
            "id": id,
            "owner": owner,
            "removed": removed,
            "orphan": orphan,
        }));
    }
    if removed {
        println!("Unlinked {} from {} {}", owner, collection, id);
    } else {
        println!("{} was not linked to {} {}", owner, collection, id);
    }
    if orphan {
        println!("{} {} has no owners left; run `repograph sweep` to delete it", collection, id);
    }
    Ok(())
}

/// Print an orphan sweep report.
pub fn print_sweep(report: &SweepReport, dry_run: bool, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    println!("Checked {} records", report.checked);
    if report.orphans.is_empty() {
        println!("No orphans found.");
        return Ok(());
    }
    let verb = if dry_run { "Would delete" } else { "Deleted" };
    println!("{} {} orphans:", verb, report.orphans.len());
    for (collection, id) in &report.orphans {
        println!("  {} {}", collection, id);
    }
    Ok(())
}

/// Print the outcome of pruning dangling references.
pub fn print_prune(collection: Collection, id: &ObjectId, removed: usize, json: bool) -> Result<()> {
    if json {
        return print_json(&json!({
            "collection": collection,
            "id": id,
            "removed": removed,
        }));
    }
    println!("Removed {} dangling entries from {} {}", removed, collection, id);
    Ok(())
}
