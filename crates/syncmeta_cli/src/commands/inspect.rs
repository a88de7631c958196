//! Inspect command implementation.

use serde::Serialize;
use std::path::Path;
use syncmeta_codec::{FolderSyncEntry, ResourceSyncEntry};
use syncmeta_core::{Config, StatsSnapshot, Synchronizer};
use syncmeta_store::WorkspacePath;

/// Directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Workspace-relative directory.
    pub dir: WorkspacePath,
    /// The directory's folder record, if managed.
    pub folder: Option<FolderSyncEntry>,
    /// Remote location derived from the folder record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_location: Option<String>,
    /// Entries of the directory's children.
    pub entries: Vec<ResourceSyncEntry>,
    /// Ignore patterns declared for the directory.
    pub ignore_patterns: Vec<String>,
    /// Children present locally or through sync metadata.
    pub children: Vec<WorkspacePath>,
    /// Cache counters after loading.
    pub stats: StatsSnapshot,
}

/// Runs the inspect command.
pub fn run(
    root: &Path,
    config: Config,
    dir: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = WorkspacePath::parse(dir)?;
    let sync = Synchronizer::open(config, root)?;

    let folder = sync.get_folder_sync(&dir)?;
    let result = InspectResult {
        remote_location: folder.as_ref().map(FolderSyncEntry::remote_location),
        folder,
        entries: sync.cache().get_children_sync(&dir)?,
        ignore_patterns: sync.cache().get_ignore_patterns(&dir)?.unwrap_or_default(),
        children: sync.cache().list_children_with_sync(&dir)?,
        stats: sync.stats(),
        dir,
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("syncmeta Directory Inspection");
    println!("=============================");
    println!();
    println!("Directory: {}", result.dir);
    println!();

    match &result.folder {
        Some(folder) => {
            println!("Folder:");
            println!("  Root:        {}", folder.root());
            println!("  Repository:  {}", folder.repository());
            if let Some(location) = &result.remote_location {
                println!("  Location:    {location}");
            }
            if let Some(tag) = folder.tag() {
                println!("  Tag:         {tag}");
            }
            if folder.is_static() {
                println!("  Static:      yes");
            }
        }
        None => println!("Folder: not managed"),
    }

    println!();
    println!("Entries ({}):", result.entries.len());
    for entry in &result.entries {
        let mut flags = Vec::new();
        if entry.is_added() {
            flags.push("added");
        }
        if entry.is_deleted() {
            flags.push("deleted");
        }
        if entry.is_merged() {
            flags.push("merged");
        }
        if flags.is_empty() {
            println!("  {}", entry.to_entry_line(true));
        } else {
            println!("  {}  [{}]", entry.to_entry_line(true), flags.join(", "));
        }
    }

    if !result.ignore_patterns.is_empty() {
        println!();
        println!("Ignore patterns:");
        for pattern in &result.ignore_patterns {
            println!("  {pattern}");
        }
    }

    println!();
    println!("Children:");
    for child in &result.children {
        println!("  {}", child.name());
    }
}
