//! Status command implementation.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syncmeta_core::{Config, Synchronizer};
use syncmeta_reconcile::{
    CancelFlag, Depth, MirrorRemote, RecomputeSummary, ReconcileConfig, ReconciliationNode,
    ReconciliationSet, RemoteMetadataSource, SnapshotRemote, SyncComparator, SyncDirection,
};
use syncmeta_store::WorkspacePath;
use tracing::debug;

/// Options of the status command.
#[derive(Debug)]
pub struct StatusOptions {
    /// Workspace-relative directory to reconcile.
    pub dir: String,
    /// Optional JSON remote snapshot.
    pub remote: Option<PathBuf>,
    /// Whether pseudo-conflicts are dropped.
    pub detect_pseudo_conflicts: bool,
    /// Output format (text, json).
    pub format: String,
}

/// Status result.
#[derive(Debug, Serialize)]
pub struct StatusResult {
    /// Walk counters.
    pub summary: RecomputeSummary,
    /// Number of incoming nodes.
    pub incoming: usize,
    /// Number of outgoing nodes.
    pub outgoing: usize,
    /// Number of conflicting nodes.
    pub conflicting: usize,
    /// Out-of-sync resources, ordered by path.
    pub nodes: Vec<ReconciliationNode>,
}

/// Runs the status command.
pub fn run(
    root: &Path,
    config: Config,
    options: &StatusOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = WorkspacePath::parse(&options.dir)?;
    let sync = Arc::new(Synchronizer::open(config, root)?);
    let remote: Box<dyn RemoteMetadataSource> = match &options.remote {
        Some(path) => Box::new(load_snapshot(path)?),
        None => Box::new(MirrorRemote::new(Arc::clone(&sync))),
    };

    let set = ReconciliationSet::new(
        ReconcileConfig::new().detect_pseudo_conflicts(options.detect_pseudo_conflicts),
    );
    let comparator = SyncComparator::new(sync.cache(), remote.as_ref(), set.config());
    let summary = set.recompute(&comparator, &dir, Depth::Infinite, &CancelFlag::new())?;
    debug!(loads = sync.stats().loads, "status computed");

    let result = StatusResult {
        summary,
        incoming: set.count(SyncDirection::Incoming),
        outgoing: set.count(SyncDirection::Outgoing),
        conflicting: set.count(SyncDirection::Conflicting),
        nodes: set.all_out_of_sync(),
    };

    match options.format.as_str() {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Loads a remote snapshot from a JSON object mapping workspace paths to
/// revisions, with `null` marking directories.
pub fn load_snapshot(path: &Path) -> Result<SnapshotRemote, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let entries: BTreeMap<String, Option<String>> = serde_json::from_str(&text)?;

    let remote = SnapshotRemote::new();
    for (resource, revision) in &entries {
        let resource = WorkspacePath::parse(resource)?;
        match revision {
            Some(revision) => remote.add_revision(&resource, revision),
            None => remote.add_dir(&resource),
        }
    }
    Ok(remote)
}

fn print_text_output(result: &StatusResult) {
    if result.nodes.is_empty() {
        println!("Everything is in sync");
        return;
    }

    for node in &result.nodes {
        println!("{:<12} {:<9} {}", node.direction, node.change, node.path);
    }
    println!();
    println!(
        "{} incoming, {} outgoing, {} conflicting",
        result.incoming, result.outgoing, result.conflicting
    );
    if result.summary.errors > 0 {
        println!("{} resources skipped (see log)", result.summary.errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncmeta_reconcile::{RemoteToken, RemoteMetadataSource};
    use syncmeta_store::ResourceKind;

    #[test]
    fn snapshot_file_maps_revisions_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("remote.json");
        fs::write(&file, r#"{ "p": null, "p/a.c": "1.4", "p/sub/b.c": "1.1.2.1" }"#).unwrap();

        let remote = load_snapshot(&file).unwrap();
        assert_eq!(
            remote.remote_token(&WorkspacePath::new("p/a.c")).unwrap(),
            Some(RemoteToken::from_revision("1.4"))
        );
        assert_eq!(
            remote.remote_kind(&WorkspacePath::new("p/sub")).unwrap(),
            Some(ResourceKind::Directory)
        );
        assert_eq!(remote.len(), 4);
    }

    #[test]
    fn snapshot_paths_above_the_root_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("remote.json");
        fs::write(&file, r#"{ "../outside.c": "1.1" }"#).unwrap();
        assert!(load_snapshot(&file).is_err());
    }

    #[test]
    fn status_of_a_dir_above_the_root_is_refused() {
        let ws = tempfile::tempdir().unwrap();
        let options = StatusOptions {
            dir: "../..".to_string(),
            remote: None,
            detect_pseudo_conflicts: false,
            format: "json".to_string(),
        };
        assert!(run(ws.path(), Config::default(), &options).is_err());
    }

    #[test]
    fn malformed_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("remote.json");
        fs::write(&file, "[1, 2]").unwrap();
        assert!(load_snapshot(&file).is_err());
    }
}
