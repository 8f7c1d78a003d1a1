use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::{StatusArgs, StoreArgs};
use crate::commands::load::default_report_dir;
use crate::commands::{StoreContext, open_store};
use crate::model::LoadRunManifest;

pub fn run(store_args: &StoreArgs, _args: StatusArgs) -> Result<()> {
    let StoreContext {
        settings, store, ..
    } = open_store(store_args)?;

    let db_path = store.database_path();
    if db_path.exists() {
        let counts = store
            .collection_counts()
            .with_context(|| format!("failed to read collections from {}", db_path.display()))?;

        if counts.is_empty() {
            warn!(path = %db_path.display(), "database holds no collections");
        }
        for count in counts {
            info!(
                collection = %count.collection,
                documents = count.documents,
                "collection status"
            );
        }
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    let report_dir = default_report_dir(&settings.root);
    match latest_load_report(&report_dir)? {
        Some(path) => {
            let raw = fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            let report: LoadRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!(
                run_id = %report.run_id,
                status = %report.status,
                updated_at = %report.updated_at,
                database = %report.database,
                collection = %report.collection,
                mode = %report.mode,
                inserted = report.inserted,
                skipped = report.skipped_count,
                error = report.error.as_deref().unwrap_or_default(),
                "loaded latest load report"
            );
        }
        None => warn!(path = %report_dir.display(), "no load reports found"),
    }

    Ok(())
}

fn latest_load_report(report_dir: &Path) -> Result<Option<PathBuf>> {
    if !report_dir.exists() {
        return Ok(None);
    }

    let mut latest: Option<PathBuf> = None;
    let entries = fs::read_dir(report_dir)
        .with_context(|| format!("failed to read {}", report_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", report_dir.display()))?;
        let path = entry.path();

        let is_report = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("load_run_") && name.ends_with(".json"))
            .unwrap_or(false);

        if is_report && latest.as_ref().is_none_or(|current| path > *current) {
            latest = Some(path);
        }
    }

    Ok(latest)
}
