use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{error, info, warn};

use crate::cli::{LoadArgs, StoreArgs};
use crate::commands::{StoreContext, open_store};
use crate::inventory::load_inventory;
use crate::model::{LoadPaths, LoadRunManifest};
use crate::util::{now_utc_string, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(store_args: &StoreArgs, args: LoadArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let timer = Instant::now();
    let run_id = format!("load-{}", utc_compact_string(started_ts));

    let StoreContext {
        environment,
        settings,
        store,
    } = open_store(store_args)?;

    let report_path = args.report_path.clone().unwrap_or_else(|| {
        default_report_dir(&settings.root)
            .join(format!("load_run_{}.json", utc_compact_string(started_ts)))
    });

    info!(
        run_id = %run_id,
        source = %args.source.display(),
        collection = %args.collection,
        mode = args.mode.as_str(),
        policy = args.mode.row_failure_policy().as_str(),
        "starting load"
    );

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut manifest = LoadRunManifest {
        manifest_version: 1,
        run_id,
        status: "running".to_string(),
        started_at,
        updated_at: now_utc_string(),
        duration_ms: 0,
        environment: environment.as_str().to_string(),
        database: store.database().to_string(),
        collection: args.collection.clone(),
        mode: args.mode.as_str().to_string(),
        row_failure_policy: args.mode.row_failure_policy().as_str().to_string(),
        seed: args.seed,
        source_sha256: None,
        paths: LoadPaths {
            source_path: args.source.display().to_string(),
            store_root: settings.root.display().to_string(),
            database_path: store.database_path().display().to_string(),
            report_path: report_path.display().to_string(),
        },
        rows_read: 0,
        inserted: 0,
        skipped_count: 0,
        skipped: Vec::new(),
        error: None,
    };

    let outcome = sha256_file(&args.source).and_then(|source_sha256| {
        manifest.source_sha256 = Some(source_sha256);
        load_inventory(&args.source, &args.collection, args.mode, &store, &mut rng).with_context(
            || {
                format!(
                    "failed to load {} into {}.{}",
                    args.source.display(),
                    store.database(),
                    args.collection
                )
            },
        )
    });

    manifest.updated_at = now_utc_string();
    manifest.duration_ms = timer.elapsed().as_millis() as u64;

    let summary = match outcome {
        Ok(summary) => summary,
        Err(err) => {
            manifest.status = "failed".to_string();
            manifest.error = Some(format!("{err:#}"));
            match write_json_pretty(&report_path, &manifest) {
                Ok(()) => info!(path = %report_path.display(), "wrote failed load report"),
                Err(write_err) => error!(
                    path = %report_path.display(),
                    error = %write_err,
                    "failed to write load report"
                ),
            }
            return Err(err);
        }
    };

    manifest.status = "completed".to_string();
    manifest.rows_read = summary.rows_read;
    manifest.inserted = summary.inserted;
    manifest.skipped_count = summary.skipped_count();
    manifest.skipped = summary.skipped.clone();

    write_json_pretty(&report_path, &manifest)?;
    info!(path = %report_path.display(), "wrote load report");

    if summary.skipped_count() > 0 {
        warn!(
            skipped = summary.skipped_count(),
            report = %report_path.display(),
            "load completed with skipped rows"
        );
    }
    info!(
        inserted = summary.inserted,
        rows = summary.rows_read,
        collection = %summary.collection,
        "load completed"
    );

    Ok(())
}

pub fn default_report_dir(store_root: &Path) -> PathBuf {
    store_root.join("manifests")
}
