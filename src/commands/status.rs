use std::fs;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let db_path = args.cache_root.join("docseg_index.sqlite");

    info!(cache_root = %args.cache_root.display(), "status requested");

    if manifest_dir.exists() {
        let mut run_manifests = Vec::new();
        let entries = fs::read_dir(&manifest_dir)
            .with_context(|| format!("failed to read {}", manifest_dir.display()))?;
        for entry in entries {
            let entry = entry
                .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with("extract_run_") && name.ends_with(".json") {
                run_manifests.push(name);
            }
        }
        run_manifests.sort();

        info!(
            run_count = run_manifests.len(),
            latest = %run_manifests.last().cloned().unwrap_or_default(),
            "extract run manifests"
        );
    } else {
        warn!(path = %manifest_dir.display(), "manifest directory missing");
    }

    if db_path.exists() {
        let connection = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let docs_count = query_count(&connection, "SELECT COUNT(*) FROM docs").unwrap_or(0);
        let sections_count = query_count(&connection, "SELECT COUNT(*) FROM sections").unwrap_or(0);
        let populated_count = query_count(
            &connection,
            "SELECT COUNT(*) FROM sections WHERE char_count > 0",
        )
        .unwrap_or(0);

        info!(
            path = %db_path.display(),
            docs = docs_count,
            sections = sections_count,
            populated = populated_count,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database missing");
    }

    Ok(())
}

fn query_count(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
