//! Status command handler

use anyhow::Result;
use serde::Serialize;

use notebatch_core::{Config, Repository, SyncStatus};

use super::user_error;
use crate::output::{Output, OutputFormat};

#[derive(Debug, Serialize)]
struct Status {
    database: String,
    database_size: u64,
    notes: usize,
    sync: SyncStatus,
    remote_prefix: String,
    page_size: usize,
}

/// Show status information
pub fn show(repo: &Repository, config: &Config, output: &Output) -> Result<()> {
    let path = repo
        .store()
        .path()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| config.sqlite_path());
    let status = Status {
        database_size: std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0),
        database: path.display().to_string(),
        notes: repo.count().map_err(user_error)?,
        sync: repo.sync_status(),
        remote_prefix: config.remote_prefix.clone(),
        page_size: config.page_size,
    };

    match output.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&status) {
            Ok(json) => println!("{}", json),
            Err(e) => anyhow::bail!("Failed to serialize status: {}", e),
        },
        OutputFormat::Quiet => {
            println!("{}", status.notes);
        }
        OutputFormat::Human => {
            println!("Notebatch Status");
            println!("================");
            println!();
            println!("Storage:");
            println!("  Database: {}", status.database);
            println!("  Size:     {}", human_size(status.database_size));
            println!("  Notes:    {}", status.notes);
            println!();
            println!("Sync:");
            println!("  Status: {:?}", status.sync);
            println!("  Remote: {} (mock)", status.remote_prefix);
            println!();
            println!("Paging:");
            println!("  Page size: {}", status.page_size);
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
