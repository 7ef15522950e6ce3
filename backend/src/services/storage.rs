//! Upload storage on the local filesystem.
//!
//! Evidence files and discount card photos are written below the configured
//! upload directory and served back under `/uploads`. Evidence of closed
//! incidents can be purged to reclaim space; the database rows stay as an
//! audit trail with a remark saying the file is gone.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::{models::FileType, queries};

pub const MAX_EVIDENCE_BYTES: usize = 10 * 1024 * 1024;
pub const PURGED_REMARK: &str = "Evidence files deleted after incident resolution";

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
    pub path: PathBuf,
    pub size: usize,
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        _ => "bin",
    }
}

/// Extension taken from the client's file name when it is sane, otherwise
/// derived from the MIME type.
pub fn file_extension(original_name: Option<&str>, mime: &str) -> String {
    original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| extension_for_mime(mime).to_string())
}

pub fn evidence_file_name(incident_id: &str, extension: &str, now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "evidence_{}_{}_{}.{}",
        incident_id,
        now.timestamp_millis(),
        &suffix[..8],
        extension
    )
}

pub fn photo_file_name(user_id: &str, extension: &str) -> String {
    format!("{}_{}.{}", user_id, Uuid::new_v4(), extension)
}

/// Writes `bytes` to `dir/file_name`, creating `dir` when needed.
pub async fn save_upload(
    dir: &Path,
    url_prefix: &str,
    file_name: &str,
    bytes: &[u8],
) -> std::io::Result<StoredFile> {
    fs::create_dir_all(dir).await?;
    let path = dir.join(file_name);
    fs::write(&path, bytes).await?;

    Ok(StoredFile {
        file_name: file_name.to_string(),
        url: format!("{}/{}", url_prefix.trim_end_matches('/'), file_name),
        path,
        size: bytes.len(),
    })
}

/// Removes files written for a request that did not go through.
pub async fn discard_uploads(paths: &[PathBuf]) {
    for path in paths {
        if let Err(err) = fs::remove_file(path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove orphaned upload {}: {err}", path.display());
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub files_deleted: usize,
    pub files_missing: usize,
    pub errors: usize,
}

impl PurgeReport {
    fn absorb(&mut self, other: &PurgeReport) {
        self.files_deleted += other.files_deleted;
        self.files_missing += other.files_missing;
        self.errors += other.errors;
    }
}

/// Deletes the evidence files of one incident and marks its rows.
pub async fn purge_incident_evidence(
    pool: &SqlitePool,
    evidence_dir: &Path,
    incident_id: &str,
) -> Result<PurgeReport, sqlx::Error> {
    let evidence = queries::list_evidence(pool, incident_id).await?;
    let mut report = PurgeReport::default();
    if evidence.is_empty() {
        return Ok(report);
    }

    for item in &evidence {
        let path = evidence_dir.join(&item.file_name);
        match fs::remove_file(&path).await {
            Ok(()) => report.files_deleted += 1,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => report.files_missing += 1,
            Err(err) => {
                warn!("could not delete {}: {err}", path.display());
                report.errors += 1;
            }
        }
    }

    queries::mark_evidence_purged(pool, incident_id, PURGED_REMARK).await?;
    info!(
        incident_id,
        deleted = report.files_deleted,
        missing = report.files_missing,
        "evidence purged"
    );
    Ok(report)
}

/// Fire-and-forget purge after an incident is closed.
pub fn spawn_evidence_purge(pool: SqlitePool, evidence_dir: PathBuf, incident_id: String) {
    tokio::spawn(async move {
        if let Err(err) = purge_incident_evidence(&pool, &evidence_dir, &incident_id).await {
            error!(incident_id = %incident_id, "evidence cleanup failed: {err}");
        }
    });
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub incidents: usize,
    #[serde(flatten)]
    pub files: PurgeReport,
}

pub async fn purge_closed_before(
    pool: &SqlitePool,
    evidence_dir: &Path,
    days_old: i64,
    now: DateTime<Utc>,
) -> Result<CleanupReport, sqlx::Error> {
    let cutoff = now - Duration::days(days_old.max(0));
    let incident_ids = queries::closed_incident_ids_before(pool, cutoff).await?;

    let mut report = CleanupReport {
        incidents: incident_ids.len(),
        ..Default::default()
    };
    for id in &incident_ids {
        let purged = purge_incident_evidence(pool, evidence_dir, id).await?;
        report.files.absorb(&purged);
    }
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeUsage {
    pub files: i64,
    pub size_bytes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageTotals {
    pub files: i64,
    pub size_bytes: i64,
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub by_type: BTreeMap<FileType, TypeUsage>,
    pub total: StorageTotals,
}

pub fn summarize_usage(rows: &[(FileType, i64, i64)]) -> StorageStats {
    let by_type: BTreeMap<FileType, TypeUsage> = rows
        .iter()
        .map(|(file_type, files, bytes)| {
            (
                *file_type,
                TypeUsage {
                    files: *files,
                    size_bytes: *bytes,
                },
            )
        })
        .collect();

    let files = by_type.values().map(|u| u.files).sum();
    let size_bytes: i64 = by_type.values().map(|u| u.size_bytes).sum();
    let size_mb = (size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;

    StorageStats {
        by_type,
        total: StorageTotals {
            files,
            size_bytes,
            size_mb,
        },
    }
}

pub async fn storage_stats(pool: &SqlitePool) -> Result<StorageStats, sqlx::Error> {
    let rows = queries::evidence_usage_by_type(pool).await?;
    Ok(summarize_usage(&rows))
}
