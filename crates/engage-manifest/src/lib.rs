use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: i32,
    pub run_id: Uuid,
    pub campaign_id: Uuid,
    pub company_id: Uuid,
    pub git_hash: String,
    pub config_hash: String,
    pub host_fingerprint: String,
    pub created_at_utc: DateTime<Utc>,
    pub artifacts: ArtifactList,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactList {
    pub audit_jsonl: String,
    pub manifest_json: String,
    pub dispatch_log_csv: String,
}

pub struct InitRunArtifactsArgs<'a> {
    pub exports_root: &'a Path, // e.g. ../exports
    pub schema_version: i32,
    pub run_id: Uuid,
    pub campaign_id: Uuid,
    pub company_id: Uuid,
    pub git_hash: &'a str,
    pub config_hash: &'a str,
    pub host_fingerprint: &'a str,
}

pub struct InitRunArtifactsResult {
    pub run_dir: PathBuf,
    pub manifest_path: PathBuf,
}

/// Create the on-disk artifact directory for a campaign run and write its
/// manifest. Called once, at `run start`.
pub fn init_run_artifacts(args: InitRunArtifactsArgs<'_>) -> Result<InitRunArtifactsResult> {
    let run_dir = args.exports_root.join(args.run_id.to_string());
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("create exports dir failed: {}", run_dir.display()))?;

    ensure_file_exists_with(&run_dir.join("audit.jsonl"), "")?;
    ensure_file_exists_with(
        &run_dir.join("dispatch_log.csv"),
        "ts_utc,queue_item_id,channel,lead_id,stage,status,error_code\n",
    )?;

    let manifest = RunManifest {
        schema_version: args.schema_version,
        run_id: args.run_id,
        campaign_id: args.campaign_id,
        company_id: args.company_id,
        git_hash: args.git_hash.to_string(),
        config_hash: args.config_hash.to_string(),
        host_fingerprint: args.host_fingerprint.to_string(),
        created_at_utc: Utc::now(),
        artifacts: ArtifactList {
            audit_jsonl: "audit.jsonl".to_string(),
            manifest_json: "manifest.json".to_string(),
            dispatch_log_csv: "dispatch_log.csv".to_string(),
        },
    };

    let manifest_path = run_dir.join("manifest.json");
    let json = serde_json::to_string_pretty(&manifest).context("serialize manifest failed")?;
    fs::write(&manifest_path, format!("{json}\n"))
        .with_context(|| format!("write manifest failed: {}", manifest_path.display()))?;

    Ok(InitRunArtifactsResult {
        run_dir,
        manifest_path,
    })
}

fn ensure_file_exists_with(path: &Path, contents_if_create: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    fs::write(path, contents_if_create)
        .with_context(|| format!("create placeholder failed: {}", path.display()))?;
    Ok(())
}

/// Append one row to a run's dispatch log. Called by the dispatcher after
/// every terminal queue item outcome; the CSV is a human-readable companion
/// to the audit JSONL, not a source of truth.
pub fn append_dispatch_log_row(
    run_dir: &Path,
    queue_item_id: Uuid,
    channel: &str,
    lead_id: Uuid,
    stage: &str,
    status: &str,
    error_code: Option<&str>,
) -> Result<()> {
    use std::io::Write;

    let path = run_dir.join("dispatch_log.csv");
    let mut f = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open dispatch log failed: {}", path.display()))?;

    let row = format!(
        "{},{},{},{},{},{},{}\n",
        Utc::now().to_rfc3339(),
        queue_item_id,
        channel,
        lead_id,
        stage,
        status,
        error_code.unwrap_or(""),
    );
    f.write_all(row.as_bytes())
        .context("write dispatch log row failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_manifest_and_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let run_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();
        let company_id = Uuid::new_v4();

        let result = init_run_artifacts(InitRunArtifactsArgs {
            exports_root: dir.path(),
            schema_version: 1,
            run_id,
            campaign_id,
            company_id,
            git_hash: "deadbeef",
            config_hash: "abc123",
            host_fingerprint: "host-1",
        })
        .unwrap();

        assert!(result.run_dir.join("audit.jsonl").exists());
        assert!(result.run_dir.join("dispatch_log.csv").exists());
        assert!(result.manifest_path.exists());

        let manifest_str = fs::read_to_string(&result.manifest_path).unwrap();
        let manifest: RunManifest = serde_json::from_str(&manifest_str).unwrap();
        assert_eq!(manifest.run_id, run_id);
        assert_eq!(manifest.campaign_id, campaign_id);
    }
}
