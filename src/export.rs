// 💾 Snapshot export - JSON (full fidelity) + CSV (tabular rows)
//
// A run is staged in a hidden sibling directory and moved into place with one
// rename, so an aborted run never leaves a partial snapshot behind.
// Snapshots are immutable: an existing run directory is never overwritten.

use crate::comparison::Bucket;
use crate::model::{Entity, NormalizedRecord, Statement};
use crate::pipeline::ComparisonRun;
use crate::statistics::Stats;
use crate::visualization::{IndexedFlows, SunburstRow, VisualizationDataset};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Output folder used when none is given
pub const DEFAULT_OUT_DIR: &str = "wikidata_data";

const ROW_HEADERS: [&str; 6] = ["Item", "Item_ID", "Property", "Property_ID", "Value", "Value_ID"];
const BUCKET_HEADERS: [&str; 6] = ["Bucket", "Property", "Property_ID", "Value", "Value_ID", "Label_Source"];
const DIVERGENT_HEADERS: [&str; 6] = ["Property", "Property_ID", "Side", "Item", "Value", "Value_ID"];

// ============================================================================
// CSV ROW SHAPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordRow {
    #[serde(rename = "Item")]
    pub item: String,

    #[serde(rename = "Item_ID")]
    pub item_id: String,

    #[serde(rename = "Property")]
    pub property: String,

    #[serde(rename = "Property_ID")]
    pub property_id: String,

    #[serde(rename = "Value")]
    pub value: String,

    #[serde(rename = "Value_ID")]
    pub value_id: String,
}

impl RecordRow {
    fn new(entity: &Entity, row: &Statement) -> Self {
        RecordRow {
            item: entity.label.clone(),
            item_id: entity.id.clone(),
            property: row.property_label.clone(),
            property_id: row.property_id.clone(),
            value: row.value_label.clone(),
            value_id: row.value_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct BucketRow<'a> {
    bucket: &'static str,
    property: &'a str,
    property_id: &'a str,
    value: &'a str,
    value_id: &'a str,
    label_source: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct DivergentRow<'a> {
    property: &'a str,
    property_id: &'a str,
    side: &'static str,
    item: &'a str,
    value: &'a str,
    value_id: &'a str,
}

// ============================================================================
// MANIFEST
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub path: String,
    pub bytes: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub run_id: String,
    pub run_name: String,
    pub created_at: DateTime<Utc>,
    pub entity_a: String,
    pub entity_b: String,
    pub stats: Stats,
    pub files: Vec<SnapshotFile>,
}

#[derive(Serialize)]
struct VisualizationExport<'a> {
    #[serde(flatten)]
    dataset: &'a VisualizationDataset,
    sankey: IndexedFlows,
    sunburst_rows: Vec<SunburstRow>,
}

#[derive(Serialize)]
struct ComparisonExport<'a> {
    #[serde(flatten)]
    run: &'a crate::comparison::ComparisonResult,
    divergent: Vec<crate::comparison::DivergentProperty>,
    stats: &'a Stats,
}

// ============================================================================
// SNAPSHOT WRITER
// ============================================================================

pub struct SnapshotWriter {
    out_dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        SnapshotWriter {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// `Q42_vs_Q5_20250101T120000Z`
    pub fn default_run_name(run: &ComparisonRun, now: DateTime<Utc>) -> String {
        format!(
            "{}_vs_{}_{}",
            sanitize(&run.record_a.entity.id),
            sanitize(&run.record_b.entity.id),
            now.format("%Y%m%dT%H%M%SZ")
        )
    }

    /// Write every artifact of a run under `<out_dir>/<run_name>/`
    pub fn write(&self, run: &ComparisonRun, run_name: &str) -> Result<SnapshotManifest> {
        let run_name = sanitize(run_name);
        if run_name.is_empty() {
            bail!("Run name must not be empty");
        }

        let final_dir = self.out_dir.join(&run_name);
        if final_dir.exists() {
            bail!("Snapshot {:?} already exists", final_dir);
        }

        let artifacts = render_artifacts(run)?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let staging_dir = self.out_dir.join(format!(".{}.partial-{}", run_name, run_id));

        let outcome = write_staged(&staging_dir, &artifacts).and_then(|files| {
            let manifest = SnapshotManifest {
                run_id: run_id.clone(),
                run_name: run_name.clone(),
                created_at: Utc::now(),
                entity_a: run.record_a.entity.id.clone(),
                entity_b: run.record_b.entity.id.clone(),
                stats: run.stats.clone(),
                files,
            };
            let bytes = serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;
            fs::write(staging_dir.join("manifest.json"), bytes).context("Failed to write manifest")?;

            fs::rename(&staging_dir, &final_dir)
                .with_context(|| format!("Failed to move snapshot into {:?}", final_dir))?;
            Ok(manifest)
        });

        match outcome {
            Ok(manifest) => {
                info!(dir = %final_dir.display(), files = manifest.files.len(), "snapshot written");
                Ok(manifest)
            }
            Err(err) => {
                if let Err(cleanup) = fs::remove_dir_all(&staging_dir) {
                    warn!(dir = %staging_dir.display(), "failed to remove staging dir: {}", cleanup);
                }
                Err(err)
            }
        }
    }
}

fn sanitize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn write_staged(staging_dir: &Path, artifacts: &[(String, Vec<u8>)]) -> Result<Vec<SnapshotFile>> {
    let mut files = Vec::with_capacity(artifacts.len());

    for (relative, bytes) in artifacts {
        let path = staging_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        fs::write(&path, bytes).with_context(|| format!("Failed to write {:?}", path))?;

        files.push(SnapshotFile {
            path: relative.clone(),
            bytes: bytes.len(),
            sha256: format!("{:x}", Sha256::digest(bytes)),
        });
    }

    Ok(files)
}

/// Every file of a snapshot, rendered in memory before anything touches disk
fn render_artifacts(run: &ComparisonRun) -> Result<Vec<(String, Vec<u8>)>> {
    let result = &run.result;
    let mut artifacts = Vec::new();

    let combined: Vec<RecordRow> = record_rows(&run.record_a)
        .into_iter()
        .chain(record_rows(&run.record_b))
        .collect();

    artifacts.push(("json/record_a.json".to_string(), to_json(&run.record_a)?));
    artifacts.push(("json/record_b.json".to_string(), to_json(&run.record_b)?));
    artifacts.push((
        "json/comparison.json".to_string(),
        to_json(&ComparisonExport {
            run: result,
            divergent: result.divergent_properties(),
            stats: &run.stats,
        })?,
    ));
    artifacts.push(("json/combined.json".to_string(), to_json(&combined)?));
    artifacts.push((
        "json/visualization.json".to_string(),
        to_json(&VisualizationExport {
            dataset: &run.visualization,
            sankey: run.visualization.flow.to_indexed(),
            sunburst_rows: run.visualization.sunburst.flatten(),
        })?,
    ));

    artifacts.push(("csv/data_a.csv".to_string(), to_csv(&ROW_HEADERS, &record_rows(&run.record_a))?));
    artifacts.push(("csv/data_b.csv".to_string(), to_csv(&ROW_HEADERS, &record_rows(&run.record_b))?));
    artifacts.push(("csv/combined.csv".to_string(), to_csv(&ROW_HEADERS, &combined)?));

    for bucket in Bucket::ALL {
        let label_source = match bucket {
            Bucket::OnlyB => run.record_b.entity.id.as_str(),
            _ => run.record_a.entity.id.as_str(),
        };
        let rows: Vec<BucketRow> = result
            .bucket(bucket)
            .iter()
            .map(|row| BucketRow {
                bucket: bucket.as_str(),
                property: &row.property_label,
                property_id: &row.property_id,
                value: &row.value_label,
                value_id: &row.value_id,
                label_source,
            })
            .collect();
        artifacts.push((format!("csv/{}.csv", bucket.as_str()), to_csv(&BUCKET_HEADERS, &rows)?));
    }

    let divergent = result.divergent_properties();
    let mut divergent_rows = Vec::new();
    for property in &divergent {
        for (side, entity, values) in [
            ("a", &result.entity_a, &property.values_a),
            ("b", &result.entity_b, &property.values_b),
        ] {
            for value in values {
                divergent_rows.push(DivergentRow {
                    property: &property.property_label,
                    property_id: &property.property_id,
                    side,
                    item: &entity.label,
                    value: &value.value_label,
                    value_id: &value.value_id,
                });
            }
        }
    }
    artifacts.push(("csv/divergent.csv".to_string(), to_csv(&DIVERGENT_HEADERS, &divergent_rows)?));

    Ok(artifacts)
}

pub fn record_rows(record: &NormalizedRecord) -> Vec<RecordRow> {
    record
        .rows
        .iter()
        .map(|row| RecordRow::new(&record.entity, row))
        .collect()
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value).context("Failed to serialize JSON snapshot")
}

/// CSV with an explicit header line, present even when there are no rows
fn to_csv<T: Serialize>(headers: &[&str], rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(headers).context("Failed to write CSV header")?;
    for row in rows {
        writer.serialize(row).context("Failed to write CSV row")?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV: {}", e.error()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_run() -> ComparisonRun {
        ComparisonRun::from_records(
            NormalizedRecord::new(
                Entity::new("Q1", "Alpha", "first"),
                vec![
                    Statement::new("P31", "instance of", "Q5", "human"),
                    Statement::new("P106", "occupation", "Q36180", "writer"),
                ],
            ),
            NormalizedRecord::new(
                Entity::new("Q2", "Beta", "second"),
                vec![
                    Statement::new("P31", "instance of", "Q5", "human"),
                    Statement::new("P106", "occupation", "Q82955", "politician"),
                ],
            ),
        )
    }

    #[test]
    fn test_default_run_name() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 30, 0).unwrap();
        assert_eq!(
            SnapshotWriter::default_run_name(&sample_run(), now),
            "Q1_vs_Q2_20250131T123000Z"
        );
    }

    #[test]
    fn test_write_snapshot_layout() {
        let temp_dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(temp_dir.path());

        let manifest = writer.write(&sample_run(), "run1").unwrap();
        let run_dir = temp_dir.path().join("run1");

        for file in [
            "manifest.json",
            "json/record_a.json",
            "json/comparison.json",
            "json/visualization.json",
            "csv/combined.csv",
            "csv/common.csv",
            "csv/only_a.csv",
            "csv/only_b.csv",
            "csv/divergent.csv",
        ] {
            assert!(run_dir.join(file).exists(), "missing {}", file);
        }

        assert_eq!(manifest.files.len(), 12);
        assert_eq!(manifest.entity_a, "Q1");
        assert_eq!(manifest.stats.common_count, 1);

        // Manifest digests match the bytes on disk
        let combined = fs::read(run_dir.join("csv/combined.csv")).unwrap();
        let entry = manifest
            .files
            .iter()
            .find(|f| f.path == "csv/combined.csv")
            .unwrap();
        assert_eq!(entry.sha256, format!("{:x}", Sha256::digest(&combined)));

        // No staging directory left behind
        let leftovers: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_csv_contents() {
        let temp_dir = TempDir::new().unwrap();
        SnapshotWriter::new(temp_dir.path())
            .write(&sample_run(), "run1")
            .unwrap();
        let csv_dir = temp_dir.path().join("run1/csv");

        let mut reader = csv::Reader::from_path(csv_dir.join("data_a.csv")).unwrap();
        let rows: Vec<RecordRow> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].item, "Alpha");
        assert_eq!(rows[1].value, "writer");

        let divergent = fs::read_to_string(csv_dir.join("divergent.csv")).unwrap();
        let lines: Vec<&str> = divergent.lines().collect();
        assert_eq!(lines[0], DIVERGENT_HEADERS.join(","));
        assert_eq!(lines[1], "occupation,P106,a,Alpha,writer,Q36180");
        assert_eq!(lines[2], "occupation,P106,b,Beta,politician,Q82955");
    }

    #[test]
    fn test_empty_buckets_still_have_headers() {
        let run = ComparisonRun::from_records(
            NormalizedRecord::new(Entity::new("Q1", "Alpha", ""), vec![]),
            NormalizedRecord::new(Entity::new("Q2", "Beta", ""), vec![]),
        );
        let temp_dir = TempDir::new().unwrap();
        SnapshotWriter::new(temp_dir.path()).write(&run, "empty").unwrap();

        let common = fs::read_to_string(temp_dir.path().join("empty/csv/common.csv")).unwrap();
        assert_eq!(common.trim_end(), BUCKET_HEADERS.join(","));
    }

    #[test]
    fn test_existing_snapshot_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let writer = SnapshotWriter::new(temp_dir.path());

        writer.write(&sample_run(), "run1").unwrap();
        let err = writer.write(&sample_run(), "run1").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_sanitize_run_name() {
        assert_eq!(sanitize("Q1 vs Q2/../x"), "Q1_vs_Q2____x");
        assert_eq!(sanitize("  "), "");
    }
}
