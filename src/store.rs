use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::parser::ids;

pub const AGGREGATE_FILE: &str = "all_workflows.json";
pub const SUMMARY_FILE: &str = "summary.json";

/// One scraped workflow page. Error records carry only url, id and error.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RawMetadataRecord {
    pub url: String,
    pub workflow_id: String,
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_page_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RawMetadataRecord {
    pub fn new(url: &str, workflow_id: &str) -> Self {
        RawMetadataRecord {
            url: url.to_string(),
            workflow_id: workflow_id.to_string(),
            ..Default::default()
        }
    }

    pub fn failed(url: &str, workflow_id: &str, error: impl Into<String>) -> Self {
        RawMetadataRecord {
            error: Some(error.into()),
            ..Self::new(url, workflow_id)
        }
    }

    pub fn workflow_name(&self) -> Option<&str> {
        self.fields.get("workflow_name").map(String::as_str)
    }

    /// A record counts as scraped unless it failed without yielding a name.
    pub fn is_success(&self) -> bool {
        self.error.is_none() || self.workflow_name().is_some()
    }
}

/// Result of one Combiner run, written to `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub total_processed: usize,
    pub missing_workflows: usize,
    pub errors: usize,
    pub output_directory: String,
    pub description: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

impl RunSummary {
    pub fn print(&self) {
        println!("Successfully combined: {}", self.total_processed);
        println!("Missing workflow files: {}", self.missing_workflows);
        println!("Errors: {}", self.errors);
        println!("Output directory: {}", self.output_directory);
    }
}

/// Counters returned by the Collector and Extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
}

impl PipelineStats {
    pub fn record(&mut self, ok: bool) {
        if ok {
            self.ok += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Read the input URL list: a JSON array of strings.
pub fn load_urls(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL list {}", path.display()))?;
    let urls: Vec<String> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of strings", path.display()))?;
    Ok(urls)
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))
}

/// Pretty-printed (two-space) UTF-8 JSON, non-ASCII kept verbatim.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

pub fn read_json(path: &Path) -> Result<serde_json::Value> {
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value = serde_json::from_slice(&raw)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    Ok(value)
}

/// File names in `dir`, sorted. A missing directory yields an empty list.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Number of `workflow_*.json` files in `dir`.
pub fn count_workflow_files(dir: &Path) -> Result<usize> {
    Ok(list_file_names(dir)?
        .iter()
        .filter(|n| n.starts_with(ids::FILE_PREFIX) && n.ends_with(".json"))
        .count())
}

pub fn read_summary(dir: &Path) -> Result<Option<RunSummary>> {
    let path: PathBuf = dir.join(SUMMARY_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let summary = serde_json::from_value(read_json(&path)?)
        .with_context(|| format!("Unrecognised summary in {}", path.display()))?;
    Ok(Some(summary))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn record_key_order() {
        let mut record = RawMetadataRecord::new("https://x.test/w/abc", "abc");
        record.fields.insert("workflow_name".into(), "X".into());
        record.fields.insert("category".into(), "Sales".into());
        record.page_title = Some("T".into());
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"url":"https://x.test/w/abc","workflow_id":"abc","workflow_name":"X","category":"Sales","page_title":"T"}"#
        );
    }

    #[test]
    fn error_record_shape() {
        let record = RawMetadataRecord::failed("https://x.test/w/abc", "abc", "timeout");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"url": "https://x.test/w/abc", "workflow_id": "abc", "error": "timeout"})
        );
        assert!(!record.is_success());
    }

    #[test]
    fn error_record_with_name_still_counts() {
        let mut record = RawMetadataRecord::failed("u", "abc", "late failure");
        record.fields.insert("workflow_name".into(), "X".into());
        assert!(record.is_success());
    }

    #[test]
    fn load_urls_reads_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.json");
        fs::write(&path, r#"["https://x.test/w/a", "https://x.test/w/b"]"#).unwrap();
        assert_eq!(load_urls(&path).unwrap().len(), 2);
    }

    #[test]
    fn load_urls_rejects_non_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("urls.json");
        fs::write(&path, r#"{"urls": []}"#).unwrap();
        assert!(load_urls(&path).is_err());
        assert!(load_urls(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn write_json_keeps_unicode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        write_json(&path, &serde_json::json!({"name": "Café → CRM"})).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "{\n  \"name\": \"Café → CRM\"\n}");
    }

    #[test]
    fn counts_only_workflow_files() {
        let dir = TempDir::new().unwrap();
        for name in ["workflow_a.json", "workflow_b.json", AGGREGATE_FILE, "notes.txt"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        assert_eq!(count_workflow_files(dir.path()).unwrap(), 2);
        assert_eq!(count_workflow_files(&dir.path().join("nope")).unwrap(), 0);
    }
}
