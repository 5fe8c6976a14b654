use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::parser::ids;
use crate::store::{self, RunSummary, SUMMARY_FILE};

/// Reserved key the workflow definition is nested under.
pub const DEFINITION_FIELD: &str = "n8n_workflow";
const DESCRIPTION: &str =
    "Combined workflow files containing both metadata and n8n workflow definitions";
const PROGRESS_EVERY: usize = 100;

/// Join metadata records with downloaded definitions by workflow id and
/// write `workflow_<id>_combined.json` per match plus `summary.json`.
pub fn combine(metadata_dir: &Path, workflows_dir: &Path, output_dir: &Path) -> Result<RunSummary> {
    if !metadata_dir.is_dir() {
        bail!("metadata directory {} not found", metadata_dir.display());
    }
    store::ensure_dir(output_dir)?;

    let metadata = metadata_files(metadata_dir)?;
    let definitions: HashSet<String> = store::list_file_names(workflows_dir)?
        .iter()
        .filter_map(|name| ids::parse_definition_name(name).map(str::to_string))
        .collect();
    info!("Found {} metadata files", metadata.len());

    let mut combined = 0usize;
    let mut missing = 0usize;
    let mut errors = 0usize;

    for (id, metadata_path) in &metadata {
        if !definitions.contains(id) {
            warn!(workflow_id = %id, "missing workflow file");
            missing += 1;
            continue;
        }

        let definition_path = ids::workflow_file(workflows_dir, id);
        match combine_one(metadata_path, &definition_path, &ids::combined_file(output_dir, id)) {
            Ok(()) => {
                combined += 1;
                if combined % PROGRESS_EVERY == 0 {
                    info!("Processed {} workflows...", combined);
                }
            }
            Err(e) => {
                warn!(file = %metadata_path.display(), "error combining: {:#}", e);
                errors += 1;
            }
        }
    }

    let summary = RunSummary {
        total_processed: combined,
        missing_workflows: missing,
        errors,
        output_directory: output_dir.display().to_string(),
        description: DESCRIPTION.to_string(),
        generated_at: chrono::Utc::now(),
    };
    store::write_json(&output_dir.join(SUMMARY_FILE), &summary)?;
    Ok(summary)
}

/// Metadata files by id, sorted. `_enriched` wins over the plain file.
fn metadata_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut by_id: BTreeMap<String, (PathBuf, bool)> = BTreeMap::new();
    for name in store::list_file_names(dir)? {
        let Some(parsed) = ids::parse_metadata_name(&name) else {
            continue;
        };
        let keep_existing = by_id
            .get(parsed.id)
            .is_some_and(|(_, enriched)| *enriched && !parsed.enriched);
        if !keep_existing {
            by_id.insert(parsed.id.to_string(), (dir.join(&name), parsed.enriched));
        }
    }
    Ok(by_id.into_iter().map(|(id, (path, _))| (id, path)).collect())
}

fn combine_one(metadata_path: &Path, definition_path: &Path, out_path: &Path) -> Result<()> {
    let metadata = store::read_json(metadata_path)?;
    let definition = store::read_json(definition_path)?;
    let merged = merge(metadata, definition)
        .with_context(|| format!("{} is not a JSON object", metadata_path.display()))?;
    store::write_json(out_path, &merged)
}

/// Metadata keys keep their order; the definition lands under
/// [`DEFINITION_FIELD`]. `None` if the metadata is not an object.
pub fn merge(metadata: Value, definition: Value) -> Option<Value> {
    let Value::Object(mut record) = metadata else {
        return None;
    };
    record.insert(DEFINITION_FIELD.to_string(), definition);
    Some(Value::Object(record))
}

// ── Tests ──
