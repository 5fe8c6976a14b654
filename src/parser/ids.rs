use std::path::{Path, PathBuf};

pub const FILE_PREFIX: &str = "workflow_";
const ENRICHED_SUFFIX: &str = "_enriched";
const COMBINED_SUFFIX: &str = "_combined";

/// Workflow id = trailing non-empty path segment of the page URL.
pub fn workflow_id_from_url(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let id = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(id.to_string())
}

/// A metadata file name split into its id and whether it is the enriched variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataName<'a> {
    pub id: &'a str,
    pub enriched: bool,
}

/// Accepts `workflow_<id>.json` and `workflow_<id>_enriched.json`.
pub fn parse_metadata_name(file_name: &str) -> Option<MetadataName<'_>> {
    let stem = file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(".json")?;
    if stem.ends_with(COMBINED_SUFFIX) {
        return None;
    }
    let (id, enriched) = match stem.strip_suffix(ENRICHED_SUFFIX) {
        Some(id) => (id, true),
        None => (stem, false),
    };
    if id.is_empty() {
        None
    } else {
        Some(MetadataName { id, enriched })
    }
}

/// Accepts only `workflow_<id>.json`.
pub fn parse_definition_name(file_name: &str) -> Option<&str> {
    let id = file_name.strip_prefix(FILE_PREFIX)?.strip_suffix(".json")?;
    (!id.is_empty()).then_some(id)
}

pub fn workflow_file(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{id}.json"))
}

pub fn combined_file(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{FILE_PREFIX}{id}{COMBINED_SUFFIX}.json"))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_trailing_segment() {
        assert_eq!(
            workflow_id_from_url("https://www.thevibemarketer.com/members/workflows/0a3e65f3"),
            Some("0a3e65f3".to_string())
        );
        assert_eq!(workflow_id_from_url("https://x.test/w/abc/").as_deref(), Some("abc"));
        assert_eq!(
            workflow_id_from_url("https://x.test/w/abc?tab=json#top").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn url_without_path_has_no_id() {
        assert_eq!(workflow_id_from_url("https://x.test/"), None);
        assert_eq!(workflow_id_from_url("not a url"), None);
    }

    #[test]
    fn metadata_names() {
        assert_eq!(
            parse_metadata_name("workflow_0a3e65f3_enriched.json"),
            Some(MetadataName { id: "0a3e65f3", enriched: true })
        );
        assert_eq!(
            parse_metadata_name("workflow_abc.json"),
            Some(MetadataName { id: "abc", enriched: false })
        );
        assert_eq!(parse_metadata_name("all_workflows.json"), None);
        assert_eq!(parse_metadata_name("workflow_abc_combined.json"), None);
        assert_eq!(parse_metadata_name("workflow_.json"), None);
        assert_eq!(parse_metadata_name("workflow_abc.txt"), None);
    }

    #[test]
    fn definition_names() {
        assert_eq!(parse_definition_name("workflow_abc.json"), Some("abc"));
        assert_eq!(parse_definition_name("summary.json"), None);
    }

    #[test]
    fn file_paths() {
        let dir = Path::new("out");
        assert_eq!(workflow_file(dir, "abc"), Path::new("out/workflow_abc.json"));
        assert_eq!(combined_file(dir, "abc"), Path::new("out/workflow_abc_combined.json"));
    }
}
