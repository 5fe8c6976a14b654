use indexmap::IndexMap;

/// Page label → output field name.
pub const FIELD_LABELS: &[(&str, &str)] = &[
    ("Workflow ID", "workflow_id_display"),
    ("Workflow Name", "workflow_name"),
    ("Category", "category"),
    ("Difficulty", "difficulty"),
    ("Total Nodes", "total_nodes"),
    ("Tools & Integrations", "tools_integrations"),
    ("Tags", "tags"),
    ("Author", "author"),
    ("Primary Use Case", "primary_use_case"),
    ("Setup Time", "setup_time"),
    ("Use Cases", "use_cases"),
    ("Key Benefits", "key_benefits"),
];

/// Pair every line that exactly matches a known label with the line right
/// after it. Values are single lines; a repeated label keeps its first
/// position but takes the last value.
///
/// This trusts page layout: if a label line shows up somewhere unrelated
/// (nav, footer, a description), the next line is taken as its value anyway.
pub fn extract_fields(lines: &[&str], labels: &[(&str, &str)]) -> IndexMap<String, String> {
    let mut fields = IndexMap::new();

    for (i, line) in lines.iter().enumerate() {
        let line = line.trim();
        let Some(&(_, field)) = labels.iter().find(|(label, _)| *label == line) else {
            continue;
        };
        let Some(next) = lines.get(i + 1) else {
            continue;
        };
        let value = next.trim();
        if !value.is_empty() {
            fields.insert(field.to_string(), value.to_string());
        }
    }

    fields
}

/// Run [`extract_fields`] with the workflow page labels over raw page text.
pub fn extract_page_fields(page_text: &str) -> IndexMap<String, String> {
    let lines: Vec<&str> = page_text.lines().collect();
    extract_fields(&lines, FIELD_LABELS)
}

// ── Tests ──
