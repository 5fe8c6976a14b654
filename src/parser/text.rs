use std::sync::LazyLock;

use regex::Regex;

static BODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap());
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap());
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];
static SELF_CLOSING_HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template|svg)\b[^>]*/>").unwrap()
});
// One regex per tag: each opening tag may only close on its own name.
static HIDDEN_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    HIDDEN_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")).unwrap())
        .collect()
});
static BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<br\s*/?>|</?(p|div|h[1-6]|li|ul|ol|dl|dt|dd|tr|td|th|table|thead|tbody|section|article|header|footer|nav|main|aside|form|label|button|figure|figcaption|blockquote|pre|hr)\b[^>]*>",
    )
    .unwrap()
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\u{a0}]+").unwrap());

/// Stands in for a block boundary while source whitespace is collapsed.
const BLOCK_BREAK: &str = "\u{1}";

/// Approximate a browser's `innerText` for `<body>`: one line per block
/// element, inline markup flattened, blank lines dropped.
pub fn visible_text(html: &str) -> String {
    let body = BODY_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html);

    let mut stripped = COMMENT_RE.replace_all(body, "").into_owned();
    stripped = SELF_CLOSING_HIDDEN_RE.replace_all(&stripped, "").into_owned();
    for re in HIDDEN_RES.iter() {
        stripped = re.replace_all(&stripped, "").into_owned();
    }
    let broken = BREAK_RE.replace_all(&stripped, BLOCK_BREAK);
    let flat = TAG_RE.replace_all(&broken, "");

    // Source newlines are layout only; collapse them with other whitespace
    // and break lines at block boundaries alone.
    flat.split(BLOCK_BREAK)
        .map(|block| SPACE_RE.replace_all(&decode_entities(block), " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Contents of `<title>`, entity-decoded and whitespace-collapsed.
pub fn page_title(html: &str) -> Option<String> {
    let raw = TITLE_RE.captures(html)?.get(1)?.as_str();
    let title = collapse_whitespace(&decode_entities(raw));
    Some(title)
}

/// Strip tags from an HTML fragment and collapse it to a single line.
pub fn fragment_text(fragment: &str) -> String {
    collapse_whitespace(&decode_entities(&TAG_RE.replace_all(fragment, " ")))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    ENTITY_RE
        .replace_all(s, |caps: &regex::Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or(name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(name)
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "rsquo" => '’',
        "lsquo" => '‘',
        "rdquo" => '”',
        "ldquo" => '“',
        "middot" => '·',
        "copy" => '©',
        _ => return None,
    };
    Some(c)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::labels::extract_page_fields;

    #[test]
    fn block_elements_become_lines() {
        let html = "<body><div>Category</div><div><span>Lead</span> <b>Gen</b></div></body>";
        assert_eq!(visible_text(html), "Category\nLead Gen");
    }

    #[test]
    fn scripts_styles_and_comments_hidden() {
        let html = "<html><head><title>T</title><style>.a{}</style></head>\
                    <body><script>var x = '<div>no</div>';</script><!-- hi --><p>yes</p></body></html>";
        assert_eq!(visible_text(html), "yes");
    }

    #[test]
    fn wrapped_source_lines_stay_one_value() {
        let html = "<dl><dt>Tools &amp; Integrations</dt>\n<dd>HubSpot,\n      Clearbit, Slack</dd>\n\
                    <dt>Workflow\n  Name</dt><dd>Lead Gen</dd></dl>";
        let text = visible_text(html);
        assert_eq!(
            text,
            "Tools & Integrations\nHubSpot, Clearbit, Slack\nWorkflow Name\nLead Gen"
        );
        let fields = extract_page_fields(&text);
        assert_eq!(fields["tools_integrations"], "HubSpot, Clearbit, Slack");
        assert_eq!(fields["workflow_name"], "Lead Gen");
    }

    #[test]
    fn br_still_breaks_lines() {
        assert_eq!(visible_text("<p>one<br>two<br/>three</p>"), "one\ntwo\nthree");
    }

    #[test]
    fn self_closing_svg_keeps_following_text() {
        let html = "<body><a href='/x'><svg viewBox='0 0 1 1'/></a>\
                    <dl><dt>Category</dt><dd>Sales</dd></dl><script>x()</script></body>";
        assert_eq!(visible_text(html), "Category\nSales");
    }

    #[test]
    fn hidden_tags_close_only_on_their_own_name() {
        let html = "<svg><path/></svg><p>kept</p><style>.a{}</style><p>also kept</p>";
        assert_eq!(visible_text(html), "kept\nalso kept");
        let mismatched = "<p>before</p><svg><g></g><p>inside</p></style><p>after</p></svg><p>end</p>";
        assert_eq!(visible_text(mismatched), "before\nend");
    }

    #[test]
    fn entities_decoded() {
        assert_eq!(visible_text("<p>Tools &amp; Integrations</p>"), "Tools & Integrations");
        assert_eq!(decode_entities("&#65;&#x42;&unknown;"), "AB&unknown;");
    }

    #[test]
    fn title_extracted() {
        let html = "<head><title>\n  Lead Gen &amp; CRM | Vibe </title></head>";
        assert_eq!(page_title(html).as_deref(), Some("Lead Gen & CRM | Vibe"));
        assert_eq!(page_title("<p>none</p>"), None);
    }

    #[test]
    fn fragment_flattened() {
        assert_eq!(fragment_text("  <svg></svg><span>Download</span>\n Workflow JSON "), "Download Workflow JSON");
    }

    #[test]
    fn fixture_page_fields() {
        let html = std::fs::read_to_string("tests/fixtures/workflow_page.html").unwrap();
        let text = visible_text(&html);
        let fields = extract_page_fields(&text);
        assert_eq!(fields["workflow_name"], "Lead Enrichment Pipeline");
        assert_eq!(fields["category"], "Sales");
        assert_eq!(fields["tools_integrations"], "HubSpot, Clearbit, Slack");
        assert_eq!(fields["total_nodes"], "14");
        assert_eq!(fields["workflow_id_display"], "0a3e65f3");
        // "Key Benefits" is the last line of the page
        assert!(!fields.contains_key("key_benefits"));
        // "Author" is followed by an empty element, which the text drops,
        // so it pairs with the next label instead.
        assert_eq!(fields["author"], "Setup Time");
    }
}
