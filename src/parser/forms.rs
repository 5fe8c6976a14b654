use std::sync::LazyLock;

use regex::Regex;

use super::text::{decode_entities, fragment_text};

static FORM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form\s*>").unwrap());
static INPUT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").unwrap());
static CLICKABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(a|button)\b([^>]*)>(.*?)</(?:a|button)\s*>").unwrap()
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)([a-z_:][a-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

/// Download candidates, tried in order. The first element that matches wins.
const DOWNLOAD_CANDIDATES: &[(Clickable, &str)] = &[
    (Clickable::Any, "Download Workflow JSON"),
    (Clickable::Anchor, "Download"),
    (Clickable::Button, "Download"),
];

/// Attributes a button may carry its target in.
const TARGET_ATTRS: &[&str] = &["href", "data-href", "data-url", "formaction"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clickable {
    Any,
    Anchor,
    Button,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub label: String,
    /// `None` when the element exists but only works through script.
    pub href: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Form `action`; `None` posts back to the page itself.
    pub action: Option<String>,
    pub email_field: String,
    pub password_field: String,
    /// Hidden inputs (csrf tokens etc.) sent along unchanged.
    pub hidden: Vec<(String, String)>,
}

impl LoginForm {
    pub fn fill(&self, email: &str, password: &str) -> Vec<(String, String)> {
        let mut pairs = self.hidden.clone();
        pairs.push((self.email_field.clone(), email.to_string()));
        pairs.push((self.password_field.clone(), password.to_string()));
        pairs
    }
}

/// Find the element a user would click to download the workflow JSON.
pub fn find_download_link(html: &str) -> Option<DownloadLink> {
    let clickables: Vec<(Clickable, String, Option<String>)> = CLICKABLE_RE
        .captures_iter(html)
        .map(|caps| {
            let kind = if caps[1].eq_ignore_ascii_case("a") {
                Clickable::Anchor
            } else {
                Clickable::Button
            };
            let attrs = parse_attrs(&caps[2]);
            let href = TARGET_ATTRS
                .iter()
                .find_map(|name| attr(&attrs, name))
                .filter(|h| !h.is_empty() && *h != "#" && !h.starts_with("javascript:"))
                .map(str::to_string);
            (kind, fragment_text(&caps[3]), href)
        })
        .collect();

    // Labels are matched case-insensitively, like a text selector.
    DOWNLOAD_CANDIDATES.iter().find_map(|(want, needle)| {
        let needle = needle.to_lowercase();
        clickables
            .iter()
            .find(|(kind, text, _)| {
                (*want == Clickable::Any || want == kind) && text.to_lowercase().contains(&needle)
            })
            .map(|(_, text, href)| DownloadLink {
                label: text.clone(),
                href: href.clone(),
            })
    })
}

/// Find the first form with both an email and a password input.
pub fn find_login_form(html: &str) -> Option<LoginForm> {
    FORM_RE.captures_iter(html).find_map(|caps| {
        let form_attrs = parse_attrs(&caps[1]);
        let mut email_field = None;
        let mut password_field = None;
        let mut hidden = Vec::new();

        for input in INPUT_RE.captures_iter(&caps[2]) {
            let attrs = parse_attrs(&input[1]);
            let kind = attr(&attrs, "type").unwrap_or("text").to_ascii_lowercase();
            let name = attr(&attrs, "name").map(str::to_string);
            match kind.as_str() {
                "email" => email_field = Some(name.unwrap_or_else(|| "email".into())),
                "password" => password_field = Some(name.unwrap_or_else(|| "password".into())),
                "hidden" => {
                    if let Some(name) = name {
                        let value = attr(&attrs, "value").unwrap_or_default().to_string();
                        hidden.push((name, value));
                    }
                }
                "text" if email_field.is_none()
                    && name.as_deref().is_some_and(|n| n.to_lowercase().contains("email")) =>
                {
                    email_field = name;
                }
                _ => {}
            }
        }

        Some(LoginForm {
            action: attr(&form_attrs, "action")
                .filter(|a| !a.is_empty())
                .map(str::to_string),
            email_field: email_field?,
            password_field: password_field?,
            hidden,
        })
    })
}

pub fn has_password_input(html: &str) -> bool {
    INPUT_RE.captures_iter(html).any(|caps| {
        attr(&parse_attrs(&caps[1]), "type").is_some_and(|t| t.eq_ignore_ascii_case("password"))
    })
}

fn parse_attrs(raw: &str) -> Vec<(String, String)> {
    ATTR_RE
        .captures_iter(raw)
        .map(|c| {
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (c[1].to_ascii_lowercase(), decode_entities(value))
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

// ── Tests ──
