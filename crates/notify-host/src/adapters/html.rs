//! Markup to [`DocumentModel`] reduction.
//!
//! Regex based and forgiving: it reads the notification dropdown, every link,
//! the visible text and the first table of a portal page. Scripts and styles
//! are dropped before anything else is looked at.

use notify_core::{DocumentLink, DocumentModel};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->")
        .expect("valid regex")
});
static ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b([^>]*)>(.*?)</a\s*>"#).expect("valid regex")
});
static HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).expect("valid regex")
});
static LIST_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li\s*>").expect("valid regex"));
static DROPDOWN_OPEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<(\w+)\b[^>]*\bclass\s*=\s*["'][^"']*\bdropdown-notification\b[^"']*["'][^>]*>"#)
        .expect("valid regex")
});
static ELEMENT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(/?)([A-Za-z][\w-]*)\b[^>]*>").expect("valid regex"));
static TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table\s*>").expect("valid regex"));
static TBODY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tbody\b[^>]*>(.*?)</tbody\s*>").expect("valid regex"));
static ROW: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("valid regex"));
static CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<td\b[^>]*>(.*?)</td\s*>").expect("valid regex"));
static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|li|tr|h[1-6]|ul|ol|table|section|header|footer|a)\s*>")
        .expect("valid regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f\x{a0}]+").expect("valid regex"));

/// Reads `html` loaded from `page_url`. Relative links are resolved against it.
pub fn read_document(page_url: &str, html: &str) -> DocumentModel {
    let html = SCRIPT_OR_STYLE.replace_all(html, " ");
    let base = Url::parse(page_url).ok();

    let mut doc = DocumentModel::new(page_url);
    doc.links = read_links(&html, base.as_ref());
    if let Some(dropdown) = dropdown_section(&html) {
        doc.notification_entries = read_entries(dropdown, base.as_ref());
    }
    doc.text = visible_text(&html);
    doc.table_rows = read_table(&html);
    doc
}

fn read_links(html: &str, base: Option<&Url>) -> Vec<DocumentLink> {
    ANCHOR
        .captures_iter(html)
        .map(|caps| {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let inner = caps.get(2).map_or("", |m| m.as_str());
            let href = href_attr(attrs).and_then(|raw| resolve(base, &raw));
            DocumentLink::new(inline_text(inner), href.as_deref())
        })
        .collect()
}

/// Anchors of the dropdown, or its list items when it carries no anchors.
fn read_entries(section: &str, base: Option<&Url>) -> Vec<DocumentLink> {
    let anchors = read_links(section, base);
    if !anchors.is_empty() {
        return anchors;
    }
    LIST_ITEM
        .captures_iter(section)
        .filter_map(|caps| caps.get(1))
        .map(|m| DocumentLink::new(inline_text(m.as_str()), None))
        .collect()
}

fn href_attr(attrs: &str) -> Option<String> {
    let caps = HREF.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| decode_entities(m.as_str()))
}

fn resolve(base: Option<&Url>, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') || raw.starts_with("javascript:") {
        return None;
    }
    match base {
        Some(base) => base.join(raw).ok().map(String::from),
        None => Some(raw.to_string()),
    }
}

/// Inner markup of the element carrying the `dropdown-notification` class,
/// matched by counting nested open and close tags of the same name.
fn dropdown_section(html: &str) -> Option<&str> {
    let open = DROPDOWN_OPEN.captures(html)?;
    let whole = open.get(0)?;
    let name = open.get(1)?.as_str();
    let start = whole.end();

    let mut depth = 1usize;
    for caps in ELEMENT_TAG.captures_iter(&html[start..]) {
        if !caps.get(2).is_some_and(|m| m.as_str().eq_ignore_ascii_case(name)) {
            continue;
        }
        let tag = caps.get(0)?;
        if caps.get(1).is_some_and(|m| !m.as_str().is_empty()) {
            depth -= 1;
            if depth == 0 {
                return Some(&html[start..start + tag.start()]);
            }
        } else if !tag.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    Some(&html[start..])
}

fn read_table(html: &str) -> Vec<Vec<String>> {
    let Some(table) = TABLE.captures(html).and_then(|c| c.get(1)) else {
        return Vec::new();
    };
    let body = TBODY
        .captures(table.as_str())
        .and_then(|c| c.get(1))
        .map_or(table.as_str(), |m| m.as_str());
    ROW.captures_iter(body)
        .filter_map(|row| row.get(1))
        .map(|row| {
            CELL.captures_iter(row.as_str())
                .filter_map(|c| c.get(1))
                .map(|c| inline_text(c.as_str()))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Rendered text with one line per block element.
fn visible_text(html: &str) -> String {
    let body_start = html
        .to_ascii_lowercase()
        .find("<body")
        .unwrap_or(0);
    let with_breaks = BLOCK_BREAK.replace_all(&html[body_start..], "\n");
    let stripped = TAG.replace_all(&with_breaks, " ");
    decode_entities(&stripped)
        .lines()
        .map(|line| SPACES.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline_text(fragment: &str) -> String {
    let stripped = TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
