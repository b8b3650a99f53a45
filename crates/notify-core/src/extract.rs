//! Notification extraction from a rendered page.
//!
//! Three independent sources are scanned and their results concatenated in a
//! fixed order: the structured notification list, free-text lines carrying a
//! result-ready phrase, and the activity table. Extraction cannot fail; a page
//! with none of the sources yields an empty [`Extraction`].

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::DocumentModel;
use crate::item::{ItemCategory, ObservedItem};

static VISIT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"VisitId=(\d+)").expect("visit id regex"));

/// Placeholder substituted in [`ExtractorConfig::visit_url_template`].
pub const VISIT_ID_PLACEHOLDER: &str = "{visit_id}";

/// Pulls the visit identifier out of a link target.
pub fn parse_visit_id(href: &str) -> Option<String> {
    VISIT_ID
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Result-ready phrases searched for in the page text.
    pub keywords: Vec<String>,
    /// List entries containing any of these markers are ignored.
    pub skip_markers: Vec<String>,
    /// Candidate text must be strictly longer than this many characters.
    pub min_text_chars: usize,
    pub row_separator: String,
    /// Detail page for a visit; `{visit_id}` is replaced. When unset the
    /// entry's own link is used.
    pub visit_url_template: Option<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "Your Result is Ready",
                "النتيجة جاهزة",
                "Result Ready",
                "نتيجة",
                "Ready in",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            skip_markers: vec!["Read all".into()],
            min_text_chars: 5,
            row_separator: " | ".into(),
            visit_url_template: None,
        }
    }
}

/// Most recent visit referenced by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitRef {
    pub visit_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    pub items: Vec<ObservedItem>,
    pub latest_visit: Option<VisitRef>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Visit identifiers of list entries, in page order, without repeats.
    pub fn visit_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.items.iter().filter_map(|i| i.related_visit_id.as_deref()) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, doc: &DocumentModel) -> Extraction {
        self.extract_at(doc, Utc::now())
    }

    /// Same as [`Extractor::extract`] with an explicit observation time.
    pub fn extract_at(&self, doc: &DocumentModel, observed_at: DateTime<Utc>) -> Extraction {
        let mut items = Vec::new();
        self.scan_entries(doc, observed_at, &mut items);
        self.scan_keywords(doc, observed_at, &mut items);
        self.scan_table(doc, observed_at, &mut items);
        Extraction {
            items,
            latest_visit: self.latest_visit(doc),
        }
    }

    fn long_enough(&self, text: &str) -> bool {
        text.chars().count() > self.config.min_text_chars
    }

    fn visit_url(&self, visit_id: &str, href: Option<&str>) -> Option<String> {
        match &self.config.visit_url_template {
            Some(template) => Some(template.replace(VISIT_ID_PLACEHOLDER, visit_id)),
            None => href.map(str::to_string),
        }
    }

    fn scan_entries(&self, doc: &DocumentModel, at: DateTime<Utc>, out: &mut Vec<ObservedItem>) {
        for (idx, entry) in doc.notification_entries.iter().enumerate() {
            let text = entry.text.trim();
            if !self.long_enough(text) {
                continue;
            }
            if self.config.skip_markers.iter().any(|m| text.contains(m.as_str())) {
                continue;
            }
            let mut item = ObservedItem::new(ItemCategory::Dropdown, idx, text, at);
            let href = entry.href.as_deref();
            if let Some(visit_id) = href.and_then(parse_visit_id) {
                let url = self.visit_url(&visit_id, href);
                item = item.with_visit(visit_id, url);
            }
            out.push(item);
        }
    }

    fn scan_keywords(&self, doc: &DocumentModel, at: DateTime<Utc>, out: &mut Vec<ObservedItem>) {
        for (idx, line) in doc.text.lines().enumerate() {
            let line = line.trim();
            if !self.long_enough(line) {
                continue;
            }
            if self.config.keywords.iter().any(|k| line.contains(k.as_str())) {
                out.push(ObservedItem::new(ItemCategory::Keyword, idx, line, at));
            }
        }
    }

    fn scan_table(&self, doc: &DocumentModel, at: DateTime<Utc>, out: &mut Vec<ObservedItem>) {
        for (idx, row) in doc.table_rows.iter().enumerate() {
            if row.is_empty() {
                continue;
            }
            let joined = row
                .iter()
                .map(|cell| cell.trim())
                .collect::<Vec<_>>()
                .join(&self.config.row_separator);
            if self.long_enough(&joined) {
                out.push(ObservedItem::new(ItemCategory::TableRow, idx, &joined, at));
            }
        }
    }

    fn latest_visit(&self, doc: &DocumentModel) -> Option<VisitRef> {
        doc.links.iter().find_map(|link| {
            let href = link.href.as_deref()?;
            let visit_id = parse_visit_id(href)?;
            Some(VisitRef {
                visit_id,
                url: href.to_string(),
            })
        })
    }
}

/// Extracts with the default phrase list and limits.
pub fn extract(doc: &DocumentModel) -> Extraction {
    Extractor::default().extract(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::MAX_ITEM_TEXT_CHARS;

    const VISIT: &str = "https://portal.test/Patient/Visit?VisitId=";

    fn fixture() -> DocumentModel {
        DocumentModel::new("https://portal.test/Patient/Notification")
            .with_entry("Your Result is Ready for visit 812", Some(&format!("{VISIT}812")))
            .with_entry("Read all notifications", Some("https://portal.test/Notification"))
            .with_entry("tiny", None)
            .with_text("Welcome back\nالنتيجة جاهزة للزيارة 812\n  Result Ready in 2 days  ")
            .with_row(&["812", "CBC", "Completed"])
            .with_row(&["", ""])
    }

    #[test]
    fn scans_all_three_sources() {
        let at = Utc::now();
        let extraction = Extractor::default().extract_at(&fixture(), at);
        let categories: Vec<_> = extraction.items.iter().map(|i| i.category).collect();
        assert_eq!(
            categories,
            vec![
                ItemCategory::Dropdown,
                ItemCategory::Keyword,
                ItemCategory::Keyword,
                ItemCategory::TableRow
            ]
        );
        let entry = &extraction.items[0];
        assert_eq!(entry.local_id, "notification_0");
        assert_eq!(entry.related_visit_id.as_deref(), Some("812"));
        assert_eq!(entry.detail_url.as_deref(), Some("https://portal.test/Patient/Visit?VisitId=812"));
        assert_eq!(extraction.items[2].text, "Result Ready in 2 days");
        assert_eq!(extraction.items[3].text, "812 | CBC | Completed");
        assert_eq!(extraction.items[3].local_id, "result_0");
    }

    #[test]
    fn latest_visit_is_first_visit_link() {
        let doc = DocumentModel::new("u")
            .with_link("Home", "https://portal.test/")
            .with_link("Visit 900", &format!("{VISIT}900"))
            .with_link("Visit 812", &format!("{VISIT}812"));
        let extraction = extract(&doc);
        assert!(extraction.items.is_empty());
        let latest = extraction.latest_visit.expect("latest visit");
        assert_eq!(latest.visit_id, "900");
        assert_eq!(latest.url, format!("{VISIT}900"));
    }

    #[test]
    fn visit_template_overrides_entry_link() {
        let extractor = Extractor::new(ExtractorConfig {
            visit_url_template: Some("https://other.test/v/{visit_id}".into()),
            ..ExtractorConfig::default()
        });
        let doc = DocumentModel::new("u").with_entry("Result for visit 7", Some("/x?VisitId=7"));
        let extraction = extractor.extract(&doc);
        assert_eq!(
            extraction.items[0].detail_url.as_deref(),
            Some("https://other.test/v/7")
        );
    }

    #[test]
    fn line_matching_several_phrases_yields_one_item() {
        let doc = DocumentModel::new("u").with_text("Your Result is Ready - النتيجة جاهزة");
        assert_eq!(extract(&doc).items.len(), 1);
    }

    #[test]
    fn long_text_is_truncated() {
        let long = format!("Result Ready {}", "y".repeat(500));
        let doc = DocumentModel::new("u").with_text(&long);
        let items = extract(&doc).items;
        assert_eq!(items[0].text.chars().count(), MAX_ITEM_TEXT_CHARS);
    }

    #[test]
    fn deterministic_for_same_document() {
        let at = Utc::now();
        let extractor = Extractor::default();
        let doc = fixture();
        assert_eq!(extractor.extract_at(&doc, at), extractor.extract_at(&doc, at));
    }

    #[test]
    fn empty_document_yields_nothing() {
        let extraction = extract(&DocumentModel::new("u"));
        assert!(extraction.is_empty());
        assert!(extraction.latest_visit.is_none());
    }

    #[test]
    fn visit_ids_are_unique_in_page_order() {
        let doc = DocumentModel::new("u")
            .with_entry("Result A ready now", Some("/v?VisitId=2"))
            .with_entry("Result B ready now", Some("/v?VisitId=1"))
            .with_entry("Result A again ready", Some("/v?VisitId=2"));
        assert_eq!(extract(&doc).visit_ids(), vec!["2", "1"]);
    }
}
