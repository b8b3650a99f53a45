use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on stored item text, in characters.
pub const MAX_ITEM_TEXT_CHARS: usize = 200;

/// Which part of the page an item was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Entry of the structured notification list.
    Dropdown,
    /// Free-text line containing a result-ready phrase.
    Keyword,
    /// Row of the activity table.
    TableRow,
}

impl ItemCategory {
    pub fn id_prefix(self) -> &'static str {
        match self {
            ItemCategory::Dropdown => "notification",
            ItemCategory::Keyword => "keyword",
            ItemCategory::TableRow => "result",
        }
    }
}

/// One notification-like item seen during a single reconciliation pass.
///
/// `local_id` is only unique within the pass that produced it; identity across
/// passes is decided on `text` by the delta engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedItem {
    pub local_id: String,
    pub text: String,
    pub category: ItemCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_visit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_url: Option<String>,
    pub observed_at: DateTime<Utc>,
}

impl ObservedItem {
    /// Builds an item, truncating `text` to [`MAX_ITEM_TEXT_CHARS`].
    pub fn new(
        category: ItemCategory,
        index: usize,
        text: &str,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            local_id: format!("{}_{index}", category.id_prefix()),
            text: truncate_chars(text.trim(), MAX_ITEM_TEXT_CHARS).to_string(),
            category,
            related_visit_id: None,
            detail_url: None,
            observed_at,
        }
    }

    pub fn with_visit(mut self, visit_id: impl Into<String>, detail_url: Option<String>) -> Self {
        self.related_visit_id = Some(visit_id.into());
        self.detail_url = detail_url;
        self
    }
}

/// Returns the longest prefix of `text` holding at most `max` characters.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_text_is_cut_to_limit() {
        let text = "x".repeat(500);
        let item = ObservedItem::new(ItemCategory::Keyword, 3, &text, Utc::now());
        assert_eq!(item.text.chars().count(), MAX_ITEM_TEXT_CHARS);
        assert_eq!(item.local_id, "keyword_3");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let text = "نتيجة".repeat(100);
        let cut = truncate_chars(&text, 7);
        assert_eq!(cut.chars().count(), 7);
        assert_eq!(truncate_chars("short", 50), "short");
    }
}
