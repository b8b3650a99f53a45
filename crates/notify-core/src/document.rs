//! Structured view of a rendered portal page.
//!
//! Portal adapters reduce markup to this shape; extraction never sees raw HTML,
//! so fixtures can be built by hand in tests.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLink {
    pub text: String,
    /// Absolute URL when the adapter could resolve it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl DocumentLink {
    pub fn new(text: impl Into<String>, href: Option<&str>) -> Self {
        Self {
            text: text.into(),
            href: href.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentModel {
    /// Address the page was loaded from.
    pub url: String,
    /// Entries of the structured notification list, in page order.
    #[serde(default)]
    pub notification_entries: Vec<DocumentLink>,
    /// Every link in the page, in page order.
    #[serde(default)]
    pub links: Vec<DocumentLink>,
    /// Visible text, one rendered line per `\n`.
    #[serde(default)]
    pub text: String,
    /// Body rows of the activity table, one entry per cell.
    #[serde(default)]
    pub table_rows: Vec<Vec<String>>,
}

impl DocumentModel {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, text: &str, href: Option<&str>) -> Self {
        let link = DocumentLink::new(text, href);
        self.links.push(link.clone());
        self.notification_entries.push(link);
        self
    }

    pub fn with_link(mut self, text: &str, href: &str) -> Self {
        self.links.push(DocumentLink::new(text, Some(href)));
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(text);
        self
    }

    pub fn with_row<S: AsRef<str>>(mut self, cells: &[S]) -> Self {
        self.table_rows
            .push(cells.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.notification_entries.is_empty()
            && self.links.is_empty()
            && self.text.trim().is_empty()
            && self.table_rows.is_empty()
    }
}
