//! Delta engine: which currently observed items were not seen last pass.
//!
//! Two items are the same when their texts are equal or their first
//! [`PREFIX_MATCH_CHARS`] characters are equal. Distinct notifications sharing
//! that prefix are therefore collapsed; portal noise that only varies in a
//! trailing timestamp relies on this.

use crate::item::{ObservedItem, truncate_chars};

pub const PREFIX_MATCH_CHARS: usize = 50;

pub fn same_item(previous: &ObservedItem, current: &ObservedItem) -> bool {
    previous.text == current.text
        || truncate_chars(&previous.text, PREFIX_MATCH_CHARS)
            == truncate_chars(&current.text, PREFIX_MATCH_CHARS)
}

/// Returns the items of `current` with no match in `previous`, in order.
///
/// With no previous snapshot every current item is taken as already known, so
/// the first pass for an account never reports anything as new.
pub fn diff(previous: Option<&[ObservedItem]>, current: &[ObservedItem]) -> Vec<ObservedItem> {
    let Some(previous) = previous else {
        return Vec::new();
    };
    current
        .iter()
        .filter(|item| !previous.iter().any(|prev| same_item(prev, item)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemCategory;
    use chrono::Utc;

    fn item(idx: usize, text: &str) -> ObservedItem {
        ObservedItem::new(ItemCategory::Keyword, idx, text, Utc::now())
    }

    #[test]
    fn reports_only_unmatched_items() {
        let previous = vec![item(0, "Result A ready...")];
        let current = vec![item(0, "Result A ready..."), item(1, "Result B ready...")];
        let new = diff(Some(&previous), &current);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].text, "Result B ready...");
    }

    #[test]
    fn cold_start_reports_nothing() {
        let current = vec![item(0, "Result A ready..."), item(1, "Result B ready...")];
        assert!(diff(None, &current).is_empty());
    }

    #[test]
    fn empty_previous_snapshot_reports_everything() {
        let current = vec![item(0, "Result A ready...")];
        assert_eq!(diff(Some(&[]), &current).len(), 1);
    }

    #[test]
    fn difference_after_prefix_is_ignored() {
        let prefix = "p".repeat(PREFIX_MATCH_CHARS);
        let previous = vec![item(0, &format!("{prefix} first tail"))];
        let current = vec![item(0, &format!("{prefix} second tail"))];
        assert!(diff(Some(&previous), &current).is_empty());
    }

    #[test]
    fn difference_inside_prefix_is_kept() {
        let tail = "t".repeat(60);
        let previous = vec![item(0, &format!("A{tail}"))];
        let current = vec![item(0, &format!("A{tail}")), item(1, &format!("B{tail}"))];
        let new = diff(Some(&previous), &current);
        assert_eq!(new.len(), 1);
        assert!(new[0].text.starts_with('B'));
    }

    #[test]
    fn identity_ignores_local_id_and_category() {
        let mut moved = item(7, "Result A ready...");
        moved.category = ItemCategory::TableRow;
        assert!(same_item(&item(0, "Result A ready..."), &moved));
    }

    #[test]
    fn unchanged_observation_is_idempotent() {
        let current = vec![item(0, "Result A ready..."), item(1, "Result B ready...")];
        assert!(diff(Some(&current), &current).is_empty());
    }
}
