use std::collections::HashSet;
use tracing::debug;

use crate::config::PageEntry;

/// Zero-based page indices in first-occurrence order, unique by page number.
///
/// Values are kept signed: a configured page `0` or a negative page maps to
/// an index that no document contains and is dropped during assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub indices: Vec<i64>,
    /// Entries dropped because their page number was already selected.
    pub duplicates: usize,
    /// Entries with neither `pageIndex` nor `page`.
    pub unnumbered: usize,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Reduce configured entries to the ordered list of pages to copy.
pub fn select_pages(entries: &[PageEntry]) -> Selection {
    let mut seen = HashSet::new();
    let mut selection = Selection::default();

    for (position, entry) in entries.iter().enumerate() {
        let Some(number) = entry.page_number() else {
            selection.unnumbered += 1;
            continue;
        };

        if seen.insert(number) {
            selection.indices.push(number - 1);
        } else {
            debug!("Skipping duplicate page {} (entry {})", number, position + 1);
            selection.duplicates += 1;
        }
    }

    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(numbers: &[i64]) -> Vec<PageEntry> {
        numbers.iter().map(|&n| PageEntry::numbered(n)).collect()
    }

    #[test]
    fn test_first_occurrence_order() {
        let selection = select_pages(&entries(&[3, 1, 3, 2]));
        assert_eq!(selection.indices, vec![2, 0, 1]);
        assert_eq!(selection.duplicates, 1);
    }

    #[test]
    fn test_empty() {
        let selection = select_pages(&[]);
        assert!(selection.is_empty());
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn test_mixed_keys_dedupe_by_value() {
        let list = vec![
            PageEntry {
                page_index: Some(2),
                ..Default::default()
            },
            PageEntry::numbered(5),
            PageEntry {
                page_index: Some(2),
                ..Default::default()
            },
            PageEntry::numbered(2),
        ];
        let selection = select_pages(&list);
        assert_eq!(selection.indices, vec![1, 4]);
        assert_eq!(selection.duplicates, 2);
    }

    #[test]
    fn test_unnumbered_entries_skipped() {
        let list = vec![PageEntry::default(), PageEntry::numbered(7)];
        let selection = select_pages(&list);
        assert_eq!(selection.indices, vec![6]);
        assert_eq!(selection.unnumbered, 1);
    }

    #[test]
    fn test_unchecked_values_pass_through() {
        let selection = select_pages(&entries(&[0, -4, 0]));
        assert_eq!(selection.indices, vec![-1, -5]);
    }

    #[test]
    fn test_never_repeats_a_page() {
        let list = entries(&[9, 4, 9, 9, 1, 4, 6, 1, 9, 2]);
        let selection = select_pages(&list);
        let unique: HashSet<_> = selection.indices.iter().collect();
        assert_eq!(unique.len(), selection.len());
        assert_eq!(selection.indices, vec![8, 3, 0, 5, 1]);
        assert_eq!(selection.len() + selection.duplicates, list.len());
    }
}
