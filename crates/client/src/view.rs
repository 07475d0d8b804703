//! Table/card view selection and the infinite card list.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Row;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Table,
    Cards,
}

/// Selected view plus the narrow-viewport override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewSwitch {
    selected: ViewMode,
    narrow: bool,
}

impl ViewSwitch {
    pub fn selected(&self) -> ViewMode {
        self.selected
    }

    /// What is actually rendered: narrow viewports always get cards.
    pub fn effective(&self) -> ViewMode {
        if self.narrow {
            ViewMode::Cards
        } else {
            self.selected
        }
    }

    /// Returns whether the selection changed.
    pub fn select(&mut self, mode: ViewMode) -> bool {
        if self.selected == mode {
            return false;
        }
        self.selected = mode;
        true
    }

    pub fn set_narrow(&mut self, narrow: bool) {
        self.narrow = narrow;
    }
}

/// Card list that grows page by page as the user scrolls.
///
/// A fetch raised by the scroll sentinel appends; any other fetch replaces.
#[derive(Debug, Default)]
pub struct CardAccumulator {
    visible: Vec<Row>,
    accumulate_next: bool,
    observers: Arc<AtomicUsize>,
}

impl CardAccumulator {
    pub fn visible(&self) -> &[Row] {
        &self.visible
    }

    pub fn is_accumulating(&self) -> bool {
        self.accumulate_next
    }

    /// Mark the next ingested page as a continuation.
    pub fn request_more(&mut self) {
        self.accumulate_next = true;
    }

    /// Forget a pending continuation (filter/search/sort changed meanwhile).
    pub fn cancel_more(&mut self) {
        self.accumulate_next = false;
    }

    /// Take in a freshly fetched page.
    pub fn ingest(&mut self, rows: &[Row]) {
        if self.accumulate_next {
            self.visible.extend_from_slice(rows);
            self.accumulate_next = false;
        } else {
            self.visible = rows.to_vec();
        }
    }

    /// Swap in a refetched copy of the last page, keeping earlier pages.
    ///
    /// Falls back to a plain replace when the list does not end with
    /// `previous`.
    pub fn replace_tail(&mut self, previous: &[Row], rows: &[Row]) {
        let keep = self.visible.len().saturating_sub(previous.len());
        if self.visible[keep..] != *previous {
            self.visible = rows.to_vec();
            return;
        }
        self.visible.truncate(keep);
        self.visible.extend_from_slice(rows);
    }

    pub fn reset(&mut self) {
        self.visible.clear();
        self.accumulate_next = false;
    }

    /// Start observing the end-of-list sentinel.
    ///
    /// Intersection callbacks only count while a returned guard is alive.
    /// Guards are counted, so a remount that attaches before the old guard
    /// drops keeps the list observed.
    pub fn observe(&self) -> SentinelGuard {
        self.observers.fetch_add(1, Ordering::SeqCst);
        SentinelGuard {
            observers: Arc::clone(&self.observers),
        }
    }

    pub fn is_observed(&self) -> bool {
        self.observers.load(Ordering::SeqCst) > 0
    }
}

/// Keeps the sentinel observer registered; detaches on drop.
#[derive(Debug)]
#[must_use = "dropping the guard detaches the scroll observer"]
pub struct SentinelGuard {
    observers: Arc<AtomicUsize>,
}

impl Drop for SentinelGuard {
    fn drop(&mut self) {
        self.observers.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(ids: std::ops::Range<i64>) -> Vec<Row> {
        ids.map(Row::new).collect()
    }

    #[test]
    fn narrow_viewport_forces_cards() {
        let mut view = ViewSwitch::default();
        view.set_narrow(true);
        assert_eq!(view.selected(), ViewMode::Table);
        assert_eq!(view.effective(), ViewMode::Cards);
    }

    #[test]
    fn accumulates_only_when_requested() {
        let mut cards = CardAccumulator::default();
        cards.ingest(&rows(0..3));
        cards.request_more();
        cards.ingest(&rows(3..6));
        assert_eq!(cards.visible().len(), 6);
        assert!(!cards.is_accumulating());

        cards.ingest(&rows(10..12));
        assert_eq!(cards.visible().len(), 2);
    }

    #[test]
    fn guard_detaches_on_drop() {
        let cards = CardAccumulator::default();
        assert!(!cards.is_observed());
        let guard = cards.observe();
        assert!(cards.is_observed());
        drop(guard);
        assert!(!cards.is_observed());
    }

    #[test]
    fn overlapping_guards_keep_the_list_observed() {
        let cards = CardAccumulator::default();
        let old = cards.observe();
        let new = cards.observe();
        drop(old);
        assert!(cards.is_observed());
        drop(new);
        assert!(!cards.is_observed());
    }

    #[test]
    fn refetched_last_page_replaces_only_the_tail() {
        let mut cards = CardAccumulator::default();
        cards.ingest(&rows(0..3));
        cards.request_more();
        cards.ingest(&rows(3..6));

        cards.replace_tail(&rows(3..6), &rows(3..5));
        assert_eq!(
            cards.visible().iter().map(|r| r.id.get()).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4]
        );

        cards.replace_tail(&rows(40..42), &rows(7..8));
        assert_eq!(cards.visible().len(), 1);
    }
}
