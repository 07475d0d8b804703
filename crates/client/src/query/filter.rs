use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether matching rows are kept or excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Standard,
    Exclude,
}

/// The value of one named filter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Selected ids of a lookup (statuses, users, ...).
    Ids(BTreeSet<i64>),
    /// Free text.
    Text(String),
    /// Inclusive date range, either bound optional.
    DateRange {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl FilterValue {
    pub fn ids(ids: impl IntoIterator<Item = i64>) -> Self {
        Self::Ids(ids.into_iter().collect())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self::DateRange { start, end }
    }

    /// Only filters with a value take part in a query.
    pub fn has_value(&self) -> bool {
        match self {
            Self::Ids(ids) => !ids.is_empty(),
            Self::Text(text) => !text.trim().is_empty(),
            Self::DateRange { start, end } => start.is_some() || end.is_some(),
        }
    }

    /// The empty value of the same kind.
    pub fn cleared(&self) -> Self {
        match self {
            Self::Ids(_) => Self::Ids(BTreeSet::new()),
            Self::Text(_) => Self::Text(String::new()),
            Self::DateRange { .. } => Self::DateRange {
                start: None,
                end: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FilterPredicate {
    pub value: FilterValue,
    #[serde(default)]
    pub mode: FilterMode,
}

impl FilterPredicate {
    pub fn new(value: FilterValue) -> Self {
        Self {
            value,
            mode: FilterMode::Standard,
        }
    }

    pub fn exclude(value: FilterValue) -> Self {
        Self {
            value,
            mode: FilterMode::Exclude,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value.has_value()
    }
}

/// Committed (applied) filters of a list screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    predicates: BTreeMap<String, FilterPredicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the filters a screen offers, all starting empty.
    pub fn declare(mut self, name: impl Into<String>, empty: FilterValue) -> Self {
        let cleared = empty.cleared();
        self.predicates
            .insert(name.into(), FilterPredicate::new(cleared));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FilterPredicate> {
        self.predicates.get(name)
    }

    /// Filters that contribute to the outgoing query, ordered by name.
    pub fn active(&self) -> impl Iterator<Item = (&str, &FilterPredicate)> {
        self.predicates
            .iter()
            .filter(|(_, p)| p.has_value())
            .map(|(name, p)| (name.as_str(), p))
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Start a drawer editing session seeded from the committed filters.
    pub fn edit(&self) -> FilterDraft {
        FilterDraft {
            staged: self.clone(),
        }
    }

    /// Every filter back to its empty value, in one step.
    pub fn cleared(&self) -> Self {
        Self {
            predicates: self
                .predicates
                .iter()
                .map(|(name, p)| (name.clone(), FilterPredicate::new(p.value.cleared())))
                .collect(),
        }
    }

    pub(crate) fn insert(&mut self, name: String, predicate: FilterPredicate) {
        self.predicates.insert(name, predicate);
    }
}

/// Uncommitted drawer edits.
///
/// Inputs write here; nothing reaches the list until [`commit`](Self::commit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDraft {
    staged: FilterSet,
}

impl FilterDraft {
    pub fn get(&self, name: &str) -> Option<&FilterPredicate> {
        self.staged.get(name)
    }

    /// Set the value of one filter, keeping its mode.
    pub fn set(&mut self, name: &str, value: FilterValue) {
        let mode = self.staged.get(name).map(|p| p.mode).unwrap_or_default();
        self.staged
            .insert(name.to_string(), FilterPredicate { value, mode });
    }

    pub fn set_mode(&mut self, name: &str, mode: FilterMode) {
        if let Some(p) = self.staged.predicates.get_mut(name) {
            p.mode = mode;
        }
    }

    /// Add or remove one id of an id-set filter.
    pub fn toggle_id(&mut self, name: &str, id: i64) {
        let entry = self
            .staged
            .predicates
            .entry(name.to_string())
            .or_insert_with(|| FilterPredicate::new(FilterValue::Ids(BTreeSet::new())));
        if let FilterValue::Ids(ids) = &mut entry.value {
            if !ids.remove(&id) {
                ids.insert(id);
            }
        }
    }

    pub fn clear(&mut self, name: &str) {
        if let Some(p) = self.staged.predicates.get_mut(name) {
            *p = FilterPredicate::new(p.value.cleared());
        }
    }

    pub fn clear_all(&mut self) {
        self.staged = self.staged.cleared();
    }

    /// "Apply": hand the staged filters over for commit.
    pub fn commit(self) -> FilterSet {
        self.staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen_filters() -> FilterSet {
        FilterSet::new()
            .declare("status", FilterValue::ids([]))
            .declare("city", FilterValue::text(""))
            .declare("created_at", FilterValue::range(None, None))
    }

    #[test]
    fn empty_filters_are_inactive() {
        let filters = screen_filters();
        assert_eq!(filters.active_count(), 0);
        assert!(!FilterValue::text("   ").has_value());
        assert!(FilterValue::range(NaiveDate::from_ymd_opt(2024, 1, 1), None).has_value());
    }

    #[test]
    fn draft_edits_do_not_touch_committed_state() {
        let committed = screen_filters();
        let mut draft = committed.edit();
        draft.toggle_id("status", 3);
        draft.set("city", FilterValue::text("Berlin"));

        assert_eq!(committed.active_count(), 0);

        let applied = draft.commit();
        assert_eq!(applied.active_count(), 2);
    }

    #[test]
    fn toggle_removes_existing_id() {
        let mut draft = screen_filters().edit();
        draft.toggle_id("status", 3);
        draft.toggle_id("status", 3);
        assert!(!draft.get("status").unwrap().has_value());
    }

    #[test]
    fn set_keeps_mode() {
        let mut draft = screen_filters().edit();
        draft.set_mode("status", FilterMode::Exclude);
        draft.set("status", FilterValue::ids([1, 2]));
        assert_eq!(draft.get("status").unwrap().mode, FilterMode::Exclude);
    }

    #[test]
    fn clear_all_resets_every_filter() {
        let mut draft = screen_filters().edit();
        draft.toggle_id("status", 1);
        draft.set("city", FilterValue::text("Oslo"));
        draft.set_mode("city", FilterMode::Exclude);
        draft.clear_all();

        let cleared = draft.commit();
        assert_eq!(cleared.active_count(), 0);
        assert_eq!(cleared.get("city").unwrap().mode, FilterMode::Standard);
        assert!(cleared.get("created_at").is_some());
    }
}
