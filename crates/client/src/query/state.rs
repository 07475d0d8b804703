use backoffice_core::DomainResult;

use super::filter::FilterSet;
use super::pagination::Pagination;
use super::sort::{SortDirection, SortState};

/// Everything that decides which rows a list fetch returns.
///
/// Invariant: any change to sort, search or filters puts pagination back on
/// the first page. Only [`set_page`](Self::set_page) and the card scroll
/// trigger move it forward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pagination: Pagination,
    sort: SortState,
    search: String,
    filters: FilterSet,
}

impl QueryState {
    pub fn new(page_size: u32, filters: FilterSet) -> DomainResult<Self> {
        Ok(Self {
            pagination: Pagination::new(page_size)?,
            sort: SortState::default(),
            search: String::new(),
            filters,
        })
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub(crate) fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }

    pub fn sort(&self) -> &SortState {
        &self.sort
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn set_page(&mut self, page: u32) {
        self.pagination.set_page(page);
    }

    pub fn set_page_size(&mut self, page_size: u32) -> DomainResult<()> {
        self.pagination.set_page_size(page_size)
    }

    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        if self.sort.set(field, direction) {
            self.pagination.first_page();
        }
    }

    pub fn cycle_sort(&mut self, field: &str) {
        self.sort.cycle(field);
        self.pagination.first_page();
    }

    pub fn clear_sort(&mut self) {
        if self.sort.clear() {
            self.pagination.first_page();
        }
    }

    /// Apply a settled (debounced) search term.
    pub fn set_search(&mut self, search: impl Into<String>) {
        let search = search.into();
        if search != self.search {
            self.search = search;
            self.pagination.first_page();
        }
    }

    /// Commit filters from the drawer ("Apply").
    pub fn apply_filters(&mut self, filters: FilterSet) {
        self.filters = filters;
        self.pagination.first_page();
    }

    pub fn clear_filters(&mut self) {
        self.apply_filters(self.filters.cleared());
    }

    /// View switch boundary: search, sort and pagination back to defaults.
    pub fn reset_view_state(&mut self) {
        self.search.clear();
        self.sort.clear();
        self.pagination.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::filter::FilterValue;

    fn on_page_three() -> QueryState {
        let filters = FilterSet::new().declare("status", FilterValue::ids([]));
        let mut state = QueryState::new(10, filters).unwrap();
        state.pagination_mut().set_total(100);
        state.set_page(3);
        state
    }

    #[test]
    fn sort_change_resets_page() {
        let mut state = on_page_three();
        state.set_sort("name", SortDirection::Asc);
        assert_eq!(state.pagination().page(), 0);
    }

    #[test]
    fn search_change_resets_page() {
        let mut state = on_page_three();
        state.set_search("acme");
        assert_eq!(state.pagination().page(), 0);
    }

    #[test]
    fn identical_search_keeps_page() {
        let mut state = on_page_three();
        state.set_search("");
        assert_eq!(state.pagination().page(), 3);
    }

    #[test]
    fn applying_filters_resets_page() {
        let mut state = on_page_three();
        let mut draft = state.filters().edit();
        draft.toggle_id("status", 2);
        state.apply_filters(draft.commit());
        assert_eq!(state.pagination().page(), 0);
        assert_eq!(state.filters().active_count(), 1);
    }

    #[test]
    fn view_reset_keeps_filters() {
        let mut state = on_page_three();
        let mut draft = state.filters().edit();
        draft.toggle_id("status", 2);
        state.apply_filters(draft.commit());
        state.set_sort("name", SortDirection::Desc);
        state.set_search("x");
        state.set_page(2);

        state.reset_view_state();

        assert_eq!(state.search(), "");
        assert!(state.sort().current().is_none());
        assert_eq!(state.pagination().page(), 0);
        assert_eq!(state.filters().active_count(), 1);
    }
}
