//! List screen controller.
//!
//! One [`ListScreen`] per mounted entity list. It owns the query inputs,
//! decides when to fetch, keeps the last good page visible while a new one
//! loads, and only accepts a response whose key still matches the current
//! query, so a slow stale response can never overwrite newer state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use backoffice_auth::{PagePermissions, RowActions, Viewer};
use backoffice_core::{DomainResult, RowId};

use crate::api::BackofficeApi;
use crate::cache::{SharedCache, lock};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::export::export_path;
use crate::query::{FilterDraft, FilterSet, QueryKey, QueryState, SearchInput, SortDirection};
use crate::store::{Action, StoreHandle};
use crate::types::{ListResult, Row};
use crate::view::{CardAccumulator, SentinelGuard, ViewMode, ViewSwitch};

/// When placeholder data should give way to a loading spinner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StalePolicy {
    /// `None`: as soon as a request is in flight.
    pub spinner_after: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub key: QueryKey,
}

#[derive(Debug)]
pub enum FetchPlan {
    /// The page was out of range; pagination has been reset, plan again.
    Skip,
    /// Served from a fresh cache entry; nothing to request.
    Cached,
    Request(FetchRequest),
}

#[derive(Debug)]
pub struct FetchResponse {
    pub key: QueryKey,
    pub result: Result<Arc<ListResult>, ApiError>,
}

/// Perform a planned request and cache a successful result under its key.
///
/// Caching happens whether or not the key is still current; only
/// [`ListScreen::complete`] decides what becomes visible.
pub async fn execute<A>(api: &A, cache: &SharedCache<ListResult>, request: FetchRequest) -> FetchResponse
where
    A: BackofficeApi + ?Sized,
{
    let path = request.key.path();
    tracing::debug!(%path, "fetching list");

    let result = api
        .list(&path)
        .await
        .map(|resp| Arc::new(ListResult::from(resp)));

    if let Ok(value) = &result {
        lock(cache).insert(request.key.clone(), Arc::clone(value), Instant::now());
    }

    FetchResponse {
        key: request.key,
        result,
    }
}

#[derive(Debug)]
pub struct ListScreen {
    entity: String,
    query: QueryState,
    search: SearchInput,
    view: ViewSwitch,
    cards: CardAccumulator,
    cache: SharedCache<ListResult>,
    visible: Option<Arc<ListResult>>,
    visible_key: Option<QueryKey>,
    loading_since: Option<Instant>,
    error: Option<ApiError>,
    stale: StalePolicy,
    store: Option<StoreHandle>,
}

impl ListScreen {
    pub fn new(
        entity: impl Into<String>,
        filters: FilterSet,
        cache: SharedCache<ListResult>,
        config: &ClientConfig,
    ) -> DomainResult<Self> {
        Ok(Self {
            entity: entity.into(),
            query: QueryState::new(config.page_size, filters)?,
            search: SearchInput::new(config.search_debounce),
            view: ViewSwitch::default(),
            cards: CardAccumulator::default(),
            cache,
            visible: None,
            visible_key: None,
            loading_since: None,
            error: None,
            stale: StalePolicy {
                spinner_after: config.spinner_after,
            },
            store: None,
        })
    }

    /// Publish the query string and edit counts to the app store.
    pub fn with_store(mut self, store: StoreHandle) -> Self {
        self.store = Some(store);
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn search_input(&self) -> &SearchInput {
        &self.search
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view.effective()
    }

    pub fn result(&self) -> Option<&ListResult> {
        self.visible.as_deref()
    }

    /// Rows the current view renders: the page in table mode, the
    /// accumulated list in card mode.
    pub fn rows(&self) -> &[Row] {
        match self.view.effective() {
            ViewMode::Cards => self.cards.visible(),
            ViewMode::Table => self.visible.as_deref().map(|r| r.rows.as_slice()).unwrap_or_default(),
        }
    }

    pub fn page_count(&self) -> u64 {
        self.query.pagination().page_count()
    }

    pub fn is_loading(&self) -> bool {
        self.loading_since.is_some()
    }

    /// Last fetch failure; previous data stays visible meanwhile.
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub fn query_key(&self) -> QueryKey {
        QueryKey::compose(&self.entity, &self.query)
    }

    pub fn query_string(&self) -> String {
        self.query_key().query_string()
    }

    pub fn export_path(&self) -> String {
        export_path(&self.query_key())
    }

    // ── inputs ──────────────────────────────────────────────────────────

    pub fn type_search(&mut self, text: impl Into<String>, now: Instant) {
        self.search.input(text, now);
    }

    /// Settle debounced search. Returns whether the query changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(term) = self.search.poll(now).map(str::to_string) else {
            return false;
        };
        self.query.set_search(term);
        self.cards.cancel_more();
        true
    }

    pub fn set_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        self.query.set_sort(field, direction);
        self.cards.cancel_more();
    }

    pub fn cycle_sort(&mut self, field: &str) {
        self.query.cycle_sort(field);
        self.cards.cancel_more();
    }

    pub fn clear_sort(&mut self) {
        self.query.clear_sort();
        self.cards.cancel_more();
    }

    pub fn set_page(&mut self, page: u32) {
        self.query.set_page(page);
        self.cards.cancel_more();
    }

    pub fn set_page_size(&mut self, page_size: u32) -> DomainResult<()> {
        self.query.set_page_size(page_size)?;
        self.cards.cancel_more();
        Ok(())
    }

    /// Open the filter drawer on a copy of the applied filters.
    pub fn edit_filters(&self) -> FilterDraft {
        self.query.filters().edit()
    }

    pub fn apply_filters(&mut self, draft: FilterDraft) {
        self.query.apply_filters(draft.commit());
        self.cards.cancel_more();
    }

    pub fn clear_filters(&mut self) {
        self.query.clear_filters();
        self.cards.cancel_more();
    }

    /// Switch table/cards. A real switch resets search, sort and paging.
    pub fn set_view(&mut self, mode: ViewMode) {
        if !self.view.select(mode) {
            return;
        }
        self.search.clear();
        self.query.reset_view_state();
        self.cards.reset();
    }

    pub fn set_narrow_viewport(&mut self, narrow: bool) {
        self.view.set_narrow(narrow);
    }

    /// Attach the end-of-list sentinel observer for the card view.
    pub fn mount_cards(&self) -> SentinelGuard {
        self.cards.observe()
    }

    /// The sentinel scrolled into view.
    ///
    /// Requests the next page as a continuation. Returns `false` (nothing
    /// changed) when unmounted, not in card mode, mid-load, or at the end.
    pub fn sentinel_visible(&mut self) -> bool {
        if !self.cards.is_observed() || self.view.effective() != ViewMode::Cards || self.is_loading() {
            return false;
        }
        if !self.query.pagination_mut().advance() {
            return false;
        }
        self.cards.request_more();
        true
    }

    // ── fetching ────────────────────────────────────────────────────────

    /// Decide what the current query needs.
    pub fn begin_fetch(&mut self, now: Instant) -> FetchPlan {
        if !self.query.pagination().is_valid() {
            tracing::debug!(
                entity = %self.entity,
                page = self.query.pagination().page(),
                "skipping fetch for out-of-range page"
            );
            self.query.pagination_mut().reset();
            self.cards.cancel_more();
            return FetchPlan::Skip;
        }

        let key = self.query_key();
        let (fresh, placeholder) = {
            let cache = lock(&self.cache);
            (cache.get_fresh(&key, now), cache.get(&key))
        };

        if let Some(value) = fresh {
            self.loading_since = None;
            if !self.is_showing(&key, &value) {
                self.apply(key, value);
            }
            return FetchPlan::Cached;
        }

        if let Some(previous) = placeholder {
            self.visible = Some(previous);
        }
        self.loading_since.get_or_insert(now);
        FetchPlan::Request(FetchRequest { key })
    }

    /// Take in a response. Returns whether it was applied.
    pub fn complete(&mut self, response: FetchResponse) -> bool {
        if response.key != self.query_key() {
            tracing::debug!(key = %response.key, "discarding response for superseded query");
            return false;
        }
        self.loading_since = None;

        match response.result {
            Ok(value) => self.apply(response.key, value),
            Err(err) => {
                tracing::warn!(entity = %self.entity, error = %err, "list fetch failed");
                self.error = Some(err);
            }
        }
        true
    }

    /// Plan, request and apply in one go.
    pub async fn refresh<A>(&mut self, api: &A, now: Instant) -> bool
    where
        A: BackofficeApi + ?Sized,
    {
        let mut plan = self.begin_fetch(now);
        if matches!(plan, FetchPlan::Skip) {
            plan = self.begin_fetch(now);
        }

        match plan {
            FetchPlan::Skip => false,
            FetchPlan::Cached => true,
            FetchPlan::Request(request) => {
                let response = execute(api, &self.cache, request).await;
                self.complete(response)
            }
        }
    }

    /// Whether the visible data is missing, for another query, or invalidated.
    pub fn needs_refetch(&self, now: Instant) -> bool {
        let key = self.query_key();
        self.visible_key.as_ref() != Some(&key) || !lock(&self.cache).is_fresh(&key, now)
    }

    pub fn show_spinner(&self, now: Instant) -> bool {
        let Some(since) = self.loading_since else {
            return false;
        };
        if self.visible.is_none() {
            return true;
        }
        let threshold = self.stale.spinner_after.unwrap_or_default();
        now.saturating_duration_since(since) >= threshold
    }

    /// Per-row action visibility for whatever the view renders.
    pub fn row_actions(&self, permissions: &PagePermissions, viewer: &Viewer) -> Vec<(RowId, RowActions)> {
        RowActions::for_rows(permissions, viewer, self.rows())
    }

    fn is_showing(&self, key: &QueryKey, value: &Arc<ListResult>) -> bool {
        self.visible_key.as_ref() == Some(key) && self.visible.as_ref().is_some_and(|v| Arc::ptr_eq(v, value))
    }

    /// Make `value` visible. A refetch of the visible key swaps the last
    /// card page in place; anything else goes through the accumulator.
    fn apply(&mut self, key: QueryKey, value: Arc<ListResult>) {
        if !self.query.pagination_mut().set_total(value.total_count) {
            tracing::debug!(entity = %self.entity, "current page fell out of range");
        }
        match (&self.visible, self.visible_key.as_ref() == Some(&key)) {
            (Some(previous), true) => self.cards.replace_tail(&previous.rows, &value.rows),
            _ => self.cards.ingest(&value.rows),
        }
        self.error = None;

        if let Some(store) = &self.store {
            store.dispatch(Action::SetSearchQuery(key.query_string()));
            if let Some(count) = value.count_edits {
                store.dispatch(Action::SetEditCount {
                    entity: self.entity.clone(),
                    count,
                });
            }
        }

        self.visible = Some(value);
        self.visible_key = Some(key);
    }
}
