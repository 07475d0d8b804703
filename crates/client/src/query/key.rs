//! Query key composer.
//!
//! Turns a [`QueryState`] into the cache identity of a fetch and the query
//! string the collection endpoint understands. Pure: no IO.
//!
//! Wire format, in this order:
//!
//! ```text
//! page=<page + 1>&perPage=<size>          always (server pages are 1-based)
//! sort=<field>&order=asc|desc             when sorted
//! search=<text>                           when non-empty
//! <name>[]=<id>                           per id, ascending
//! <name>=<text>
//! <name>[start]=YYYY-MM-DD, <name>[end]=YYYY-MM-DD
//! <name>_mode=exclude                     exclude filters only
//! ```

use std::collections::BTreeMap;

use reqwest::Url;

use super::filter::{FilterMode, FilterPredicate, FilterValue};
use super::sort::SortSpec;
use super::state::QueryState;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical identity of a list fetch.
///
/// Derived only from inputs that change the result, with filters held in a
/// sorted map and empty filters dropped, so equal logical state always
/// yields an equal key regardless of how it was built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryKey {
    entity: String,
    page: u32,
    page_size: u32,
    sort: Option<SortSpec>,
    search: String,
    filters: BTreeMap<String, FilterPredicate>,
}

impl QueryKey {
    pub fn compose(entity: &str, state: &QueryState) -> Self {
        Self {
            entity: entity.to_string(),
            page: state.pagination().page(),
            page_size: state.pagination().page_size(),
            sort: state.sort().current().cloned(),
            search: state.search().trim().to_string(),
            filters: state
                .filters()
                .active()
                .map(|(name, p)| (name.to_string(), normalized(p)))
                .collect(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// Full query string for the collection endpoint.
    pub fn query_string(&self) -> String {
        self.encode(true)
    }

    /// Query string without pagination, for exports of the whole filtered set.
    pub fn export_query_string(&self) -> String {
        self.encode(false)
    }

    /// `<entity>?<query string>`
    pub fn path(&self) -> String {
        format!("{}?{}", self.entity, self.query_string())
    }

    fn encode(&self, with_pagination: bool) -> String {
        let mut pairs: Vec<(String, String)> = Vec::new();

        if with_pagination {
            pairs.push(("page".into(), (u64::from(self.page) + 1).to_string()));
            pairs.push(("perPage".into(), self.page_size.to_string()));
        }

        if let Some(sort) = &self.sort {
            pairs.push(("sort".into(), sort.field.clone()));
            pairs.push(("order".into(), sort.direction.as_str().into()));
        }

        if !self.search.is_empty() {
            pairs.push(("search".into(), self.search.clone()));
        }

        for (name, predicate) in &self.filters {
            match &predicate.value {
                FilterValue::Ids(ids) => {
                    for id in ids {
                        pairs.push((format!("{name}[]"), id.to_string()));
                    }
                }
                FilterValue::Text(text) => {
                    pairs.push((name.clone(), text.clone()));
                }
                FilterValue::DateRange { start, end } => {
                    if let Some(start) = start {
                        pairs.push((format!("{name}[start]"), start.format(DATE_FORMAT).to_string()));
                    }
                    if let Some(end) = end {
                        pairs.push((format!("{name}[end]"), end.format(DATE_FORMAT).to_string()));
                    }
                }
            }
            if predicate.mode == FilterMode::Exclude {
                pairs.push((format!("{name}_mode"), "exclude".into()));
            }
        }

        form_encode(&pairs)
    }
}

/// Text values are keyed the way they are sent: trimmed.
fn normalized(predicate: &FilterPredicate) -> FilterPredicate {
    let mut predicate = predicate.clone();
    if let FilterValue::Text(text) = &mut predicate.value {
        *text = text.trim().to_string();
    }
    predicate
}

impl core::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.path())
    }
}

fn form_encode(pairs: &[(String, String)]) -> String {
    // Any absolute URL works as a carrier for the serializer.
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return String::new();
    };
    url.query_pairs_mut()
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    url.query().unwrap_or_default().to_string()
}
