//! Export of the current list as a file.

use crate::api::BackofficeApi;
use crate::error::ApiError;
use crate::query::QueryKey;

/// `<entity>-export?<query string>`. Pagination is left out; the export
/// covers every row matching sort, search and filters.
pub fn export_path(key: &QueryKey) -> String {
    let query = key.export_query_string();
    if query.is_empty() {
        format!("{}-export", key.entity())
    } else {
        format!("{}-export?{query}", key.entity())
    }
}

pub async fn download_export<A>(api: &A, key: &QueryKey) -> Result<Vec<u8>, ApiError>
where
    A: BackofficeApi + ?Sized,
{
    let path = export_path(key);
    tracing::info!(%path, "exporting list");
    api.export(&path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockApi};
    use crate::query::{FilterSet, FilterValue, QueryState, SortDirection};

    fn key() -> QueryKey {
        let filters = FilterSet::new().declare("status", FilterValue::ids([]));
        let mut state = QueryState::new(25, filters).unwrap();
        state.set_sort("name", SortDirection::Desc);
        let mut draft = state.filters().edit();
        draft.set("status", FilterValue::ids([3]));
        state.apply_filters(draft.commit());
        state.set_page(2);
        QueryKey::compose("accounts", &state)
    }

    #[test]
    fn export_path_drops_pagination() {
        assert_eq!(export_path(&key()), "accounts-export?sort=name&order=desc&status%5B%5D=3");
    }

    #[test]
    fn bare_export_has_no_question_mark() {
        let state = QueryState::new(10, FilterSet::new()).unwrap();
        assert_eq!(export_path(&QueryKey::compose("guides", &state)), "guides-export");
    }

    #[tokio::test]
    async fn download_requests_the_export_path() {
        let api = MockApi::new();
        api.set_export_bytes(b"csv".to_vec());
        let bytes = download_export(&api, &key()).await.unwrap();
        assert_eq!(bytes, b"csv");
        assert_eq!(
            api.calls(),
            vec![Call::Export("accounts-export?sort=name&order=desc&status%5B%5D=3".into())]
        );
    }
}
