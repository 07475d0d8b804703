//! Writes followed by cache invalidation.
//!
//! Every successful write marks the whole entity stale in the list cache,
//! so the next read of any page, sort or filter combination refetches.
//! Failures never escape as errors: they become toasts and, for 422s,
//! field-level messages on the open form.

use serde_json::Value;

use backoffice_core::RowId;

use crate::api::BackofficeApi;
use crate::cache::{SharedCache, lock};
use crate::error::{ApiError, FieldErrors};
use crate::forms::{DeleteState, Drawer, FormLayout, FormMode};
use crate::notify::Notifier;
use crate::types::ListResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { entity: String, body: Value },
    Update { entity: String, id: RowId, body: Value },
    /// One id deletes a single record; more go out as a batch.
    Delete { entity: String, ids: Vec<RowId> },
}

impl Mutation {
    pub fn entity(&self) -> &str {
        match self {
            Self::Create { entity, .. } | Self::Update { entity, .. } | Self::Delete { entity, .. } => entity,
        }
    }

    /// What saving `drawer` amounts to.
    pub fn from_drawer(entity: &str, drawer: &Drawer) -> Self {
        let body = drawer.form().body();
        match drawer.mode() {
            FormMode::Edit(id) => Self::Update {
                entity: entity.to_string(),
                id,
                body,
            },
            FormMode::Create | FormMode::Duplicate(_) => Self::Create {
                entity: entity.to_string(),
                body,
            },
        }
    }

    /// Send the write; on success invalidate every cached page of the entity.
    pub async fn run<A>(&self, api: &A, cache: &SharedCache<ListResult>) -> Result<(), ApiError>
    where
        A: BackofficeApi + ?Sized,
    {
        match self {
            Self::Create { entity, body } => api.create(entity, body).await.map(drop)?,
            Self::Update { entity, id, body } => api.update(entity, *id, body).await.map(drop)?,
            Self::Delete { entity, ids } => api.delete(entity, ids).await?,
        }

        let stale = lock(cache).invalidate_entity(self.entity());
        tracing::debug!(entity = self.entity(), stale, "invalidated cached pages");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Saved,
    Invalid(FieldErrors),
    Failed(ApiError),
}

impl MutationOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Save the drawer's form.
///
/// Success closes the drawer. A validation failure keeps it open with the
/// errors on their fields and the first offending tab active; any other
/// failure keeps it open untouched.
pub async fn submit_form<A>(
    api: &A,
    entity: &str,
    drawer: &mut Drawer,
    layout: &FormLayout,
    cache: &SharedCache<ListResult>,
    notifier: &mut Notifier,
) -> MutationOutcome
where
    A: BackofficeApi + ?Sized,
{
    let mutation = Mutation::from_drawer(entity, drawer);
    match mutation.run(api, cache).await {
        Ok(()) => {
            drawer.close();
            notifier.success("Saved successfully.");
            MutationOutcome::Saved
        }
        Err(ApiError::Validation(errors)) => {
            notifier.error(ApiError::Validation(FieldErrors::new()).user_message());
            drawer.form_mut().apply_errors(errors.clone(), layout);
            MutationOutcome::Invalid(errors)
        }
        Err(err) => {
            tracing::warn!(entity, error = %err, "save failed");
            notifier.error(err.user_message());
            MutationOutcome::Failed(err)
        }
    }
}

/// Run a confirmed delete. `None` when nothing was awaiting confirmation.
pub async fn confirm_delete<A>(
    api: &A,
    entity: &str,
    delete: &mut DeleteState,
    cache: &SharedCache<ListResult>,
    notifier: &mut Notifier,
) -> Option<MutationOutcome>
where
    A: BackofficeApi + ?Sized,
{
    let ids = delete.confirm()?;
    let count = ids.len();
    let mutation = Mutation::Delete {
        entity: entity.to_string(),
        ids,
    };

    let outcome = match mutation.run(api, cache).await {
        Ok(()) if count == 1 => {
            notifier.success("Record deleted.");
            MutationOutcome::Saved
        }
        Ok(()) => {
            notifier.success(format!("{count} records deleted."));
            MutationOutcome::Saved
        }
        Err(err) => {
            tracing::warn!(entity, error = %err, "delete failed");
            notifier.error(err.user_message());
            MutationOutcome::Failed(err)
        }
    };
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Instant;

    use super::*;
    use crate::cache::QueryCache;
    use crate::mock::{Call, MockApi};
    use crate::notify::Level;
    use crate::query::{FilterSet, QueryKey, QueryState};
    use crate::types::{ListResponse, Row};
    use serde_json::json;

    fn seeded_cache() -> (SharedCache<ListResult>, QueryKey, QueryKey) {
        let cache = QueryCache::new().shared();
        let state = QueryState::new(10, FilterSet::new()).unwrap();
        let accounts = QueryKey::compose("accounts", &state);
        let guides = QueryKey::compose("guides", &state);
        let value = Arc::new(ListResult::from(ListResponse::new(vec![Row::new(1)], 1)));
        let now = Instant::now();
        lock(&cache).insert(accounts.clone(), Arc::clone(&value), now);
        lock(&cache).insert(guides.clone(), value, now);
        (cache, accounts, guides)
    }

    fn layout() -> FormLayout {
        FormLayout::new().tab("General", ["name"]).tab("Billing", ["iban"])
    }

    #[tokio::test]
    async fn saved_edit_invalidates_only_that_entity() {
        let api = MockApi::new();
        let (cache, accounts, guides) = seeded_cache();
        let mut drawer = Drawer::default();
        drawer.open_edit(&Row::new(1).attr("name", "Old"));
        drawer.form_mut().set("name", "New");
        let mut notifier = Notifier::new();

        let outcome = submit_form(&api, "accounts", &mut drawer, &layout(), &cache, &mut notifier).await;

        assert!(outcome.is_saved());
        assert!(!drawer.is_open());
        assert_eq!(notifier.latest().map(|n| n.level), Some(Level::Success));
        let now = Instant::now();
        assert!(!lock(&cache).is_fresh(&accounts, now));
        assert!(lock(&cache).is_fresh(&guides, now));
        assert_eq!(
            api.calls(),
            vec![Call::Update {
                entity: "accounts".into(),
                id: RowId::new(1),
                body: json!({ "name": "New" }),
            }]
        );
    }

    #[tokio::test]
    async fn duplicate_saves_as_create() {
        let api = MockApi::new();
        let (cache, ..) = seeded_cache();
        let mut drawer = Drawer::default();
        drawer.open_duplicate(&Row::new(1).attr("name", "Acme"));

        submit_form(&api, "accounts", &mut drawer, &layout(), &cache, &mut Notifier::new()).await;

        assert!(matches!(&api.calls()[0], Call::Create { body, .. } if body["name"] == "Acme"));
    }

    #[tokio::test]
    async fn validation_failure_keeps_drawer_open_on_the_right_tab() {
        let api = MockApi::new();
        api.push_write(Err(ApiError::Validation(
            FieldErrors::new().with("iban", "Invalid IBAN"),
        )));
        let (cache, accounts, _) = seeded_cache();
        let mut drawer = Drawer::default();
        drawer.open_create();
        let mut notifier = Notifier::new();

        let outcome = submit_form(&api, "accounts", &mut drawer, &layout(), &cache, &mut notifier).await;

        assert!(matches!(outcome, MutationOutcome::Invalid(_)));
        assert!(drawer.is_open());
        assert_eq!(drawer.form().active_tab(), 1);
        assert_eq!(drawer.form().errors().first("iban"), Some("Invalid IBAN"));
        assert_eq!(notifier.latest().map(|n| n.level), Some(Level::Error));
        assert!(lock(&cache).is_fresh(&accounts, Instant::now()));
    }

    #[tokio::test]
    async fn server_error_is_a_toast_only() {
        let api = MockApi::new();
        api.push_write(Err(ApiError::Api(500, "boom".into())));
        let (cache, ..) = seeded_cache();
        let mut drawer = Drawer::default();
        drawer.open_create();
        drawer.form_mut().set("name", "Acme");
        let mut notifier = Notifier::new();

        let outcome = submit_form(&api, "accounts", &mut drawer, &layout(), &cache, &mut notifier).await;

        assert!(matches!(outcome, MutationOutcome::Failed(ApiError::Api(500, _))));
        assert!(drawer.is_open());
        assert!(drawer.form().errors().is_empty());
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn batch_delete_goes_out_once() {
        let api = MockApi::new();
        let (cache, accounts, _) = seeded_cache();
        let mut delete = DeleteState::default();
        delete.request([RowId::new(4), RowId::new(2)]);
        let mut notifier = Notifier::new();

        let outcome = confirm_delete(&api, "accounts", &mut delete, &cache, &mut notifier).await;

        assert_eq!(outcome, Some(MutationOutcome::Saved));
        assert_eq!(
            api.calls(),
            vec![Call::Delete {
                entity: "accounts".into(),
                ids: vec![RowId::new(2), RowId::new(4)],
            }]
        );
        assert!(!lock(&cache).is_fresh(&accounts, Instant::now()));
        assert_eq!(
            confirm_delete(&api, "accounts", &mut delete, &cache, &mut notifier).await,
            None
        );
    }
}
