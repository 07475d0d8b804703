//! Shared lookup data (statuses, users, tools...) and its realtime patcher.
//!
//! All blocks are fetched in one round trip from a descriptor map. A
//! `common-data` channel event names one block; only that block is fetched
//! again and swapped in, every other block keeps its `Arc`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use backoffice_events::{
    COMMON_DATA_CHANGED, COMMON_DATA_CHANNEL, CommonDataChanged, EventBus, RealtimeMessage, Subscription,
};

use crate::api::BackofficeApi;
use crate::error::ApiError;

/// Where one block comes from: a bare endpoint, or an endpoint with params.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockSource {
    Url(String),
    Request {
        url: String,
        #[serde(default)]
        params: Map<String, Value>,
    },
}

impl BlockSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

/// Block name to source, as posted to the `common-data` endpoint.
pub type Descriptors = BTreeMap<String, BlockSource>;

/// Immutable snapshot of every loaded block.
#[derive(Debug, Clone, Default)]
pub struct CommonData {
    blocks: BTreeMap<String, Arc<Value>>,
}

impl CommonData {
    pub fn get(&self, key: &str) -> Option<&Arc<Value>> {
        self.blocks.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.blocks.keys().map(String::as_str)
    }

    /// Copy with `key` replaced; the other blocks are shared, not cloned.
    pub fn merge(&self, key: impl Into<String>, value: Value) -> Self {
        let mut blocks = self.blocks.clone();
        blocks.insert(key.into(), Arc::new(value));
        Self { blocks }
    }
}

impl FromIterator<(String, Value)> for CommonData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            blocks: iter.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
        }
    }
}

#[derive(Debug)]
pub struct CommonDataCache {
    descriptors: Descriptors,
    data: Mutex<Arc<CommonData>>,
}

impl CommonDataCache {
    pub fn new(descriptors: Descriptors) -> Self {
        Self {
            descriptors,
            data: Mutex::new(Arc::new(CommonData::default())),
        }
    }

    pub fn descriptors(&self) -> &Descriptors {
        &self.descriptors
    }

    /// Current snapshot. Cheap; readers never block a refresh for long.
    pub fn snapshot(&self) -> Arc<CommonData> {
        Arc::clone(&self.data.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Fetch every described block.
    pub async fn load<A>(&self, api: &A) -> Result<(), ApiError>
    where
        A: BackofficeApi + ?Sized,
    {
        let blocks = api.common_data(&self.descriptors).await?;
        tracing::debug!(blocks = blocks.len(), "common data loaded");
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(blocks.into_iter().collect());
        Ok(())
    }

    /// Re-fetch one block and merge it in.
    ///
    /// Returns `Ok(false)` for keys without a descriptor, so the server can
    /// announce blocks this client does not know yet.
    pub async fn refresh_block<A>(&self, api: &A, key: &str) -> Result<bool, ApiError>
    where
        A: BackofficeApi + ?Sized,
    {
        let Some(source) = self.descriptors.get(key) else {
            tracing::debug!(key, "no descriptor for common data key");
            return Ok(false);
        };

        let single = Descriptors::from([(key.to_string(), source.clone())]);
        let mut fetched = api.common_data(&single).await?;
        let Some(value) = fetched.remove(key) else {
            tracing::warn!(key, "common data response did not contain the requested block");
            return Ok(false);
        };

        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        *data = Arc::new(data.merge(key, value));
        Ok(true)
    }
}

/// Keeps a [`CommonDataCache`] in step with `common-data` channel events.
///
/// Scoped to its owner: dropping the patcher unsubscribes from the channel.
#[derive(Debug)]
pub struct RealtimeCachePatcher {
    cache: Arc<CommonDataCache>,
    subscription: Subscription<RealtimeMessage>,
}

impl RealtimeCachePatcher {
    pub fn attach<B>(bus: &B, cache: Arc<CommonDataCache>) -> Self
    where
        B: EventBus<RealtimeMessage> + ?Sized,
    {
        Self {
            cache,
            subscription: bus.subscribe(COMMON_DATA_CHANNEL),
        }
    }

    pub fn cache(&self) -> &Arc<CommonDataCache> {
        &self.cache
    }

    /// Handle every event delivered so far. Returns how many blocks changed.
    ///
    /// Refresh failures are logged and skipped; the old block stays.
    pub async fn pump<A>(&mut self, api: &A) -> usize
    where
        A: BackofficeApi + ?Sized,
    {
        let keys: Vec<String> = self
            .subscription
            .drain()
            .into_iter()
            .filter(|message| message.is(COMMON_DATA_CHANGED))
            .filter_map(|message| match message.decode::<CommonDataChanged>() {
                Ok(changed) => Some(changed.key),
                Err(err) => {
                    tracing::debug!(error = %err, "ignoring malformed common data event");
                    None
                }
            })
            .collect();

        let mut refreshed = 0;
        for key in keys {
            match self.cache.refresh_block(api, &key).await {
                Ok(true) => refreshed += 1,
                Ok(false) => {}
                Err(err) => tracing::warn!(key = %key, error = %err, "common data refresh failed"),
            }
        }
        refreshed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Call, MockApi};
    use backoffice_events::InMemoryEventBus;
    use serde_json::json;

    fn descriptors() -> Descriptors {
        Descriptors::from([
            ("statuses".to_string(), BlockSource::url("statuses")),
            ("users".to_string(), BlockSource::url("users")),
        ])
    }

    async fn loaded(api: &MockApi) -> Arc<CommonDataCache> {
        api.set_block("statuses", json!(["open"]));
        api.set_block("users", json!(["ann"]));
        let cache = Arc::new(CommonDataCache::new(descriptors()));
        cache.load(api).await.unwrap();
        cache
    }

    #[test]
    fn block_source_accepts_bare_urls_and_requests() {
        let parsed: Descriptors =
            serde_json::from_value(json!({ "a": "statuses", "b": { "url": "users", "params": { "active": 1 } } }))
                .unwrap();
        assert_eq!(parsed["a"], BlockSource::url("statuses"));
        assert!(matches!(&parsed["b"], BlockSource::Request { params, .. } if params["active"] == 1));
    }

    #[tokio::test]
    async fn change_event_refreshes_only_that_block() {
        let api = MockApi::new();
        let cache = loaded(&api).await;
        let bus = InMemoryEventBus::new();
        let mut patcher = RealtimeCachePatcher::attach(&bus, Arc::clone(&cache));
        let before = cache.snapshot();

        api.set_block("statuses", json!(["open", "closed"]));
        bus.publish(COMMON_DATA_CHANNEL, CommonDataChanged::message("statuses"))
            .unwrap();
        assert_eq!(patcher.pump(&api).await, 1);

        let after = cache.snapshot();
        assert_eq!(**after.get("statuses").unwrap(), json!(["open", "closed"]));
        assert!(Arc::ptr_eq(before.get("users").unwrap(), after.get("users").unwrap()));
        assert_eq!(
            api.calls().last(),
            Some(&Call::CommonData(vec!["statuses".to_string()]))
        );
    }

    #[tokio::test]
    async fn unknown_key_is_a_silent_no_op() {
        let api = MockApi::new();
        let cache = loaded(&api).await;
        let calls = api.calls().len();
        assert!(!cache.refresh_block(&api, "tools").await.unwrap());
        assert_eq!(api.calls().len(), calls);
    }

    #[tokio::test]
    async fn other_events_on_the_channel_are_ignored() {
        let api = MockApi::new();
        let cache = loaded(&api).await;
        let bus = InMemoryEventBus::new();
        let mut patcher = RealtimeCachePatcher::attach(&bus, cache);

        bus.publish(COMMON_DATA_CHANNEL, RealtimeMessage::new("something.else", json!({ "key": "users" })))
            .unwrap();
        assert_eq!(patcher.pump(&api).await, 0);
    }

    #[test]
    fn dropping_the_patcher_unsubscribes() {
        let bus = InMemoryEventBus::<RealtimeMessage>::new();
        let patcher = RealtimeCachePatcher::attach(&bus, Arc::new(CommonDataCache::new(descriptors())));
        assert_eq!(bus.subscriber_count(COMMON_DATA_CHANNEL), 1);
        drop(patcher);
        assert_eq!(bus.subscriber_count(COMMON_DATA_CHANNEL), 0);
    }
}
