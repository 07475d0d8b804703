//! End-to-end list flows against the scripted API.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use proptest::prelude::*;
use serde_json::json;

use backoffice_auth::{Grant, PagePermissions, Permission, can};
use backoffice_client::common_data::{BlockSource, CommonDataCache, Descriptors, RealtimeCachePatcher};
use backoffice_client::import::{ImportBatch, ImportPreview, ImportStatus, ImportWizard, PollOutcome};
use backoffice_client::mock::{Call, MockApi};
use backoffice_client::query::{FilterSet, FilterValue};
use backoffice_client::{
    ApiError, ClientConfig, Drawer, FieldErrors, FormLayout, ListResponse, ListResult, ListScreen,
    MutationOutcome, Notifier, QueryCache, Row, SharedCache, submit_form,
};
use backoffice_core::UserId;
use backoffice_events::{COMMON_DATA_CHANNEL, CommonDataChanged, EventBus, InMemoryEventBus};

fn screen(cache: SharedCache<ListResult>) -> ListScreen {
    let filters = FilterSet::new().declare("status", FilterValue::ids([]));
    ListScreen::new("accounts", filters, cache, &ClientConfig::default()).unwrap()
}

#[tokio::test]
async fn scenario_a_total_drives_page_count() {
    let api = MockApi::new();
    api.on_list(|_| Ok(ListResponse::new((1..=10).map(Row::new).collect(), 45)));
    let mut screen = screen(QueryCache::new().shared());

    screen.refresh(&api, Instant::now()).await;

    assert_eq!(api.list_calls(), vec!["accounts?page=1&perPage=10".to_string()]);
    assert_eq!(screen.page_count(), 5);
}

#[tokio::test]
async fn scenario_b_search_is_debounced_into_one_request() {
    let api = MockApi::new();
    let mut screen = screen(QueryCache::new().shared());
    let start = Instant::now();
    screen.refresh(&api, start).await;
    api.clear_calls();

    screen.type_search("a", start);
    screen.type_search("acme", start + Duration::from_millis(100));
    let early = start + Duration::from_millis(300);
    if screen.tick(early) || screen.needs_refetch(early) {
        screen.refresh(&api, early).await;
    }
    assert!(api.list_calls().is_empty());

    let settled = start + Duration::from_millis(500);
    assert!(screen.tick(settled));
    screen.refresh(&api, settled).await;
    assert!(!screen.tick(settled + Duration::from_secs(1)));

    assert_eq!(
        api.list_calls(),
        vec!["accounts?page=1&perPage=10&search=acme".to_string()]
    );
}

#[tokio::test]
async fn scenario_c_validation_error_lands_on_its_tab() {
    let api = MockApi::new();
    api.push_write(Err(ApiError::Validation(
        FieldErrors::new().with("name", "Name is required"),
    )));
    let layout = FormLayout::new()
        .tab("settings", ["timezone", "locale"])
        .tab("profile", ["name", "email"]);
    let mut drawer = Drawer::default();
    drawer.open_create();
    let mut notifier = Notifier::new();

    let outcome = submit_form(
        &api,
        "accounts",
        &mut drawer,
        &layout,
        &QueryCache::new().shared(),
        &mut notifier,
    )
    .await;

    assert!(matches!(outcome, MutationOutcome::Invalid(_)));
    assert_eq!(layout.tab_names().nth(drawer.form().active_tab()), Some("profile"));
    assert_eq!(drawer.form().errors().first("name"), Some("Name is required"));
    assert!(drawer.is_open());
    assert_eq!(notifier.len(), 1);
}

#[tokio::test]
async fn scenario_d_finished_import_lists_failures() {
    let api = MockApi::new();
    api.set_import_preview(ImportPreview {
        headings: vec!["Name".into()],
        rows: vec![vec![json!("Ann")]],
        file: None,
    });
    api.set_import_batch(ImportBatch {
        id: "42".into(),
        name: "accounts-import".into(),
    });
    api.push_import_status(ImportStatus::new(100, 100, 3));

    let mut wizard = ImportWizard::new("accounts");
    wizard.upload(&api, "accounts.csv", b"Name\nAnn\n".to_vec()).await.unwrap();
    wizard.map_column("Name", Some("name")).unwrap();
    wizard.process(&api).await.unwrap();
    let outcome = wizard.poll_once(&api).await.unwrap();

    assert_eq!(outcome, PollOutcome::Complete { percent: 100.0, failed: 3 });
    assert_eq!(wizard.progress(), 100.0);
    assert!(api.calls().contains(&Call::ImportStatus {
        name: "accounts-import".into(),
        id: "42".into(),
    }));
    assert!(api.calls().contains(&Call::ImportExceptions {
        name: "accounts-import".into(),
    }));
}

#[tokio::test]
async fn scenario_e_mutation_refreshes_the_mounted_list() {
    let rows = Arc::new(Mutex::new(vec![Row::new(1).attr("name", "Old")]));
    let api = MockApi::new();
    let served = Arc::clone(&rows);
    api.on_list(move |_| {
        let rows = served.lock().unwrap().clone();
        let total = rows.len() as u64;
        Ok(ListResponse::new(rows, total))
    });

    let cache = QueryCache::new().shared();
    let mut screen = screen(Arc::clone(&cache));
    let now = Instant::now();
    screen.refresh(&api, now).await;
    assert!(!screen.needs_refetch(now));

    let mut drawer = Drawer::default();
    drawer.open_edit(&screen.rows()[0]);
    drawer.form_mut().set("name", "New");
    *rows.lock().unwrap() = vec![Row::new(1).attr("name", "New")];
    let outcome = submit_form(&api, "accounts", &mut drawer, &FormLayout::new(), &cache, &mut Notifier::new()).await;
    assert!(outcome.is_saved());

    assert!(screen.needs_refetch(now));
    screen.refresh(&api, now).await;
    assert_eq!(screen.rows()[0].get("name"), Some(&json!("New")));
    assert_eq!(api.list_calls().len(), 2);
}

#[tokio::test]
async fn realtime_change_patches_one_common_data_block() {
    let api = MockApi::new();
    api.set_block("statuses", json!(["open"]));
    api.set_block("tools", json!(["saw"]));
    let descriptors = Descriptors::from([
        ("statuses".to_string(), BlockSource::url("statuses")),
        ("tools".to_string(), BlockSource::url("tools")),
    ]);
    let cache = Arc::new(CommonDataCache::new(descriptors));
    cache.load(&api).await.unwrap();
    let bus = InMemoryEventBus::new();
    let mut patcher = RealtimeCachePatcher::attach(&bus, Arc::clone(&cache));
    let before = cache.snapshot();

    api.set_block("tools", json!(["saw", "drill"]));
    bus.publish(COMMON_DATA_CHANNEL, CommonDataChanged::message("tools"))
        .unwrap();
    bus.publish(COMMON_DATA_CHANNEL, CommonDataChanged::message("brand-new-block"))
        .unwrap();
    assert_eq!(patcher.pump(&api).await, 1);

    let after = cache.snapshot();
    assert!(Arc::ptr_eq(before.get("statuses").unwrap(), after.get("statuses").unwrap()));
    assert_eq!(**after.get("tools").unwrap(), json!(["saw", "drill"]));

    drop(patcher);
    assert_eq!(bus.subscriber_count(COMMON_DATA_CHANNEL), 0);
}

proptest! {
    #[test]
    fn admins_pass_every_gate(
        viewer in any::<i64>(),
        owner in proptest::option::of(any::<i64>()),
        name in "[a-z]{1,8}",
    ) {
        let permission = Permission::new(name);
        prop_assert!(can(
            &PagePermissions::new(),
            &permission,
            UserId::new(viewer),
            owner.map(UserId::new),
            true,
        ));
    }

    #[test]
    fn ownership_alone_never_grants(viewer in any::<i64>(), name in "[a-z]{1,8}") {
        let permission = Permission::new(name);
        let perms = PagePermissions::new().with(Permission::new("other-action"), Grant::All);
        prop_assert!(!can(&perms, &permission, UserId::new(viewer), Some(UserId::new(viewer)), false));
    }
}
