use std::time::Instant;

use anyhow::{Context, bail};

use backoffice_client::query::FilterSet;
use backoffice_client::{ClientConfig, HttpApi, ListScreen, QueryCache};

/// `backoffice <entity> [search...]`: print the first page as JSON lines.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    backoffice_observability::init();

    let mut args = std::env::args().skip(1);
    let Some(entity) = args.next() else {
        bail!("usage: backoffice <entity> [search]");
    };
    let search = args.collect::<Vec<_>>().join(" ");

    let config = ClientConfig::from_env().context("invalid configuration")?;
    tracing::info!(api = %config.api_url, %entity, "fetching list");

    let api = HttpApi::from_config(&config);
    let mut screen = ListScreen::new(&entity, FilterSet::new(), QueryCache::new().shared(), &config)?;

    if !search.is_empty() {
        let typed_at = Instant::now();
        screen.type_search(search, typed_at);
        screen.tick(typed_at + config.search_debounce);
    }

    screen.refresh(&api, Instant::now()).await;
    if let Some(err) = screen.error() {
        bail!("fetching {entity} failed: {err}");
    }

    for row in screen.rows() {
        println!("{}", serde_json::to_string(row)?);
    }
    println!("pages: {}", screen.page_count());
    Ok(())
}
