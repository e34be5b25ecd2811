use std::path::PathBuf;

use anyhow::Context;
use itertools::Itertools;
use log::info;
use scraper::Html;

use crate::{
    api::fetch_document,
    config::Config,
    extractor,
    presenter::{top_entries, PieChart},
    schema::Record,
    store::{delete_database, EmissionsStore, Persistence, StoreError},
};

/// Writes `records` into a fresh emissions table and reads them back.
pub fn persist_and_reload(
    records: &[Record],
    persistence: &Persistence,
) -> Result<Vec<Record>, StoreError> {
    with_store(persistence, |store| {
        match persistence {
            Persistence::Keep(_) => store.reset_table()?,
            Persistence::Transient | Persistence::Scratch(_) => store.create_table()?,
        }
        store.insert_all(records)?;
        store.read_all()
    })
}

/// Opens the store described by `persistence`, runs `work` on it and closes it.
///
/// Under [`Persistence::Scratch`] the database file is removed afterwards,
/// even when `work` or one of the store operations failed.
fn with_store<T>(
    persistence: &Persistence,
    work: impl FnOnce(&mut EmissionsStore) -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    if let Persistence::Scratch(path) = persistence {
        delete_database(path)?;
    }
    let result = (|| -> Result<T, StoreError> {
        let mut store = EmissionsStore::open(persistence.location())?;
        store.connect()?;
        let value = work(&mut store)?;
        store.close()?;
        Ok(value)
    })();
    if let Persistence::Scratch(path) = persistence {
        let deleted = delete_database(path);
        return result.and_then(|value| deleted.map(|_| value));
    }
    result
}

/// Extracts the table from an already parsed page and draws the chart.
/// Returns the path of the written chart.
pub fn chart_document(html: &Html, config: &Config) -> anyhow::Result<PathBuf> {
    let records = extractor::parse(html, &config.table, config.dedup)
        .context("While extracting the emissions table")?;
    let records = persist_and_reload(&records, &config.persistence)
        .context("While storing the emissions table")?;
    let top = top_entries(&records, config.top);
    info!(
        "Top {}: {}",
        top.len(),
        top.iter()
            .map(|r| format!("{} ({}%)", r.country(), r.percentage()))
            .join(", ")
    );
    PieChart::new(&top, config.chart.clone())?.write(&config.output)?;
    Ok(config.output.clone())
}

/// Fetches the configured page and draws the chart.
pub async fn run(client: &reqwest::Client, config: &Config) -> anyhow::Result<PathBuf> {
    let html = fetch_document(client, config.url.clone()).await?;
    chart_document(&html, config)
}
