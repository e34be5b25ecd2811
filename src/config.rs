use std::path::PathBuf;

use anyhow::{bail, Context};
use co2_emissions_utils::fs_toml_util::read_toml;
use log::debug;
use serde::Deserialize;
use url::Url;

use crate::{
    api::EMISSIONS_URL,
    extractor::{DedupPolicy, TableLayout},
    presenter::ChartStyle,
    store::Persistence,
};

pub const DEFAULT_OUTPUT: &str = "co2_emissions.svg";
pub const DEFAULT_TOP: usize = 10;

/// Command-line options shared by every binary. Options left out fall back to
/// the `--config` file, then to the built-in defaults.
#[derive(Clone, Debug, Default, clap::Args)]
pub struct Settings {
    /// Page holding the emissions table [default: the Wikipedia list]
    #[arg(long)]
    pub url: Option<Url>,
    /// Where to write the SVG chart [default: co2_emissions.svg]
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Number of countries in the chart [default: 10]
    #[arg(long)]
    pub top: Option<usize>,
    /// Which row wins when a country appears twice [default: keep-last]
    #[arg(long, value_enum)]
    pub dedup: Option<DedupPolicy>,
    /// Keep the SQLite table in this file instead of in memory
    #[arg(long)]
    pub database: Option<PathBuf>,
    /// Do not delete the database file at the end of the run
    #[arg(long, overrides_with = "no_keep_database")]
    pub keep_database: bool,
    /// Delete the database file even if the config file says to keep it
    #[arg(long, overrides_with = "keep_database")]
    pub no_keep_database: bool,
    /// TOML file with the options above plus `[table]` and `[chart]` sections
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<Url>,
    pub output: Option<PathBuf>,
    pub top: Option<usize>,
    pub dedup: Option<DedupPolicy>,
    pub database: Option<PathBuf>,
    pub keep_database: Option<bool>,
    pub table: TableLayout,
    pub chart: ChartStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub url: Url,
    pub output: PathBuf,
    pub top: usize,
    pub dedup: DedupPolicy,
    pub persistence: Persistence,
    pub table: TableLayout,
    pub chart: ChartStyle,
}

impl Config {
    pub fn resolve(settings: &Settings) -> anyhow::Result<Self> {
        let file = match &settings.config {
            Some(path) => read_toml(path)?,
            None => FileConfig::default(),
        };
        let config = Self::merge(settings, file)?;
        debug!("Configuration: {config:?}");
        Ok(config)
    }

    fn merge(settings: &Settings, file: FileConfig) -> anyhow::Result<Self> {
        let url = match settings.url.clone().or(file.url) {
            Some(url) => url,
            None => Url::parse(EMISSIONS_URL).context("Invalid default URL")?,
        };
        let top = settings.top.or(file.top).unwrap_or(DEFAULT_TOP);
        if top == 0 {
            bail!("The chart needs at least one entry");
        }
        let keep = match (settings.keep_database, settings.no_keep_database) {
            (true, _) => true,
            (_, true) => false,
            (false, false) => file.keep_database.unwrap_or(false),
        };
        let persistence = match (settings.database.clone().or(file.database), keep) {
            (None, false) => Persistence::Transient,
            (None, true) => bail!("Keeping the database requires a database path"),
            (Some(path), false) => Persistence::Scratch(path),
            (Some(path), true) => Persistence::Keep(path),
        };
        Ok(Self {
            url,
            output: settings
                .output
                .clone()
                .or(file.output)
                .unwrap_or_else(|| DEFAULT_OUTPUT.into()),
            top,
            dedup: settings.dedup.or(file.dedup).unwrap_or_default(),
            persistence,
            table: file.table,
            chart: file.chart,
        })
    }
}
