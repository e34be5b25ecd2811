use std::path::PathBuf;

use clap::Parser;
use co2_emissions::{
    config::{Config, Settings},
    pipeline::chart_document,
};
use fs_err::read_to_string;
use log::info;
use scraper::Html;

/// Same as the main binary, but reads a saved copy of the page instead of fetching it.
#[derive(Parser)]
struct Opts {
    input_file: PathBuf,
    #[command(flatten)]
    settings: Settings,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let config = Config::resolve(&opts.settings)?;
    let html = Html::parse_document(&read_to_string(&opts.input_file)?);
    let output = chart_document(&html, &config)?;
    info!("Successfully saved the chart to {output:?}.");
    Ok(())
}
