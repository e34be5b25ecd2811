use clap::Parser;
use co2_emissions::{api::reqwest_client, config::Config, config::Settings, pipeline};
use log::info;

/// Charts the countries with the largest share of world fossil CO2 emissions.
#[derive(Parser)]
#[command(version)]
struct Opts {
    #[command(flatten)]
    settings: Settings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts = Opts::parse();
    let config = Config::resolve(&opts.settings)?;
    let client = reqwest_client()?;
    let output = pipeline::run(&client, &config).await?;
    info!("Successfully saved the chart to {output:?}.");
    Ok(())
}
