pub mod types;
pub mod config;
pub mod data;
pub mod scale;
pub mod projection;
pub mod zoom;
pub mod icon_chart;
pub mod choropleth;
pub mod render;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the icon chart and the choropleth page
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the generated page
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

async fn icon_chart_pipeline(config: &config::AppConfig) -> Option<icon_chart::IconChart> {
    let people = data::load_people(&config.input.people, &config.input.columns).await;
    info!(records = people.len(), "Loaded people");
    icon_chart::render_icon_chart(&people, &config.icon_chart)
}

async fn map_pipeline(config: &config::AppConfig) -> anyhow::Result<Option<choropleth::ChoroplethMap>> {
    let (boundaries, counts) = tokio::join!(
        data::load_boundaries(config),
        data::load_death_counts(&config.input.deaths_csv, &config.input.columns),
    );

    let countries = match boundaries {
        Ok(countries) => countries,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Error loading map data");
            return Ok(None);
        }
    };

    Ok(choropleth::render_choropleth(&countries, &counts, &config.map)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!(config = ?config, "Generating page");
            let app_config = config::AppConfig::load_from_file(config)?;

            // The two pipelines share nothing and run side by side
            let (chart, map) = tokio::join!(icon_chart_pipeline(&app_config), map_pipeline(&app_config));
            let map = map?;

            render::write_outputs(&app_config.output, &app_config.map.title, chart.as_ref(), map.as_ref())?;

            info!(
                icons = chart.as_ref().map_or(0, |c| c.tooltips.len()),
                countries_matched = map.as_ref().map_or(0, |m| m.matched),
                dir = ?app_config.output.dir,
                "Generation complete"
            );
        }
        Commands::Serve { config } => {
            info!(config = ?config, "Serving page");
            let app_config = config::AppConfig::load_from_file(config)?;
            server::start_server(app_config).await?;
        }
    }

    Ok(())
}
