//! stat-mixer - tiered statistics and stat var hierarchy reader
//!
//! Opens a snapshot directory, runs one query and prints the JSON result.

use clap::Parser;
use serde::Serialize;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stat_mixer::{
    config::{Args, Command},
    node::Direction,
    MixerConfig, MixerService, Store,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("stat_mixer={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }
    let Some(data_dir) = args.data_dir.clone() else {
        anyhow::bail!("DATA_DIR is required");
    };

    let config = MixerConfig::from_env();
    let store = Store::from_data_dir(&data_dir, args.branch_enabled).await?;
    let service = MixerService::open(store, config).await?;
    info!(data_dir = %data_dir.display(), "Snapshot loaded");

    // The timeout belongs to the caller; the core never imposes one.
    let timeout = Duration::from_millis(args.request_timeout_ms);
    let output = match tokio::time::timeout(timeout, run(&service, args.command)).await {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("Request timed out after {} ms", args.request_timeout_ms),
    };
    println!("{}", output);
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

async fn run(service: &MixerService, command: Command) -> anyhow::Result<String> {
    match command {
        Command::Svg { places } => to_json(&service.get_stat_var_group(&places).await?),
        Command::SvgNode {
            svg,
            places,
            from_triples,
        } => to_json(
            &service
                .get_stat_var_group_node(&svg, &places, from_triples)
                .await?,
        ),
        Command::Path { id } => to_json(&service.get_stat_var_path(&id)?),
        Command::PlaceStatVars {
            places,
            union,
            filter,
        } => {
            if union {
                to_json(&service.get_place_stat_vars_union(&places, &filter).await?)
            } else {
                to_json(&service.get_place_stat_vars(&places).await?)
            }
        }
        Command::PlacePage {
            place,
            seed,
            stat_vars,
        } => to_json(
            &service
                .get_place_page_data(&place, seed, &stat_vars)
                .await?,
        ),
        Command::Summary { stat_vars } => to_json(&service.get_stat_var_summary(&stat_vars).await?),
        Command::Stats { stat_var, places } => {
            to_json(&service.get_stats(&places, &stat_var).await?)
        }
        Command::PropertyValues {
            property,
            direction,
            value_type,
            limit,
            dcids,
        } => {
            let direction: Direction = direction
                .parse()
                .unwrap_or_else(|never: Infallible| match never {});
            to_json(
                &service
                    .get_property_values(&dcids, &property, direction, &value_type, limit)
                    .await?,
            )
        }
    }
}
