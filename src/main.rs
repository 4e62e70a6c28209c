use log::{error, info, warn};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::time::sleep;

use airthings_datasource::api::http::HttpRemote;
use airthings_datasource::config::DatasourceConfig;
use airthings_datasource::models::{ConnectionStatus, Status};
use airthings_datasource::utils::{format_datetime, format_timestamp_ms, last_value, trailing_range};
use airthings_datasource::{AirthingsApi, Datasource, Query, QueryRequest, QueryType};

async fn main_loop(config: DatasourceConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Airthings datasource service");

    let remote = HttpRemote::new(
        config.api_url.clone(),
        config.access_token.clone(),
        config.http_timeout,
    )?;
    let datasource =
        Datasource::new(AirthingsApi::new(Arc::new(remote))).with_page_size(config.per_page);

    let ConnectionStatus { status, message } = datasource.test_connection().await;
    match status {
        Status::Success => info!("{}", message),
        Status::Error => warn!("{}", message),
    }

    let targets: Vec<Query> = config
        .devices
        .iter()
        .map(|(id, name)| Query {
            query_type: Some(QueryType::Devices),
            resource_id: Some(id.clone()),
            resource_name: name.clone(),
            sensor_type: Some(config.sensor),
            resolution: config.resolution,
        })
        .collect();

    loop {
        let now = OffsetDateTime::now_utc();
        let request = QueryRequest {
            range: trailing_range(now, config.window),
            targets: targets.clone(),
        };

        info!(
            "Querying {} devices for the window ending {}",
            request.targets.len(),
            format_datetime(&now)
        );

        match datasource.query(&request).await {
            Ok(series) => {
                if series.is_empty() {
                    warn!("No series returned for this window!");
                }

                // Print summary
                for s in &series {
                    let filled = s.datapoints.iter().filter(|p| p.value.is_some()).count();
                    info!("Summary for {}:", s.target);
                    info!("  Points: {} ({} with values)", s.datapoints.len(), filled);
                    if let Some(point) = last_value(s) {
                        info!(
                            "  Latest value: {:.2} at {}",
                            point.value.unwrap_or_default(),
                            format_timestamp_ms(point.timestamp_ms)
                        );
                    }
                }
            }
            Err(e) => error!("Query failed: {}", e),
        }

        info!(
            "Waiting {} seconds until next poll",
            config.poll_interval.as_secs()
        );
        sleep(config.poll_interval).await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match DatasourceConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Run main loop until Ctrl+C
    tokio::select! {
        result = main_loop(config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => error!("Fatal error: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
