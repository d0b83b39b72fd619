//! Temperature telemetry pipeline.
//!
//! A simulated thermometer writes text frames to a [`channel`]; the
//! [`logger`] polls the other end, stores each reading in the [`db`] and
//! keeps hourly/daily averages; the [`api`] serves the stored history over
//! HTTP. [`run`] wires the three together from a [`Config`].

pub mod api;
pub mod channel;
pub mod config;
pub mod db;
pub mod logger;
pub mod simulator;
mod utils;

pub use config::Config;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use api::ApiServer;
use channel::{Ports, VirtualBus};
use db::Database;
use simulator::Simulator;

/// Runs the simulator, the logger and the API until `cancel_token` fires or
/// the logger stops, then shuts everything down.
pub async fn run(config: Config, cancel_token: CancellationToken) -> Result<()> {
    let database = Database::new(config.store.path.clone())?;

    let ports = Ports::new(VirtualBus::new(), config.channel.read_timeout());
    let ports_are_virtual = [&config.channel.simulator_port, &config.channel.logger_port]
        .iter()
        .all(|name| !name.contains("://"));
    if ports_are_virtual {
        ports
            .bus()
            .link(&config.channel.simulator_port, &config.channel.logger_port)
            .context("failed to link virtual ports")?;
    }

    let api = ApiServer::spawn(&config.api, database.clone(), cancel_token.clone())?;
    info!("Query API listening on {}", api.local_addr());

    let logger_task = tokio::spawn(logger::run_logger(
        ports.clone(),
        config.channel.clone(),
        config.logger.clone(),
        database.clone(),
        cancel_token.clone(),
    ));

    let simulator_task = if config.simulator.enabled {
        let simulator = Simulator::from_config(&config.channel, &config.simulator)?;
        Some(tokio::spawn(simulator.run(ports.clone(), cancel_token.clone())))
    } else {
        None
    };

    let logger_result = logger_task.await.context("logger task panicked")?;
    if let Err(err) = &logger_result {
        error!("Logger stopped: {err:#}");
    }
    cancel_token.cancel();

    if let Some(task) = simulator_task {
        match task.await.context("simulator task panicked")? {
            Ok(sent) => info!("Simulator stopped after {sent} frames"),
            Err(err) => warn!("Simulator stopped: {err:#}"),
        }
    }

    tokio::task::spawn_blocking(move || api.join())
        .await
        .context("API join worker failed")??;

    let stored = database.count_readings().await?;
    info!(
        "Shutdown complete; {stored} readings stored in {}",
        database.path().display()
    );

    logger_result
}
