//! Engine binary for the Starhold world.
//!
//! Wires the in-memory world, the persistence sink, the session gateway,
//! and the tick scheduler together, then runs until Ctrl-C. Stopping
//! performs a final full save before the process exits.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `starhold-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Seed the starting world
//! 4. Select the persistence sink (`Dragonfly` or memory)
//! 5. Start the session gateway
//! 6. Build the tick scheduler and bridge its events to the gateway
//! 7. Run until Ctrl-C or the gateway exits
//! 8. Stop the scheduler (final save), then drain the bridge and gateway

mod error;
mod event_bridge;
mod seed;
mod sink;

use std::path::Path;
use std::sync::Arc;

use starhold_core::config::{LogFormat, LoggingConfig};
use starhold_core::memory::{InMemorySink, InMemoryWorld};
use starhold_core::{StarholdConfig, TickScheduler};
use starhold_db::WorldStore;
use starhold_gateway::{GatewayState, ServerConfig, start_server};
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::seed::SeedConfig;
use crate::sink::EngineSink;

/// Configuration file read from the working directory.
const CONFIG_PATH: &str = "starhold-config.yaml";

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step fails, if the gateway
/// fails, or if the final save on shutdown fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let config_path = Path::new(CONFIG_PATH);
    let config = load_config(config_path)?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("starhold-engine starting");
    info!(
        from_file = config_path.exists(),
        tick_interval_ms = config.scheduler.tick_interval_ms,
        save_interval_ticks = config.scheduler.save_interval_ticks,
        broadcast_interval_ticks = config.scheduler.broadcast_interval_ticks,
        performance_monitoring = config.scheduler.performance_monitoring,
        "Configuration loaded"
    );

    // 3. Seed the starting world.
    let seed_config = load_seed_config(config_path)?;
    let world = Arc::new(InMemoryWorld::new());
    let summary = seed::seed_world(&world, &seed_config, &mut rand::rng()).await?;

    // 4. Select the persistence sink.
    let sink = Arc::new(match &config.infrastructure.dragonfly_url {
        Some(url) => EngineSink::Dragonfly(WorldStore::connect(url).await?),
        None => EngineSink::Memory(InMemorySink::new()),
    });
    info!(sink = sink.label(), "Persistence sink ready");
    if let Some(store) = sink.store() {
        match store.last_save().await {
            Ok(Some(record)) => info!(
                tick = record.tick,
                saved_at = %record.saved_at,
                "Previous save found"
            ),
            Ok(None) => info!("No previous save recorded"),
            Err(e) => warn!(error = %e, "Failed to read previous save record"),
        }
    }

    // 5. Start the session gateway.
    let gateway = Arc::new(GatewayState::new());
    let server_config = ServerConfig {
        port: config.infrastructure.gateway_port,
        ..ServerConfig::default()
    };
    let server_shutdown = Arc::new(Notify::new());
    let mut server = {
        let state = Arc::clone(&gateway);
        let shutdown = Arc::clone(&server_shutdown);
        tokio::spawn(async move {
            start_server(&server_config, state, async move {
                shutdown.notified().await;
            })
            .await
        })
    };

    // 6. Build the tick scheduler and bridge its events.
    let scheduler = TickScheduler::new(
        config.scheduler,
        Arc::clone(&world),
        Arc::clone(&sink),
        Arc::clone(&gateway),
    )?;
    let bridge = tokio::spawn(event_bridge::run(
        scheduler.subscribe(),
        Arc::clone(&gateway),
        Arc::clone(&sink),
    ));

    // 7. Run until Ctrl-C or the gateway exits.
    scheduler.start().await;
    info!(
        players = ?summary.players,
        "Engine running, connect a session at /ws/{{player_id}}"
    );

    let early_exit = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            None
        }
        result = &mut server => Some(result),
    };

    // 8. Stop the scheduler, then drain the gateway and the bridge.
    if early_exit.is_some() {
        warn!("Gateway exited before shutdown was requested");
    } else {
        info!("Shutdown requested");
    }
    let stopped = scheduler.stop().await;
    drop(scheduler);
    if let Err(e) = bridge.await {
        warn!(error = %e, "Event bridge task failed");
    }

    let server_result = match early_exit {
        Some(result) => result,
        None => {
            server_shutdown.notify_one();
            server.await
        }
    };

    stopped?;
    server_result.map_err(|e| EngineError::Task {
        message: format!("gateway task failed: {e}"),
    })??;

    info!("starhold-engine stopped");
    Ok(())
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match config.format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Load engine configuration, falling back to defaults when the file is
/// missing.
fn load_config(path: &Path) -> Result<StarholdConfig, EngineError> {
    if path.exists() {
        Ok(StarholdConfig::from_file(path)?)
    } else {
        let mut config = StarholdConfig::default();
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}

/// Load seeding configuration from the `seed` section of the config file.
///
/// If the file does not exist or lacks the `seed` key, defaults are used.
fn load_seed_config(path: &Path) -> Result<SeedConfig, EngineError> {
    if !path.exists() {
        return Ok(SeedConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| EngineError::Seed {
        message: format!("failed to read config file: {e}"),
    })?;

    // Parse the full YAML and extract just the "seed" section.
    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Seed {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("seed").map_or_else(
        || Ok(SeedConfig::default()),
        |section| {
            serde_yml::from_value(section.clone()).map_err(|e| EngineError::Seed {
                message: format!("failed to parse seed config: {e}"),
            })
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE_CONFIG: &str = include_str!("../../../starhold-config.yaml");

    #[test]
    fn sample_config_parses() {
        let config = StarholdConfig::parse(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.scheduler.tick_interval_ms, 1000);
        assert_eq!(config.scheduler.save_interval_ticks, 60);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let path = Path::new("does-not-exist/starhold-config.yaml");
        assert_eq!(load_seed_config(path).unwrap(), SeedConfig::default());
        let config = load_config(path).unwrap();
        assert_eq!(config.scheduler, StarholdConfig::default().scheduler);
    }

    #[test]
    fn sample_seed_section_parses() {
        let raw: serde_yml::Value = serde_yml::from_str(SAMPLE_CONFIG).unwrap();
        let seed: SeedConfig = serde_yml::from_value(raw.get("seed").unwrap().clone()).unwrap();
        assert_eq!(seed, SeedConfig::default());
    }
}
