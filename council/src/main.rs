use std::{io::Read, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use engine::{CouncilEngine, RunOutcome};
use event_bus::EventBus;
use fail_list::FailListManager;
use provider::GatewayClient;
use registry::Registry;
use store::{InMemoryStore, SessionStore};
use telemetry::TelemetryGuard;

use args::Args;

mod args;
mod logger;

/// Probe timeout for the fail-list manager's health checks; the reference
/// config carries a probe interval but leaves the per-probe timeout to the
/// caller, mirroring the `response_timeout_s` vs. request-timeout split in
/// `GatewayConfig`.
const FAIL_LIST_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = config::Config::load(&args.config).with_context(|| format!("loading config from {:?}", args.config))?;
    config.validate().context("validating config")?;

    let _telemetry_guard = init_otel(&config, args.log_filter.clone()).await;

    let result = run(&args, &config).await;

    fastrace::flush();

    result
}

async fn run(args: &Args, config: &config::Config) -> anyhow::Result<()> {
    let provider: Arc<dyn provider::Provider> = Arc::new(GatewayClient::new(&config.gateway));

    let registry = Arc::new(Registry::new(provider.clone(), config.gateway.refresh_interval));
    registry.refresh().await.context("fetching the unified model registry")?;

    let fail_list = Arc::new(FailListManager::new(
        provider.clone(),
        config.fail_list.probe_concurrency,
        FAIL_LIST_PROBE_TIMEOUT,
    ));

    let store: Arc<dyn SessionStore> = Arc::new(
        InMemoryStore::new(config.store.persistence_dir.clone())
            .await
            .context("initializing the session state store")?,
    );

    let bus = Arc::new(EventBus::new(config.event_bus.retention_per_session));

    let council = CouncilEngine::new(
        provider,
        registry,
        fail_list,
        store,
        bus.clone(),
        config.boards.clone(),
        config.engine.clone(),
    );

    let message = match &args.message {
        Some(message) => message.clone(),
        None => read_stdin().context("reading user message from stdin")?,
    };

    let outcome = council.submit_message(None, &args.board, message).await;

    if let Ok((conversation_id, _)) = &outcome {
        print_events(&bus, *conversation_id).await;
    }

    match outcome {
        Ok((_, RunOutcome::Complete)) => {
            log::info!("deliberation complete");
            Ok(())
        }
        Ok((_, RunOutcome::AwaitingHuman)) => {
            log::info!("deliberation paused, awaiting human feedback at the configured breakpoint");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn print_events(bus: &EventBus, conversation_id: uuid::Uuid) {
    for event in bus.events_since(conversation_id, 0).await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => log::warn!("failed to serialize event {}: {err}", event.seq),
        }
    }
}

fn read_stdin() -> anyhow::Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer.trim().to_string())
}

async fn init_otel(config: &config::Config, log_filter: String) -> Option<TelemetryGuard> {
    match telemetry::init(&config.telemetry).await {
        Ok(guard) => {
            let otel_appender = guard.logs_appender().cloned();
            logger::init(&log_filter, otel_appender);
            Some(guard)
        }
        Err(err) => {
            eprintln!("failed to initialize telemetry: {err}");
            logger::init(&log_filter, None);
            None
        }
    }
}
