use crate::{
    cli::{self, args::Cli},
    config::{ConfigLoader, GlobalConfig},
    core::events::EventSink,
    discovery::DiscoveryOrchestrator,
    executors::{ProbeExecutor, ReqwestTransport, tls::ClientIdentity},
    storage::FileStore,
    ui::{printer, ProgressReporter},
    utils::logging,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Command-line values take precedence over the configuration file.
fn apply_overrides(config: &mut GlobalConfig, cli: &Cli) {
    if let Some(ms) = cli.connect_timeout_ms {
        config.network.connect_timeout_ms = ms;
    }
    if let Some(ms) = cli.read_timeout_ms {
        config.network.read_timeout_ms = ms;
    }
    if let Some(home) = &cli.home {
        config.store.home = Some(home.clone());
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let level = logging::level_from_cli(&cli);
    logging::init(level)?;

    let mut config = ConfigLoader::load_with_custom_path(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    ConfigLoader::validate_config(&config)?;

    let host = cli::parse_host(&cli.target, &config.discovery.default_domain)?;
    tracing::info!("Starting podprobe for target: {}", host.fqdn());

    let identity = match (&cli.cert, &cli.key) {
        (Some(cert), Some(key)) => {
            let identity = ClientIdentity::load(cert, key)
                .with_context(|| format!("Failed to load client certificate {:?}", cert))?;
            tracing::info!("Loaded {} client certificate(s) from {:?}", identity.certificate_count(), cert);
            Some(identity)
        }
        _ => None,
    };

    let transport = Arc::new(ReqwestTransport::new(&config.network, identity)?);
    let store = Arc::new(FileStore::from_config(&config.store)?);
    tracing::info!("Saving pods under {:?}", store.home());

    let (events, rx) = EventSink::channel();
    let ui = ProgressReporter::new(cli.simple).spawn(rx);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, stopping after the current probe");
                cancel.cancel();
            }
        })
    };

    let executor = ProbeExecutor::new(transport, events.clone());
    let mut orchestrator = DiscoveryOrchestrator::new(host.clone(), config.discovery.clone(), executor, store, events)
        .with_cancellation(cancel)
        .overwrite(cli.overwrite);
    if let Some(cert) = &cli.cert {
        orchestrator = orchestrator.with_client_cert(cert.display().to_string());
    }

    let result = orchestrator.run().await;
    ctrl_c.abort();

    match result {
        Ok(outcome) => {
            // dropping the orchestrator closes the event stream
            let report = orchestrator.into_report(outcome);
            ui.await.context("Progress display failed")?;
            printer::print_report(&host.fqdn(), &report);
            Ok(())
        }
        Err(err) => {
            if err.is_program_fault() {
                tracing::error!("Discovery aborted by an internal error: {}", err);
            }
            let objectives = orchestrator.objectives();
            drop(orchestrator);
            let _ = ui.await;
            printer::print_objectives(&objectives);
            Err(err.into())
        }
    }
}
