use std::process::ExitCode;

use log::{debug, error, info};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use config::DockhookConfig;
use message::Formatter;
use pipeline::Aggregator;
use pipeline::aggregator::FlushReport;
use webhook::Webhook;

mod cli;
mod config;
mod docker;
mod message;
mod pipeline;
mod signals;
mod webhook;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!(
        "Starting {} {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let args = cli::get_cli_args();
    let config = match DockhookConfig::try_init(&args.config).and_then(|c| c.resolve(args)) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let node_name = config.node_name();
    info!(
        "Config: node={:?} flush_interval={:?} cache_capacity={} timeout={:?} listen={:?} show_running={}",
        node_name,
        config.flush_interval(),
        config.cache_capacity,
        config.webhook_timeout(),
        config.docker.listen.event_types(),
        config.docker.show_running,
    );

    let formatter = match Formatter::new(node_name, config.cache_capacity) {
        Ok(formatter) => formatter,
        Err(e) => {
            error!("Unable to create formatter: {e}");
            return ExitCode::FAILURE;
        }
    };

    let webhook = match Webhook::new(config.endpoint(), config.webhook_timeout()) {
        Ok(webhook) => webhook,
        Err(e) => {
            error!("Unable to create webhook client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let docker = match docker::client::connect() {
        Ok(docker) => docker,
        Err(e) => {
            error!("Unable to connect to Docker: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    if let Err(e) = signals::handle_shutdown(cancel.clone()) {
        error!("Unable to register signal handlers: {e}");
        return ExitCode::FAILURE;
    }

    let (aggregator, queue) =
        Aggregator::new(formatter, webhook, config.flush_interval(), cancel.clone());
    let (reports_tx, reports) = mpsc::unbounded_channel();
    let aggregator = tokio::spawn(aggregator.with_flush_listener(reports_tx).run());
    tokio::spawn(report_flushes(reports));

    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]);

    let result = docker::watch(&docker, &queue, &config.docker, &cancel).await;

    // Whatever ended the watcher, let the aggregator drain before exiting
    cancel.cancel();
    drop(queue);
    if let Err(e) = aggregator.await {
        error!("Aggregator task failed: {e}");
    }

    match result {
        Ok(()) => {
            info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Docker event watcher failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Publishes the outcome of the latest flush as the systemd status line.
async fn report_flushes(mut reports: mpsc::UnboundedReceiver<FlushReport>) {
    while let Some(report) = reports.recv().await {
        let outcome = match report.delivered {
            Some(true) => "delivered",
            Some(false) => "delivery failed",
            None => "nothing to send",
        };
        let status = format!(
            "Last flush: {} events in {} groups, {outcome}",
            report.events, report.groups
        );
        debug!("{status}");
        let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Status(&status)]);
    }
}
