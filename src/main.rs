mod cli;
mod config;
mod inventory;
mod models;
mod numbering;
mod render;
mod services;
mod transport;

use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;
use config::Config;
use inventory::Inventory;
use models::push_status;
use render::Renderer;
use services::provision::{DeviceReport, ProvisionService};
use transport::{CommitMode, ConfigTransport, PrintOnly, SshTransport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vpn_provision=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let args = Cli::parse();
    let cfg = Config::load();
    let request = args.service.request();

    let inventory = Inventory::load(&args.devices)?;
    tracing::info!(
        "Loaded {} devices from {}",
        inventory.devices.len(),
        args.devices.display()
    );

    let renderer = Renderer::new(&cfg.templates_dir, cfg.gateway_host_offset)?;
    let transport: Arc<dyn ConfigTransport> = if args.pprint_only {
        Arc::new(PrintOnly)
    } else {
        let mode = if args.commit {
            CommitMode::Commit
        } else {
            CommitMode::DryRun
        };
        tracing::info!("Pushing over SSH ({:?}, timeout {}s)", mode, cfg.ssh_timeout_secs);
        Arc::new(SshTransport::new(cfg.ssh_timeout_secs, mode))
    };

    let service = ProvisionService::new(&cfg, renderer, transport);

    let reports = tokio::select! {
        reports = service.run(&inventory, &request) => reports,
        _ = shutdown_signal() => {
            tracing::warn!("Interrupted; private candidate configurations are discarded on disconnect");
            anyhow::bail!("Interrupted");
        }
    };

    let failed = print_reports(&reports);
    if failed > 0 {
        anyhow::bail!("{} of {} devices failed", failed, reports.len());
    }
    Ok(())
}

/// Print each device's output to stdout and return the failure count
fn print_reports(reports: &[DeviceReport]) -> usize {
    let mut failed = 0;
    for report in reports {
        match &report.result {
            Ok(outcome) if outcome.status == push_status::PRINTED => {
                println!("{}", report.name);
                print!("{}", outcome.output);
            }
            Ok(outcome) => {
                println!(
                    "{} ({}) {}: {} in {}ms",
                    report.name,
                    report.hostname,
                    report.started_at.to_rfc3339(),
                    outcome.status,
                    report.elapsed_ms
                );
                println!("{}", outcome.output);
            }
            Err(e) => {
                failed += 1;
                println!("{} ({}): {}: {:#}", report.name, report.hostname, push_status::FAILED, e);
            }
        }
    }
    failed
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => { sig.recv().await; }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
