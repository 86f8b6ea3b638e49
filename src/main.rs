//! Binary entry point for the `vmgate` service.

use std::io::{self, Write};
use std::process;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vmgate::{AzureComputeBackend, AzureConfig, Credential, CredentialKind, server};

mod cli;

use cli::{Cli, ServeCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to bind {address}: {message}")]
    Bind { address: String, message: String },
    #[error("server error: {0}")]
    Serve(String),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Serve(command) => serve(command).await,
    }
}

async fn serve(args: ServeCommand) -> Result<(), CliError> {
    let config =
        AzureConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "VM identity is incomplete; remote calls will fail");
    }

    let kind = CredentialKind::from_env();
    let credential = Arc::new(Credential::select(kind, config.client_id.clone()));
    let backend = Arc::new(AzureComputeBackend::new(&config, credential));
    tracing::info!(
        credential = %kind,
        vm = %backend.identity(),
        endpoint = %config.management_endpoint,
        "controlling virtual machine"
    );

    let app = server::router(backend);
    let address = args.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|err| CliError::Bind {
            address: address.clone(),
            message: err.to_string(),
        })?;
    tracing::info!(%address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| CliError::Serve(err.to_string()))?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
