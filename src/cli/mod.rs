//! Command-line interface definitions for the `vmgate` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Default port for the HTTP listener.
pub(crate) const DEFAULT_PORT: u16 = 3000;

/// Top-level CLI for the `vmgate` binary.
#[derive(Debug, Parser)]
#[command(
    name = "vmgate",
    version,
    about = "Start, stop, and inspect one Azure VM over HTTP",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Serve the VM control endpoints.
    #[command(name = "serve", about = "Serve the VM control endpoints")]
    Serve(ServeCommand),
}

/// Arguments for the `vmgate serve` subcommand.
///
/// The target VM is configured through `AZURE_SUBSCRIPTION_ID`,
/// `AZURE_RESOURCE_GROUP`, and `AZURE_VM_NAME` (or `vmgate.toml`). Set
/// `IS_LOCAL_ENV` to authenticate with the Azure CLI instead of a managed
/// identity.
#[derive(Debug, Parser)]
pub(crate) struct ServeCommand {
    /// Address to bind the HTTP listener to.
    #[arg(long, env = "VMGATE_HOST", default_value = "0.0.0.0")]
    pub(crate) host: String,
    /// Port to listen on.
    #[arg(short, long, env = "VMGATE_PORT", default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
}

impl ServeCommand {
    /// Renders the socket address passed to the listener.
    pub(crate) fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}
