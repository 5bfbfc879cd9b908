//! Commands enum and their arguments.

use clap::{Args, Subcommand};

use modelrelay_core::{DEFAULT_HOST, DEFAULT_MANAGED_PORT, DEFAULT_ROUTER_PORT, DEFAULT_UPSTREAM_TIMEOUT};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the router until Ctrl-C
    Serve(ServeArgs),

    /// Refresh and list the models served by enabled external providers
    Models {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show the configured external providers
    Providers,
}

/// Arguments of `serve`.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "MODELRELAY_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to bind the router to
    #[arg(short, long, env = "MODELRELAY_PORT", default_value_t = DEFAULT_ROUTER_PORT)]
    pub port: u16,

    /// Host of the managed backend
    #[arg(long, env = "MODELRELAY_MANAGED_HOST", default_value = DEFAULT_HOST)]
    pub managed_host: String,

    /// Port of the managed backend
    #[arg(long, env = "MODELRELAY_MANAGED_PORT", default_value_t = DEFAULT_MANAGED_PORT)]
    pub managed_port: u16,

    /// Total time allowed for one external-provider request, in seconds
    #[arg(
        long,
        env = "MODELRELAY_UPSTREAM_TIMEOUT_SECS",
        default_value_t = DEFAULT_UPSTREAM_TIMEOUT.as_secs()
    )]
    pub upstream_timeout_secs: u64,

    /// Skip the startup model refresh; every request goes to the managed backend
    #[arg(long)]
    pub no_refresh: bool,
}
