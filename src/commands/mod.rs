//! Command implementations

pub mod apply;
pub mod config;
pub mod manifest;
pub mod ping;
pub mod token;
pub mod verify;

use crate::Context;
use crate::config::{Overrides, Settings, config_file};
use crate::progress;
use anyhow::{Context as _, Result};
use restkit::{Gateway, HttpGateway};
use std::path::PathBuf;

/// Path of the config file in use
pub fn config_path(ctx: &Context) -> Result<PathBuf> {
    match &ctx.config {
        Some(path) => Ok(path.clone()),
        None => config_file(),
    }
}

/// Settings from the config file with command-line and environment overrides
pub fn settings(ctx: &Context) -> Result<Settings> {
    let mut settings = Settings::load_from(&config_path(ctx)?)?;
    settings.apply(&overrides(ctx));
    Ok(settings)
}

fn overrides(ctx: &Context) -> Overrides {
    let args = &ctx.connection;
    Overrides {
        url: args.url.clone(),
        token: args.token.clone(),
        verify_tls: args.verify_tls,
        timeout_secs: args.timeout,
    }
}

/// Build the HTTP gateway for the resolved settings
pub fn connect(ctx: &Context, settings: &Settings) -> Result<HttpGateway> {
    let config = settings.gateway_config(ctx.connection.retries)?;
    HttpGateway::new(&config).context("Failed to set up the NetBox client")
}

/// Check that the API answers before doing any work
///
/// Any failure here is fatal for the command.
pub fn preflight<G: Gateway + ?Sized>(gateway: &G, url: &str, quiet: bool) -> Result<()> {
    let spinner = progress::spinner(&format!("Testing NetBox connection to {}", url), quiet);
    match gateway.ping() {
        Ok(()) => {
            progress::finish_success(&spinner, &format!("NetBox reachable at {}", url), quiet);
            Ok(())
        }
        Err(e) => {
            progress::finish_error(&spinner, &format!("NetBox not reachable at {}", url));
            log::debug!("Ping failed: {:?}", e);
            let advice = e.category().advice();
            Err(anyhow::Error::new(e)).context(format!("Pre-flight check failed. {}", advice))
        }
    }
}
