use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::state::SeedState;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(ctx),
        ConfigCommand::Path => path(ctx),
    }
}

fn show(ctx: &Context) -> Result<()> {
    let path = super::config_path(ctx)?;
    let settings = super::settings(ctx)?;
    let netbox = &settings.netbox;

    ui::header("Configuration");
    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, using defaults)", path.display())
    };
    ui::kv("Config file", &source);

    ui::section("NetBox");
    ui::kv("URL", &netbox.url);
    ui::kv(
        "Token",
        &netbox
            .token
            .as_deref()
            .map_or_else(|| "(not set)".to_string(), ui::mask_token),
    );
    ui::kv("Auth scheme", &netbox.auth_scheme.to_string());
    ui::kv("Verify TLS", &netbox.verify_tls.to_string());
    ui::kv(
        "Timeout",
        &netbox
            .timeout_secs
            .map_or_else(|| "transport default".to_string(), |s| format!("{}s", s)),
    );
    ui::kv("Retries", &ctx.connection.retries.to_string());

    ui::section("Last apply");
    let state_path = SeedState::state_file()?;
    match SeedState::load(&state_path)? {
        Some(state) => {
            ui::kv("State file", &state_path.display().to_string());
            ui::kv("Applied", &state.last_applied.to_rfc3339());
            ui::kv("Endpoint", &state.endpoint);
            for (alias, cidr) in &state.prefix_containers {
                ui::kv(alias, cidr);
            }
        }
        None => ui::dim("No state recorded yet"),
    }

    println!();
    ui::dim("NETBOX_URL, NETBOX_TOKEN and NETBOX_VERIFY_TLS override the file.");
    Ok(())
}

fn path(ctx: &Context) -> Result<()> {
    println!("{}", super::config_path(ctx)?.display());
    Ok(())
}
