use anyhow::Result;

use crate::Context;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let settings = super::settings(ctx)?;
    let gateway = super::connect(ctx, &settings)?;
    super::preflight(&gateway, &settings.netbox.url, ctx.quiet)?;

    if ctx.verbose > 0 {
        ui::kv("API root", gateway.api_base());
        ui::kv("TLS verification", if settings.netbox.verify_tls { "on" } else { "off" });
    }
    Ok(())
}
