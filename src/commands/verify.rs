use anyhow::Result;
use declarative::verify;

use crate::Context;
use crate::cli::ManifestArg;
use crate::engine;
use crate::manifest::Manifest;

pub fn run(ctx: &Context, args: ManifestArg) -> Result<()> {
    let manifest = Manifest::resolve(args.manifest.as_deref())?;
    manifest.validate()?;

    let settings = super::settings(ctx)?;
    let gateway = super::connect(ctx, &settings)?;
    super::preflight(&gateway, &settings.netbox.url, ctx.quiet)?;

    let report = verify(&gateway, &engine::build(&manifest).expectations());
    engine::print_verify(&report, ctx.quiet);

    if !report.is_complete() {
        let (found, expected) = report.totals();
        anyhow::bail!(
            "Verification found {} of {} declared resource(s)",
            found,
            expected
        );
    }
    Ok(())
}
