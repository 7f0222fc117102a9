use anyhow::Result;
use declarative::{ExecuteOptions, Execution, NoSink, ResultSink, VerifyReport, execute, verify};
use restkit::Gateway;

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, TerminalObserver};
use crate::manifest::Manifest;
use crate::state::{SeedState, StateFile};
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let manifest = Manifest::resolve(args.manifest.manifest.as_deref())?;
    manifest.validate()?;

    let settings = super::settings(ctx)?;
    let gateway = super::connect(ctx, &settings)?;
    let url = settings.netbox.url.as_str();

    if !ctx.quiet {
        ui::header(if args.dry_run {
            "NetBox Seed (dry run)"
        } else {
            "NetBox Seed"
        });
    }
    super::preflight(&gateway, url, ctx.quiet)?;

    let mut sink: Box<dyn ResultSink> = if args.dry_run || args.no_state {
        Box::new(NoSink)
    } else {
        Box::new(StateFile::new(
            SeedState::state_file()?,
            url,
            manifest.prefix_containers(),
        ))
    };

    let (execution, report) = apply(&gateway, &manifest, &args, ctx.quiet, sink.as_mut())?;
    check(&execution, report.as_ref())
}

/// Run the pipeline and (unless skipped) verification
pub fn apply<G: Gateway + ?Sized>(
    gateway: &G,
    manifest: &Manifest,
    args: &ApplyArgs,
    quiet: bool,
    sink: &mut dyn ResultSink,
) -> Result<(Execution, Option<VerifyReport>)> {
    let pipeline = engine::build(manifest);
    let opts = ExecuteOptions {
        dry_run: args.dry_run,
        strict_refs: args.strict_refs,
    };

    let mut observer = TerminalObserver::new(pipeline.stages().len(), quiet);
    let execution = execute(&pipeline, gateway, &opts, &mut observer, sink)?;
    engine::print_summary(&execution.summary, args.dry_run, quiet);

    let report = if args.dry_run || args.skip_verify {
        None
    } else {
        let report = verify(gateway, &pipeline.expectations());
        engine::print_verify(&report, quiet);
        Some(report)
    };

    Ok((execution, report))
}

/// Turn a finished run into the process outcome
pub fn check(execution: &Execution, report: Option<&VerifyReport>) -> Result<()> {
    let failed = execution.summary.totals().failed;
    if failed > 0 {
        anyhow::bail!("{} resource(s) failed to reconcile", failed);
    }
    if let Some(error) = &execution.persist_error {
        anyhow::bail!("Failed to write state file: {}", error);
    }
    if let Some(report) = report
        && !report.is_complete()
    {
        let (found, expected) = report.totals();
        anyhow::bail!(
            "Verification found {} of {} declared resource(s)",
            found,
            expected
        );
    }
    Ok(())
}
