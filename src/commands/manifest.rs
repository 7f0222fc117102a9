use anyhow::Result;

use crate::Context;
use crate::cli::ManifestCommand;
use crate::manifest::{self, Manifest};
use crate::ui;

pub fn run(ctx: &Context, cmd: ManifestCommand) -> Result<()> {
    match cmd {
        ManifestCommand::Show(args) => {
            let manifest = Manifest::resolve(args.manifest.as_deref())?;
            print!("{}", manifest.to_toml()?);
            Ok(())
        }
        ManifestCommand::Init { path, force } => {
            manifest::write_builtin(&path, force)?;
            if !ctx.quiet {
                ui::success(&format!("Wrote built-in manifest to {}", path.display()));
            }
            Ok(())
        }
        ManifestCommand::Validate(args) => validate(ctx, args.manifest.as_deref()),
    }
}

fn validate(ctx: &Context, path: Option<&str>) -> Result<()> {
    let manifest = Manifest::resolve(path)?;

    if !ctx.quiet {
        ui::header(&format!("Manifest: {}", path.unwrap_or("built-in")));
        for (kind, count) in manifest.counts() {
            ui::kv(kind, &count.to_string());
        }
        println!();
    }

    if manifest.is_empty() {
        ui::warn("Manifest declares nothing");
    }

    let problems = manifest.problems();
    if problems.is_empty() {
        ui::success(&format!("{} declared resource(s), no problems", manifest.len()));
        return Ok(());
    }

    for problem in &problems {
        ui::error(&problem.to_string());
    }
    anyhow::bail!("Manifest has {} problem(s)", problems.len())
}
