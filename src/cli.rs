use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netbox-seed")]
#[command(version)]
#[command(
    about = "Declaratively seed NetBox with tenancy, roles, custom fields and prefix containers",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/netbox-seed/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// NetBox connection options; each overrides the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// NetBox base URL (e.g. http://localhost:8000)
    #[arg(long, env = "NETBOX_URL", global = true)]
    pub url: Option<String>,

    /// API token
    #[arg(long, env = "NETBOX_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Verify TLS certificates
    #[arg(long, env = "NETBOX_VERIFY_TLS", global = true, value_parser = BoolishValueParser::new())]
    pub verify_tls: Option<bool>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts for reads and updates on connection and server errors (1 = no retry)
    #[arg(long, global = true, default_value_t = 1)]
    pub retries: u32,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or update every declared resource, then verify
    Apply(ApplyArgs),

    /// Check which declared resources exist in NetBox
    Verify(ManifestArg),

    /// Check that the NetBox API is reachable with the configured token
    Ping,

    /// Create a NetBox user and an API token for it
    Token(TokenArgs),

    /// Show configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Inspect or create manifests
    #[command(subcommand)]
    Manifest(ManifestCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply / Verify
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct ManifestArg {
    /// Manifest file (default: built-in datacenter seed)
    #[arg(short, long, value_name = "PATH")]
    pub manifest: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub manifest: ManifestArg,

    /// Only query NetBox and show what would be written
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Fail resources with unresolved references instead of sending null
    #[arg(long)]
    pub strict_refs: bool,

    /// Do not write the state file
    #[arg(long)]
    pub no_state: bool,

    /// Skip the verification pass after applying
    #[arg(long)]
    pub skip_verify: bool,
}

// ============================================================================
// Token
// ============================================================================

#[derive(Args, Debug, Clone, Default)]
pub struct TokenArgs {
    /// Username (prompted when omitted)
    #[arg(long)]
    pub username: Option<String>,

    /// Email address (prompted when omitted)
    #[arg(long)]
    pub email: Option<String>,

    /// First name
    #[arg(long)]
    pub first_name: Option<String>,

    /// Last name
    #[arg(long)]
    pub last_name: Option<String>,

    /// Password (prompted when omitted; empty leaves it unset)
    #[arg(long, env = "NETBOX_USER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Store the new token in the config file
    #[arg(long)]
    pub save: bool,

    /// Accept defaults and skip prompts
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Config / Manifest
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the resolved settings (token masked)
    Show,

    /// Print the config file path
    Path,
}

#[derive(Subcommand)]
pub enum ManifestCommand {
    /// Print a manifest as TOML
    Show(ManifestArg),

    /// Write the built-in manifest to a file
    Init {
        /// Destination file
        #[arg(default_value = "netbox-seed.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Check a manifest without contacting NetBox
    Validate(ManifestArg),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_apply_flags() {
        let cli = Cli::try_parse_from([
            "netbox-seed",
            "-vv",
            "apply",
            "--dry-run",
            "--strict-refs",
            "-m",
            "seed.toml",
            "--url",
            "http://nb:8000",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.connection.url.as_deref(), Some("http://nb:8000"));
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert!(args.dry_run);
        assert!(args.strict_refs);
        assert_eq!(args.manifest.manifest.as_deref(), Some("seed.toml"));
    }

    #[test]
    fn test_verify_tls_accepts_boolish_values() {
        let cli =
            Cli::try_parse_from(["netbox-seed", "ping", "--verify-tls", "no"]).unwrap();
        assert_eq!(cli.connection.verify_tls, Some(false));
        assert_eq!(cli.connection.retries, 1);
    }

    #[test]
    fn test_manifest_init_default_path() {
        let cli = Cli::try_parse_from(["netbox-seed", "manifest", "init"]).unwrap();
        let Command::Manifest(ManifestCommand::Init { path, force }) = cli.command else {
            panic!("expected manifest init");
        };
        assert_eq!(path, PathBuf::from("netbox-seed.toml"));
        assert!(!force);
    }
}
