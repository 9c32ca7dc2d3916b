//! # lbx CLI entry point
//!
//! Parses command-line arguments, installs logging and dispatches to the
//! subcommand handlers in `lbx_cli`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use lbx_cli::create::{run_create, CreateArgs};
use lbx_cli::keygen::{run_keygen, KeygenArgs};
use lbx_cli::validate::{run_validate, ValidateArgs};
use lbx_cli::{load_config, EXIT_FAILURE};

/// Lockbox provenance CLI.
///
/// Creates, signs and validates provenance entries.
#[derive(Parser, Debug)]
#[command(name = "lbx", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, optionally sign, and validate an entry from flags.
    Create(Box<CreateArgs>),

    /// Validate an entry file and print its hash.
    Validate(ValidateArgs),

    /// Generate a signing key file.
    Keygen(KeygenArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);
    tracing::debug!("lbx CLI starting");

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<u8> {
    let config = load_config(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Commands::Create(args) => run_create(args, &config, &mut stdout),
        Commands::Validate(args) => run_validate(args, &config, &mut stdout),
        Commands::Keygen(args) => run_keygen(args, &mut stdout),
    }
}

/// `RUST_LOG` wins over the `-v` count. Logs go to stderr.
fn init_tracing(verbose: u8, format: LogFormat) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parse_validate_with_network() {
        let cli = Cli::try_parse_from([
            "lbx",
            "validate",
            "entry.json",
            "--network",
            "stellar:testnet",
        ])
        .unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.file, PathBuf::from("entry.json"));
        assert_eq!(args.network.as_deref(), Some("stellar:testnet"));
        assert!(!args.allow_unsigned);
    }

    #[test]
    fn cli_parse_keygen() {
        let cli = Cli::try_parse_from([
            "lbx", "keygen", "--algorithm", "ES256K", "--key-id", "ops", "--output", "ops.json",
        ])
        .unwrap();
        let Commands::Keygen(args) = cli.command else {
            panic!("expected keygen");
        };
        assert_eq!(args.algorithm, "ES256K");
        assert_eq!(args.key_id, "ops");
        assert!(!args.force);
    }

    #[test]
    fn cli_parse_create_requires_encryption_for_controllers() {
        let err = Cli::try_parse_from([
            "lbx",
            "create",
            "--content",
            "report.pdf",
            "--media-type",
            "application/pdf",
            "--region",
            "us-east-1",
            "--jurisdiction",
            "US/DE",
            "--provider",
            "IPFS",
            "--org",
            "did:example:acme",
            "--artifact",
            "report.pdf",
            "--chain",
            "stellar:testnet",
            "--anchor-ref",
            "abcd",
            "--last-controlled-by",
            "a",
        ])
        .unwrap_err();
        // --last-controlled-by needs --encryption-algorithm.
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn cli_parse_create_rejects_content_with_explicit_proof() {
        let result = Cli::try_parse_from([
            "lbx",
            "create",
            "--content",
            "report.pdf",
            "--integrity-proof",
            "ni:///sha-256;AAAA",
            "--media-type",
            "application/pdf",
            "--region",
            "r",
            "--jurisdiction",
            "j",
            "--provider",
            "p",
            "--org",
            "did:example:acme",
            "--artifact",
            "a",
            "--chain",
            "local",
            "--anchor-ref",
            "ref",
        ]);
        assert_eq!(
            result.unwrap_err().kind(),
            clap::error::ErrorKind::ArgumentConflict
        );
    }

    #[test]
    fn cli_parse_global_options() {
        let cli = Cli::try_parse_from([
            "lbx", "-vv", "--log-format", "json", "--config", "lbx.yaml", "keygen", "--key-id",
            "k", "--output", "k.json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("lbx.yaml")));
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["lbx"]).is_err());
    }
}
