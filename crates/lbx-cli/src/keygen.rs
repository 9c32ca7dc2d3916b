//! # Keygen Subcommand
//!
//! Generates a key pair and writes it as a JSON `SigningKey` record,
//! private material included. The file is what `lbx create --key` reads.
//!
//! ```bash
//! lbx keygen --algorithm ES256K --key-id acme-ops --output acme-ops.json
//! ```

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use lbx_crypto::{SignatureAlgorithm, SigningKey};

use crate::EXIT_OK;

/// Arguments for the keygen subcommand.
#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Signature algorithm: EdDSA, ES256K or RS256 (aliases accepted).
    #[arg(long, default_value = "EdDSA")]
    pub algorithm: String,

    /// Identifier written as `kid` into signature headers.
    #[arg(long)]
    pub key_id: String,

    /// DID or account that controls the key.
    #[arg(long)]
    pub controller: Option<String>,

    /// Key file to write.
    #[arg(long)]
    pub output: PathBuf,

    /// Overwrite an existing key file.
    #[arg(long)]
    pub force: bool,
}

/// Execute the keygen subcommand.
pub fn run_keygen(args: &KeygenArgs, out: &mut impl Write) -> Result<u8> {
    let algorithm = SignatureAlgorithm::normalize(&args.algorithm)?;
    anyhow::ensure!(!args.key_id.trim().is_empty(), "--key-id must not be blank");

    let mut key = SigningKey::generate(algorithm, args.key_id.trim())
        .with_context(|| format!("generating {algorithm} key"))?;
    if let Some(controller) = &args.controller {
        key = key.with_controller(controller.as_str());
    }

    let json = serde_json::to_string_pretty(&key)?;
    write_private(&args.output, json.as_bytes(), args.force)?;
    tracing::info!(
        key_id = %key.key_id,
        alg = %algorithm,
        path = %args.output.display(),
        "key written"
    );

    writeln!(out, "key_id: {}", key.key_id)?;
    writeln!(out, "algorithm: {algorithm}")?;
    writeln!(out, "public_key: {}", key.public_key)?;
    writeln!(out, "written: {}", args.output.display())?;
    Ok(EXIT_OK)
}

/// Write a file readable only by its owner.
fn write_private(path: &Path, contents: &[u8], overwrite: bool) -> Result<()> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("creating key file: {}", path.display()))?;
    file.write_all(contents)
        .with_context(|| format!("writing key file: {}", path.display()))?;
    Ok(())
}
