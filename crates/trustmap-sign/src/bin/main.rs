//! Map signing tool
//!
//! Produces and checks the detached signatures that signed maps require.
//!
//! Usage:
//!   trustmap-sign keygen --output map.key [--bits 2048]
//!   trustmap-sign sign --key map.key --input hosts.map [--force]
//!   trustmap-sign verify --pubkey map.pub --input hosts.map
//!   trustmap-sign pubkey --pubkey map.pub

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use trustmap_sign::{PrivateKey, PublicKey, Signature, SIGNATURE_EXTENSION};

#[derive(Parser, Debug)]
#[command(name = "trustmap-sign")]
#[command(about = "Sign map files and verify detached map signatures")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate an RSA key pair (PEM private key plus `.pub` public key)
    Keygen {
        /// Private key output path; the public key goes next to it as `<output>.pub`
        #[arg(long)]
        output: PathBuf,

        /// Modulus size in bits
        #[arg(long, default_value_t = 2048)]
        bits: usize,
    },

    /// Sign a map file
    Sign {
        /// PEM private key
        #[arg(long)]
        key: PathBuf,

        /// Map file to sign
        #[arg(long)]
        input: PathBuf,

        /// Signature output path (default: `<input>.sig`)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Overwrite an existing signature
        #[arg(long)]
        force: bool,
    },

    /// Verify a map file against its detached signature
    Verify {
        /// PEM public key
        #[arg(long)]
        pubkey: PathBuf,

        /// Map file to check
        #[arg(long)]
        input: PathBuf,

        /// Signature path (default: `<input>.sig`)
        #[arg(long)]
        signature: Option<PathBuf>,
    },

    /// Print the base32 trusted-key string for a public key
    Pubkey {
        /// PEM public key
        #[arg(long)]
        pubkey: PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    match args.command {
        Command::Keygen { output, bits } => {
            tracing::info!(bits, output = %output.display(), "Generating key pair");
            let key = PrivateKey::generate(bits)?;
            std::fs::write(&output, key.to_pem()?)
                .with_context(|| format!("writing {}", output.display()))?;

            let pub_path = append_extension(&output, "pub");
            let public = key.public_key()?;
            std::fs::write(&pub_path, public.to_pem()?)
                .with_context(|| format!("writing {}", pub_path.display()))?;

            tracing::info!(public = %pub_path.display(), "Wrote key pair");
            println!("{}", public.to_base32());
        }

        Command::Sign {
            key,
            input,
            output,
            force,
        } => {
            let key = PrivateKey::load(&key)?;
            let output = output.unwrap_or_else(|| append_extension(&input, SIGNATURE_EXTENSION));

            let signature = trustmap_sign::sign_file(&key, &input)?;
            signature.save(&output, force)?;

            tracing::info!(
                input = %input.display(),
                output = %output.display(),
                bytes = signature.len(),
                "Wrote signature"
            );
        }

        Command::Verify {
            pubkey,
            input,
            signature,
        } => {
            let public = PublicKey::load(&pubkey)?;
            let sig_path =
                signature.unwrap_or_else(|| append_extension(&input, SIGNATURE_EXTENSION));
            let signature = Signature::load(&sig_path)?;

            if trustmap_sign::verify_file(&public, &signature, &input)? {
                tracing::info!(input = %input.display(), "Signature OK");
            } else {
                tracing::error!(
                    input = %input.display(),
                    signature = %sig_path.display(),
                    "Signature mismatch"
                );
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Pubkey { pubkey } => {
            let public = PublicKey::load(&pubkey)?;
            println!("{}", public.to_base32());
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// `hosts.map` -> `hosts.map.sig`
fn append_extension(path: &std::path::Path, ext: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
