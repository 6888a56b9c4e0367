//! Command-line tool for gatehouse card provisioning.
//!
//! Card-facing operation happens through the request document; this
//! binary covers the surrounding workflow: generating realm key pairs
//! and secrets, validating request documents, and exercising a request
//! end to end against the software card emulator.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use gatehouse_card::emulator::CardEmulator;
use gatehouse_core::{IssueRequest, authenticate_realm, issue, sig};
use rand::RngCore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gatehouse", version, about = "Provision and verify access-control cards")]
struct Cli {
    /// Log debug detail (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a realm signing key pair as PEM files.
    Keygen {
        /// Output path for the private key.
        #[arg(long, default_value = "realm-private.pem")]
        private: PathBuf,

        /// Output path for the public key.
        #[arg(long, default_value = "realm-public.pem")]
        public: PathBuf,
    },

    /// Generate a random hex-encoded secret.
    Secret {
        /// Secret length in bytes.
        #[arg(long, default_value_t = 32)]
        bytes: usize,
    },

    /// Validate a request document without touching a card.
    Check {
        /// Path to the request JSON document.
        request: PathBuf,
    },

    /// Issue and then authenticate a request against an emulated card.
    Exercise {
        /// Path to the request JSON document.
        request: PathBuf,

        /// Physical uid of the emulated card, 7 bytes of hex.
        #[arg(long, default_value = "04a1b2c3d4e5f6")]
        uid: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Keygen { private, public } => keygen(&private, &public),
        Command::Secret { bytes } => secret(bytes),
        Command::Check { request } => check(&request),
        Command::Exercise { request, uid } => exercise(&request, &uid),
    }
}

fn keygen(private: &PathBuf, public: &PathBuf) -> Result<()> {
    let (private_key, public_key) = sig::generate_keypair();

    let private_pem = sig::encode_private_key(&private_key)?;
    fs::write(private, private_pem.as_bytes())
        .with_context(|| format!("writing {}", private.display()))?;
    let public_pem = sig::encode_public_key(&public_key)?;
    fs::write(public, public_pem).with_context(|| format!("writing {}", public.display()))?;

    info!(private = %private.display(), public = %public.display(), "key pair written");
    Ok(())
}

fn secret(bytes: usize) -> Result<()> {
    if bytes == 0 {
        bail!("secret length must be at least one byte");
    }
    let mut secret = vec![0u8; bytes];
    rand::rngs::OsRng.fill_bytes(&mut secret);
    println!("{}", hex::encode(secret));
    Ok(())
}

fn load_request(path: &PathBuf) -> Result<IssueRequest> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn check(path: &PathBuf) -> Result<()> {
    let request = load_request(path)?;
    let (_, realms) = request.resolve()?;

    for realm in &realms {
        info!(
            realm = %realm.name,
            slot = %realm.slot,
            id = %realm.association_id,
            "realm ok",
        );
    }
    println!("request valid: {} realm(s)", realms.len());
    Ok(())
}

fn exercise(path: &PathBuf, uid: &str) -> Result<()> {
    let request = load_request(path)?;
    let (system_secret, realms) = request.resolve()?;

    let uid_bytes = hex::decode(uid).context("parsing card uid")?;
    let uid_bytes: [u8; 7] = uid_bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("card uid must be exactly 7 bytes"))?;

    let mut card = CardEmulator::new(uid_bytes);
    let card_uid = issue(&mut card, &system_secret, &realms)?;
    info!(uid = %card_uid, "card issued on the emulator");

    for realm in &realms {
        // Issuance diversifies the authentication key from the system
        // secret; verification re-derives it from the realm's auth key.
        // The two meet only when the document sets them equal.
        if realm.auth_secret.as_slice() != system_secret.as_slice() {
            warn!(
                realm = %realm.name,
                "realm auth key differs from the system secret; authentication will fail",
            );
        }
        let id = authenticate_realm(&mut card, realm)?;
        info!(realm = %realm.name, %id, "realm authenticated");
    }

    println!(
        "issued and authenticated {} realm(s) on emulated card {card_uid}",
        realms.len()
    );
    Ok(())
}
