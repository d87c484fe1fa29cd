//! Model signing utility for HeartGuard tree-ensemble artifacts.
//!
//! `sign` writes `manifest.json` and an Ed25519 signature `model.sig` next to
//! the artifact; `keygen` creates the signing seed and its verifying key.
//!
//! # Usage
//!
//! ```bash
//! sign_model keygen --out-seed <path> --out-pub <path> [--force]
//! sign_model sign [models/heart_model.json] [--serial <n>] [--nonce-b64 <b64>]
//! ```
//!
//! # Security
//!
//! - Signing key read from an FD, a file, or a Docker secret; never from argv
//! - Seed files are created with 0600 permissions (Unix)
//! - Seed material is zeroized after use

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
#[cfg(unix)]
use std::os::unix::io::FromRawFd;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose;
use base64::Engine;
use clap::{Parser, Subcommand};
use ed25519_dalek::{Signature, Signer, SigningKey};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use heartguard::adapters::ensemble::{
    sha256_hex, SignedModelManifest, MANIFEST_FILE, SIGNATURE_FILE,
};

const KEY_FD_ENV: &str = "HEARTGUARD_MODEL_SIGNING_KEY_B64_FD";
const KEY_FILE_ENV: &str = "HEARTGUARD_MODEL_SIGNING_KEY_B64_FILE";
const DOCKER_SECRET_PATH: &str = "/run/secrets/heartguard_model_signing_key_b64";

#[derive(Debug, Parser)]
#[command(name = "sign_model", about = "Sign HeartGuard model artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an Ed25519 signing seed and verifying key
    Keygen {
        #[arg(long)]
        out_seed: PathBuf,
        #[arg(long)]
        out_pub: PathBuf,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Bind an artifact to a signed manifest
    Sign {
        #[arg(default_value = "models/heart_model.json")]
        artifact: PathBuf,
        /// Monotonic serial; defaults to the creation timestamp
        #[arg(long)]
        serial: Option<u64>,
        /// 16 random bytes, base64
        #[arg(long)]
        nonce_b64: Option<String>,
    },
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct Seed([u8; 32]);

fn trimmed_secret(raw: String) -> Result<Zeroizing<String>> {
    let raw = Zeroizing::new(raw);
    let secret = Zeroizing::new(raw.trim_end_matches(['\n', '\r']).to_string());
    if secret.is_empty() {
        bail!("Empty signing key");
    }
    Ok(secret)
}

fn read_signing_seed_b64() -> Result<Zeroizing<String>> {
    #[cfg(unix)]
    if let Ok(fd_str) = env::var(KEY_FD_ENV) {
        use std::io::Read;
        let fd: i32 = fd_str.trim().parse().context("Invalid key FD")?;
        if fd <= 2 {
            bail!("Refusing to read signing key from stdio FD");
        }
        // SAFETY: the FD is handed to this process for a one-time secret read.
        let mut file = unsafe { fs::File::from_raw_fd(fd) };
        let mut buf = String::new();
        file.read_to_string(&mut buf)
            .context("Failed reading signing key from FD")?;
        return trimmed_secret(buf);
    }

    if let Ok(path) = env::var(KEY_FILE_ENV) {
        let content =
            fs::read_to_string(path.trim()).context("Failed reading signing key file")?;
        return trimmed_secret(content);
    }

    if Path::new(DOCKER_SECRET_PATH).exists() {
        let content =
            fs::read_to_string(DOCKER_SECRET_PATH).context("Failed reading docker secret")?;
        return trimmed_secret(content);
    }

    Err(anyhow!(
        "Missing signing key. Provide one of: {KEY_FD_ENV}, {KEY_FILE_ENV}, or {DOCKER_SECRET_PATH}"
    ))
}

fn read_signing_seed() -> Result<Seed> {
    let encoded = read_signing_seed_b64()?;
    let raw = Zeroizing::new(
        general_purpose::STANDARD
            .decode(encoded.trim())
            .context("Invalid base64 in signing key")?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
        anyhow!(
            "Signing key seed must be 32 bytes after base64 decode (got {})",
            raw.len()
        )
    })?;
    Ok(Seed(bytes))
}

fn validate_nonce_b64(nonce_b64: &str) -> Result<()> {
    let raw = general_purpose::STANDARD
        .decode(nonce_b64.trim())
        .context("Invalid base64 nonce")?;
    if raw.len() != 16 {
        bail!("nonce must decode to exactly 16 bytes");
    }
    Ok(())
}

fn make_nonce_b64() -> String {
    let mut nonce = [0u8; 16];
    OsRng.fill_bytes(&mut nonce);
    general_purpose::STANDARD.encode(nonce)
}

fn sign(artifact: &Path, serial: Option<u64>, nonce_b64: Option<String>) -> Result<()> {
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("Artifact path has no file name: {}", artifact.display()))?;
    let dir = artifact.parent().unwrap_or_else(|| Path::new("."));
    let bytes =
        fs::read(artifact).with_context(|| format!("Failed to read {}", artifact.display()))?;

    let seed = read_signing_seed()?;
    let signing_key = SigningKey::from_bytes(&seed.0);
    drop(seed);

    let nonce_b64 = match nonce_b64 {
        Some(v) => {
            validate_nonce_b64(&v)?;
            v
        }
        None => make_nonce_b64(),
    };
    let created_at = chrono::Utc::now().timestamp();

    let mut files = BTreeMap::new();
    files.insert(file_name, sha256_hex(&bytes));
    let manifest = SignedModelManifest {
        version: 1,
        serial: serial.unwrap_or_else(|| u64::try_from(created_at).unwrap_or(1)),
        created_at,
        nonce_b64,
        files,
    };
    let manifest_bytes =
        serde_json::to_vec_pretty(&manifest).context("Failed to serialize manifest")?;

    let manifest_path = dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    let sig: Signature = signing_key.sign(&manifest_bytes);
    let sig_path = dir.join(SIGNATURE_FILE);
    fs::write(&sig_path, sig.to_bytes())
        .with_context(|| format!("Failed to write {}", sig_path.display()))?;

    println!("Signed manifest: {}", manifest_path.display());
    println!("Wrote signature: {}", sig_path.display());
    println!(
        "MODEL_PUBKEY (base64)={}",
        general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes())
    );
    Ok(())
}

fn keygen(out_seed: &Path, out_pub: &Path, force: bool) -> Result<()> {
    if !force && (out_seed.exists() || out_pub.exists()) {
        bail!("Refusing to overwrite existing key files (use --force)");
    }

    let mut seed = Seed([0u8; 32]);
    OsRng.fill_bytes(&mut seed.0);
    let signing_key = SigningKey::from_bytes(&seed.0);
    let seed_b64 = Zeroizing::new(general_purpose::STANDARD.encode(seed.0));
    drop(seed);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options
        .open(out_seed)
        .with_context(|| format!("Failed to create {}", out_seed.display()))?;
    file.write_all(seed_b64.as_bytes())?;
    file.write_all(b"\n")?;

    let pub_b64 = general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes());
    fs::write(out_pub, format!("{pub_b64}\n"))
        .with_context(|| format!("Failed to write {}", out_pub.display()))?;

    println!("Wrote signing seed: {}", out_seed.display());
    println!("Wrote verifying key: {}", out_pub.display());
    println!("MODEL_PUBKEY (base64)={pub_b64}");
    Ok(())
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Keygen {
            out_seed,
            out_pub,
            force,
        } => keygen(&out_seed, &out_pub, force),
        Command::Sign {
            artifact,
            serial,
            nonce_b64,
        } => sign(&artifact, serial, nonce_b64),
    }
}
