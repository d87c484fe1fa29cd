//! Signed-manifest verification for model artifacts.
//!
//! A signed artifact directory holds `manifest.json` (SHA-256 of every bound
//! file) and `model.sig` (Ed25519 signature over the manifest bytes). The
//! `sign_model` binary produces both.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ports::ModelError;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SIGNATURE_FILE: &str = "model.sig";

const DOCKER_SECRET_PUBKEY: &str = "/run/secrets/heartguard_model_pubkey_b64";

/// Allowed clock skew for `created_at`.
const MAX_FUTURE_SKEW_SECS: i64 = 300;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignedModelManifest {
    pub version: u32,
    pub serial: u64,
    pub created_at: i64,
    pub nonce_b64: String,
    pub files: BTreeMap<String, String>,
}

/// How strictly artifact signatures are enforced at load time.
#[derive(Debug, Clone, Default)]
pub struct IntegrityPolicy {
    /// Refuse artifacts without `manifest.json` and `model.sig`
    pub require_signature: bool,

    /// File holding the base64 Ed25519 verifying key
    pub public_key_file: Option<PathBuf>,
}

/// Outcome of checking an artifact directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified { serial: u64 },
    Unsigned,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

/// Verify `artifact` against the signed manifest beside it.
///
/// # Errors
/// Returns `ModelError::Integrity` if a signature is required but missing,
/// or if the signature, manifest or file hashes do not check out.
pub fn verify_artifact(
    artifact: &Path,
    artifact_bytes: &[u8],
    policy: &IntegrityPolicy,
) -> Result<Verification, ModelError> {
    let base_dir = artifact.parent().unwrap_or_else(|| Path::new("."));
    let sig_path = base_dir.join(SIGNATURE_FILE);
    let manifest_path = base_dir.join(MANIFEST_FILE);

    if !sig_path.exists() || !manifest_path.exists() {
        if policy.require_signature {
            tracing::error!(
                path = %sig_path.display(),
                "Model signature not found and signed models are required"
            );
            return Err(ModelError::Integrity("model signature required".into()));
        }
        return Ok(Verification::Unsigned);
    }

    let sig_bytes = fs::read(&sig_path)
        .map_err(|e| ModelError::Integrity(format!("failed to read signature: {e}")))?;
    let sig_array: [u8; 64] = sig_bytes
        .as_slice()
        .try_into()
        .map_err(|_| ModelError::Integrity("invalid signature length (expected 64 bytes)".into()))?;
    let signature = Signature::from_bytes(&sig_array);

    let manifest_content = fs::read(&manifest_path)
        .map_err(|e| ModelError::Integrity(format!("failed to read manifest: {e}")))?;

    let public_key = verifying_key(policy)?;
    public_key
        .verify(&manifest_content, &signature)
        .map_err(|_| ModelError::Integrity("invalid model signature".into()))?;

    let manifest: SignedModelManifest = serde_json::from_slice(&manifest_content)
        .map_err(|e| ModelError::Integrity(format!("invalid manifest format: {e}")))?;
    if manifest.version != 1 {
        return Err(ModelError::Integrity(format!(
            "unsupported manifest version: {}",
            manifest.version
        )));
    }
    validate_nonce_b64(&manifest.nonce_b64)?;
    if manifest.created_at > chrono::Utc::now().timestamp() + MAX_FUTURE_SKEW_SECS {
        return Err(ModelError::Integrity("manifest created_at is in the future".into()));
    }

    let artifact_name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ModelError::Integrity("artifact path has no file name".into()))?;
    let expected_hex = manifest.files.get(artifact_name).ok_or_else(|| {
        ModelError::Integrity(format!("manifest does not bind {artifact_name}"))
    })?;
    if !constant_time_eq(sha256_hex(artifact_bytes).as_bytes(), expected_hex.as_bytes()) {
        return Err(ModelError::Integrity(format!("file hash mismatch for {artifact_name}")));
    }

    tracing::info!(serial = manifest.serial, "Model signature and hash verified");
    Ok(Verification::Verified {
        serial: manifest.serial,
    })
}

fn verifying_key(policy: &IntegrityPolicy) -> Result<VerifyingKey, ModelError> {
    let path = match &policy.public_key_file {
        Some(path) => path.clone(),
        None if Path::new(DOCKER_SECRET_PUBKEY).exists() => PathBuf::from(DOCKER_SECRET_PUBKEY),
        None => {
            return Err(ModelError::Integrity(
                "artifact is signed but no verifying key is configured".into(),
            ))
        }
    };
    let b64 = fs::read_to_string(&path)
        .map_err(|e| ModelError::Integrity(format!("failed reading public key file: {e}")))?;
    verifying_key_from_b64(&b64)
}

/// Parse a base64-encoded 32-byte Ed25519 verifying key.
///
/// # Errors
/// Returns `ModelError::Integrity` on bad base64 or key bytes.
pub fn verifying_key_from_b64(b64: &str) -> Result<VerifyingKey, ModelError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|_| ModelError::Integrity("invalid public key base64".into()))?;
    let key: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| ModelError::Integrity("invalid public key length (expected 32 bytes)".into()))?;
    VerifyingKey::from_bytes(&key).map_err(|_| ModelError::Integrity("invalid verifying key".into()))
}

fn validate_nonce_b64(nonce_b64: &str) -> Result<(), ModelError> {
    let raw = base64::engine::general_purpose::STANDARD
        .decode(nonce_b64.trim())
        .map_err(|e| ModelError::Integrity(format!("invalid nonce base64: {e}")))?;
    if raw.len() != 16 {
        return Err(ModelError::Integrity("nonce must decode to exactly 16 bytes".into()));
    }
    Ok(())
}

/// Constant-time byte comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

#[cfg(test)]
pub(crate) mod signing {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    pub const TEST_SEED: [u8; 32] = [7u8; 32];

    /// Sign `artifact` the way `sign_model` does and write the public key
    /// next to it. Returns the public key path.
    pub fn sign_dir(artifact: &Path) -> PathBuf {
        let dir = artifact.parent().expect("Should have parent");
        let signing_key = SigningKey::from_bytes(&TEST_SEED);
        let bytes = fs::read(artifact).expect("Should read artifact");

        let mut files = BTreeMap::new();
        files.insert(
            artifact.file_name().unwrap().to_string_lossy().into_owned(),
            sha256_hex(&bytes),
        );
        let manifest = SignedModelManifest {
            version: 1,
            serial: 3,
            created_at: chrono::Utc::now().timestamp(),
            nonce_b64: base64::engine::general_purpose::STANDARD.encode([1u8; 16]),
            files,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest).unwrap();
        fs::write(dir.join(MANIFEST_FILE), &manifest_bytes).unwrap();
        fs::write(dir.join(SIGNATURE_FILE), signing_key.sign(&manifest_bytes).to_bytes()).unwrap();

        let pub_path = dir.join("model.pub.b64");
        fs::write(
            &pub_path,
            base64::engine::general_purpose::STANDARD.encode(signing_key.verifying_key().as_bytes()),
        )
        .unwrap();
        pub_path
    }
}

#[cfg(test)]
mod tests {
    use super::signing::sign_dir;
    use super::*;
    use tempfile::tempdir;

    fn write_artifact(dir: &Path) -> PathBuf {
        let path = dir.join("heart_model.json");
        fs::write(&path, br#"{"format_version":1}"#).unwrap();
        path
    }

    #[test]
    fn test_unsigned_allowed_unless_required() {
        let dir = tempdir().expect("Should create temp dir");
        let artifact = write_artifact(dir.path());
        let bytes = fs::read(&artifact).unwrap();

        let lenient = IntegrityPolicy::default();
        assert_eq!(
            verify_artifact(&artifact, &bytes, &lenient).expect("Should allow unsigned"),
            Verification::Unsigned
        );

        let strict = IntegrityPolicy {
            require_signature: true,
            public_key_file: None,
        };
        assert!(matches!(
            verify_artifact(&artifact, &bytes, &strict),
            Err(ModelError::Integrity(_))
        ));
    }

    #[test]
    fn test_signed_artifact_verifies() {
        let dir = tempdir().expect("Should create temp dir");
        let artifact = write_artifact(dir.path());
        let pub_path = sign_dir(&artifact);
        let bytes = fs::read(&artifact).unwrap();

        let policy = IntegrityPolicy {
            require_signature: true,
            public_key_file: Some(pub_path),
        };
        assert_eq!(
            verify_artifact(&artifact, &bytes, &policy).expect("Should verify"),
            Verification::Verified { serial: 3 }
        );
    }

    #[test]
    fn test_tampered_artifact_rejected() {
        let dir = tempdir().expect("Should create temp dir");
        let artifact = write_artifact(dir.path());
        let pub_path = sign_dir(&artifact);

        let policy = IntegrityPolicy {
            require_signature: false,
            public_key_file: Some(pub_path),
        };
        let tampered = br#"{"format_version":2}"#;
        let err = verify_artifact(&artifact, tampered, &policy).unwrap_err();
        assert!(err.to_string().contains("hash mismatch"));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let dir = tempdir().expect("Should create temp dir");
        let artifact = write_artifact(dir.path());
        sign_dir(&artifact);
        let bytes = fs::read(&artifact).unwrap();

        let other = ed25519_dalek::SigningKey::from_bytes(&[9u8; 32]);
        let other_path = dir.path().join("other.pub.b64");
        fs::write(
            &other_path,
            base64::engine::general_purpose::STANDARD.encode(other.verifying_key().as_bytes()),
        )
        .unwrap();

        let policy = IntegrityPolicy {
            require_signature: true,
            public_key_file: Some(other_path),
        };
        let err = verify_artifact(&artifact, &bytes, &policy).unwrap_err();
        assert!(err.to_string().contains("invalid model signature"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
    }
}
