//! Baseline tamper-evidence: signing and verification
//!
//! Two interchangeable schemes seal the canonical baseline bytes:
//!
//! - **Keyed hash** (`hmac-sha256`): tag = HMAC-SHA256(secret, bytes).
//!   Verification recomputes the tag with the same secret and compares in
//!   constant time. Anyone holding the shared secret can forge a valid
//!   baseline, so this is only appropriate when signer and verifier trust
//!   each other equally.
//! - **Signature** (`ed25519`): tag = Ed25519 signature over the bytes.
//!   Verification needs only the public key, so the verifying side does not
//!   have to hold signing capability.
//!
//! `verify` never fails with an error: a missing tag file, malformed tag,
//! scheme mismatch or signature mismatch all yield `false`, with the distinct
//! reason logged for diagnosis. `sign` requires loadable key material and
//! surfaces `KeyLoad` otherwise.

use crate::config::SealingConfig;
use crate::error::MonitorError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Supported sealing schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SealScheme {
    HmacSha256,
    Ed25519,
}

impl SealScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SealScheme::HmacSha256 => "hmac-sha256",
            SealScheme::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for SealScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability set shared by both schemes.
pub trait Seal: Send + Sync {
    fn scheme(&self) -> SealScheme;

    /// Produce an integrity tag over the given bytes.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, MonitorError>;

    /// Check a tag against the given bytes. Mismatch is `false`, never an
    /// error.
    fn verify(&self, data: &[u8], tag: &[u8]) -> bool;
}

/// Keyed-hash seal over a shared secret.
pub struct HmacSeal {
    secret: Vec<u8>,
}

impl HmacSeal {
    pub fn new(secret: Vec<u8>) -> Result<Self, MonitorError> {
        if secret.is_empty() {
            return Err(MonitorError::KeyLoad("shared secret is empty".to_string()));
        }
        Ok(Self { secret })
    }

    /// Load the shared secret from a file, trimming trailing ASCII whitespace
    /// (newlines included) so text-editor-created secret files work.
    pub fn from_secret_file(path: &Path) -> Result<Self, MonitorError> {
        let raw = fs::read(path).map_err(|e| {
            MonitorError::KeyLoad(format!("cannot read secret file {}: {}", path.display(), e))
        })?;
        let end = raw
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        Self::new(raw[..end].to_vec())
    }

    fn mac(&self) -> Result<HmacSha256, MonitorError> {
        HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| MonitorError::KeyLoad(format!("invalid hmac key: {}", e)))
    }
}

impl Seal for HmacSeal {
    fn scheme(&self) -> SealScheme {
        SealScheme::HmacSha256
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, MonitorError> {
        let mut mac = self.mac()?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        let mut mac = match self.mac() {
            Ok(mac) => mac,
            Err(e) => {
                warn!("hmac verification unavailable: {}", e);
                return false;
            }
        };
        mac.update(data);
        // verify_slice is constant-time
        mac.verify_slice(tag).is_ok()
    }
}

/// Ed25519 seal. Verification requires only the public key; signing requires
/// the private key and fails with `KeyLoad` when it was not provisioned.
pub struct Ed25519Seal {
    signing: Option<SigningKey>,
    verifying: VerifyingKey,
}

impl Ed25519Seal {
    /// Load keys from hex-encoded 32-byte key files.
    ///
    /// At least one of the two paths must be given. When only the private key
    /// is present the public key is derived from it; when only the public key
    /// is present the seal is verify-only.
    pub fn from_key_files(
        private_key: Option<&Path>,
        public_key: Option<&Path>,
    ) -> Result<Self, MonitorError> {
        let signing = match private_key {
            Some(path) => Some(SigningKey::from_bytes(&read_key_file(path)?)),
            None => None,
        };

        let verifying = match public_key {
            Some(path) => VerifyingKey::from_bytes(&read_key_file(path)?).map_err(|e| {
                MonitorError::KeyLoad(format!("invalid public key {}: {}", path.display(), e))
            })?,
            None => match &signing {
                Some(signing) => signing.verifying_key(),
                None => {
                    return Err(MonitorError::KeyLoad(
                        "ed25519 scheme requires a private key, a public key, or both"
                            .to_string(),
                    ))
                }
            },
        };

        Ok(Self { signing, verifying })
    }
}

impl Seal for Ed25519Seal {
    fn scheme(&self) -> SealScheme {
        SealScheme::Ed25519
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, MonitorError> {
        let signing = self.signing.as_ref().ok_or_else(|| {
            MonitorError::KeyLoad("no private key provisioned for signing".to_string())
        })?;
        Ok(signing.sign(data).to_bytes().to_vec())
    }

    fn verify(&self, data: &[u8], tag: &[u8]) -> bool {
        let signature = match Signature::from_slice(tag) {
            Ok(sig) => sig,
            Err(e) => {
                warn!("malformed ed25519 signature bytes: {}", e);
                return false;
            }
        };
        self.verifying.verify(data, &signature).is_ok()
    }
}

/// Read a 32-byte key from a hex-encoded key file.
fn read_key_file(path: &Path) -> Result<[u8; 32], MonitorError> {
    let text = fs::read_to_string(path).map_err(|e| {
        MonitorError::KeyLoad(format!("cannot read key file {}: {}", path.display(), e))
    })?;
    let bytes = hex::decode(text.trim()).map_err(|e| {
        MonitorError::KeyLoad(format!("key file {} is not valid hex: {}", path.display(), e))
    })?;
    bytes.try_into().map_err(|_| {
        MonitorError::KeyLoad(format!(
            "key file {} must contain exactly 32 hex-encoded bytes",
            path.display()
        ))
    })
}

/// Build the configured seal, loading its key material.
pub fn build_seal(config: &SealingConfig) -> Result<Box<dyn Seal>, MonitorError> {
    match config.scheme {
        SealScheme::HmacSha256 => {
            let secret_file = config.secret_file.as_ref().ok_or_else(|| {
                MonitorError::KeyLoad(
                    "hmac-sha256 scheme requires sealing.secret_file".to_string(),
                )
            })?;
            Ok(Box::new(HmacSeal::from_secret_file(secret_file)?))
        }
        SealScheme::Ed25519 => Ok(Box::new(Ed25519Seal::from_key_files(
            config.private_key.as_deref(),
            config.public_key.as_deref(),
        )?)),
    }
}

/// A tag as persisted in the sidecar file: `<scheme>:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTag {
    pub scheme: SealScheme,
    pub bytes: Vec<u8>,
}

impl StoredTag {
    pub fn encode(&self) -> String {
        format!("{}:{}\n", self.scheme, hex::encode(&self.bytes))
    }

    pub fn decode(text: &str) -> Option<Self> {
        let line = text.trim();
        let (scheme, hex_tag) = line.split_once(':')?;
        let scheme = match scheme {
            "hmac-sha256" => SealScheme::HmacSha256,
            "ed25519" => SealScheme::Ed25519,
            _ => return None,
        };
        let bytes = hex::decode(hex_tag).ok()?;
        Some(Self { scheme, bytes })
    }
}

/// Verify stored baseline bytes against the tag sidecar file.
///
/// Binary result by design: every failure mode (missing tag, unreadable tag,
/// malformed tag, scheme mismatch, signature mismatch) is "not verified". The
/// reasons diverge only in the log.
pub fn verify_stored(seal: &dyn Seal, data: &[u8], tag_path: &Path) -> bool {
    let text = match fs::read_to_string(tag_path) {
        Ok(text) => text,
        Err(e) => {
            warn!(
                "baseline tag {} unreadable: {} (treating baseline as unverified)",
                tag_path.display(),
                e
            );
            return false;
        }
    };

    let tag = match StoredTag::decode(&text) {
        Some(tag) => tag,
        None => {
            warn!(
                "baseline tag {} is malformed (treating baseline as unverified)",
                tag_path.display()
            );
            return false;
        }
    };

    if tag.scheme != seal.scheme() {
        warn!(
            "baseline tag scheme {} does not match configured scheme {}",
            tag.scheme,
            seal.scheme()
        );
        return false;
    }

    let ok = seal.verify(data, &tag.bytes);
    if !ok {
        warn!("baseline tag {} does not match baseline bytes", tag_path.display());
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn hmac_seal() -> HmacSeal {
        HmacSeal::new(b"unit-test-secret".to_vec()).unwrap()
    }

    fn ed25519_seal(fill: u8) -> Ed25519Seal {
        let signing = SigningKey::from_bytes(&[fill; 32]);
        Ed25519Seal {
            verifying: signing.verifying_key(),
            signing: Some(signing),
        }
    }

    #[test]
    fn test_hmac_sign_verify_round_trip() {
        let seal = hmac_seal();
        let tag = seal.sign(b"baseline bytes").unwrap();
        assert!(seal.verify(b"baseline bytes", &tag));
    }

    #[test]
    fn test_hmac_rejects_modified_data() {
        let seal = hmac_seal();
        let tag = seal.sign(b"baseline bytes").unwrap();
        assert!(!seal.verify(b"baseline byteS", &tag));
    }

    #[test]
    fn test_hmac_rejects_wrong_secret() {
        let seal = hmac_seal();
        let other = HmacSeal::new(b"a-different-secret".to_vec()).unwrap();
        let tag = seal.sign(b"baseline bytes").unwrap();
        assert!(!other.verify(b"baseline bytes", &tag));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            HmacSeal::new(Vec::new()),
            Err(MonitorError::KeyLoad(_))
        ));
    }

    #[test]
    fn test_secret_file_trailing_whitespace_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let bare = temp_dir.path().join("bare.key");
        let padded = temp_dir.path().join("padded.key");
        fs::write(&bare, "shared-secret").unwrap();
        // CRLF-terminated and space-padded files must yield the same key.
        fs::write(&padded, "shared-secret \r\n").unwrap();

        let signer = HmacSeal::from_secret_file(&bare).unwrap();
        let verifier = HmacSeal::from_secret_file(&padded).unwrap();
        let tag = signer.sign(b"data").unwrap();
        assert!(verifier.verify(b"data", &tag));
    }

    #[test]
    fn test_whitespace_only_secret_file_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let blank = temp_dir.path().join("blank.key");
        fs::write(&blank, "\n\n").unwrap();
        assert!(matches!(
            HmacSeal::from_secret_file(&blank),
            Err(MonitorError::KeyLoad(_))
        ));
    }

    #[test]
    fn test_ed25519_sign_verify_round_trip() {
        let seal = ed25519_seal(7);
        let tag = seal.sign(b"baseline bytes").unwrap();
        assert!(seal.verify(b"baseline bytes", &tag));
    }

    #[test]
    fn test_ed25519_rejects_wrong_key() {
        let signer = ed25519_seal(7);
        let other_verifier = ed25519_seal(8);
        let tag = signer.sign(b"baseline bytes").unwrap();
        assert!(!other_verifier.verify(b"baseline bytes", &tag));
    }

    #[test]
    fn test_ed25519_rejects_single_bit_flip() {
        let seal = ed25519_seal(7);
        let tag = seal.sign(b"baseline bytes").unwrap();

        let mut flipped = b"baseline bytes".to_vec();
        flipped[0] ^= 0x01;
        assert!(!seal.verify(&flipped, &tag));
    }

    #[test]
    fn test_ed25519_verify_only_cannot_sign() {
        let signing = SigningKey::from_bytes(&[9; 32]);
        let seal = Ed25519Seal {
            signing: None,
            verifying: signing.verifying_key(),
        };
        assert!(matches!(
            seal.sign(b"data"),
            Err(MonitorError::KeyLoad(_))
        ));
    }

    #[test]
    fn test_ed25519_key_files_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let private = temp_dir.path().join("key.priv");
        let public = temp_dir.path().join("key.pub");

        let signing = SigningKey::from_bytes(&[3; 32]);
        fs::write(&private, hex::encode(signing.to_bytes())).unwrap();
        fs::write(&public, hex::encode(signing.verifying_key().to_bytes())).unwrap();

        let signer = Ed25519Seal::from_key_files(Some(&private), None).unwrap();
        let verifier = Ed25519Seal::from_key_files(None, Some(&public)).unwrap();

        let tag = signer.sign(b"payload").unwrap();
        assert!(verifier.verify(b"payload", &tag));
    }

    #[test]
    fn test_key_file_missing_is_key_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent.priv");
        assert!(matches!(
            Ed25519Seal::from_key_files(Some(&missing), None),
            Err(MonitorError::KeyLoad(_))
        ));
    }

    #[test]
    fn test_key_file_bad_hex_is_key_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let bad = temp_dir.path().join("bad.priv");
        fs::write(&bad, "not hex at all").unwrap();
        assert!(matches!(
            Ed25519Seal::from_key_files(Some(&bad), None),
            Err(MonitorError::KeyLoad(_))
        ));
    }

    #[test]
    fn test_stored_tag_encode_decode() {
        let tag = StoredTag {
            scheme: SealScheme::Ed25519,
            bytes: vec![1, 2, 3, 255],
        };
        let encoded = tag.encode();
        assert_eq!(encoded, "ed25519:010203ff\n");
        assert_eq!(StoredTag::decode(&encoded).unwrap(), tag);
    }

    #[test]
    fn test_stored_tag_rejects_unknown_scheme() {
        assert!(StoredTag::decode("rot13:0102").is_none());
        assert!(StoredTag::decode("garbage").is_none());
        assert!(StoredTag::decode("ed25519:zz").is_none());
    }

    #[test]
    fn test_verify_stored_missing_tag_is_false() {
        let temp_dir = TempDir::new().unwrap();
        let tag_path = temp_dir.path().join("baseline.sig");
        assert!(!verify_stored(&hmac_seal(), b"data", &tag_path));
    }

    #[test]
    fn test_verify_stored_scheme_mismatch_is_false() {
        let temp_dir = TempDir::new().unwrap();
        let tag_path = temp_dir.path().join("baseline.sig");

        let ed = ed25519_seal(1);
        let tag = ed.sign(b"data").unwrap();
        fs::write(
            &tag_path,
            StoredTag {
                scheme: SealScheme::Ed25519,
                bytes: tag,
            }
            .encode(),
        )
        .unwrap();

        // hmac-configured verifier must not accept an ed25519 tag
        assert!(!verify_stored(&hmac_seal(), b"data", &tag_path));
    }

    #[test]
    fn test_verify_stored_accepts_valid_tag() {
        let temp_dir = TempDir::new().unwrap();
        let tag_path = temp_dir.path().join("baseline.sig");

        let seal = hmac_seal();
        let tag = seal.sign(b"data").unwrap();
        fs::write(
            &tag_path,
            StoredTag {
                scheme: SealScheme::HmacSha256,
                bytes: tag,
            }
            .encode(),
        )
        .unwrap();

        assert!(verify_stored(&seal, b"data", &tag_path));
    }
}
