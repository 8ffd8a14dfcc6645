//! Ed25519 authorship attestation over canonical artifact bytes.
//!
//! Signing is a pure function of (canonical bytes, private key): Ed25519 is
//! deterministic, so re-signing an identical artifact yields an identical
//! signature. The key is read-only after construction and safe to share.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::artifact::{canonical_json, DecisionArtifact};
use crate::error::{FirewallError, FirewallResult};

/// Environment variable holding the hex-encoded 32-byte signing seed.
pub const PRIVATE_KEY_ENV: &str = "SENTINEL_PRIVATE_KEY";

pub struct ArtifactSigner {
    signing_key: SigningKey,
}

impl std::fmt::Debug for ArtifactSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactSigner")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl ArtifactSigner {
    pub fn from_secret_hex(secret_hex: &str) -> FirewallResult<Self> {
        let trimmed = secret_hex.trim();
        if trimmed.is_empty() {
            return Err(FirewallError::SigningMisconfigured(
                "no private key material".into(),
            ));
        }
        let bytes = hex::decode(trimmed)
            .map_err(|_| FirewallError::SigningMisconfigured("private key is not valid hex".into()))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            FirewallError::SigningMisconfigured("private key must be a 32-byte seed".into())
        })?;
        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Load the key from `SENTINEL_PRIVATE_KEY`. Absence is fatal here, not at
    /// sign time.
    pub fn from_env() -> FirewallResult<Self> {
        let raw = std::env::var(PRIVATE_KEY_ENV).map_err(|_| {
            FirewallError::SigningMisconfigured(format!("{PRIVATE_KEY_ENV} not set"))
        })?;
        Self::from_secret_hex(&raw)
    }

    /// Fresh random key, for tooling and tests.
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Lowercase hex signature over the canonical serialization of `artifact`.
    pub fn sign(&self, artifact: &impl Serialize) -> FirewallResult<String> {
        let bytes = canonical_json(artifact)?;
        Ok(hex::encode(self.signing_key.sign(&bytes).to_bytes()))
    }

    /// Check `signature_hex` against `public_key_hex` over the canonical bytes.
    /// Any malformed input or mismatch is `false`.
    pub fn verify(artifact: &impl Serialize, signature_hex: &str, public_key_hex: &str) -> bool {
        let Ok(bytes) = canonical_json(artifact) else {
            return false;
        };
        let Some(key) = decode_verifying_key(public_key_hex) else {
            return false;
        };
        let Some(signature) = decode_signature(signature_hex) else {
            return false;
        };
        key.verify_strict(&bytes, &signature).is_ok()
    }
}

fn decode_verifying_key(public_key_hex: &str) -> Option<VerifyingKey> {
    let bytes = hex::decode(public_key_hex.trim()).ok()?;
    let arr: [u8; 32] = bytes.as_slice().try_into().ok()?;
    VerifyingKey::from_bytes(&arr).ok()
}

fn decode_signature(signature_hex: &str) -> Option<Signature> {
    let bytes = hex::decode(signature_hex.trim()).ok()?;
    Signature::from_slice(&bytes).ok()
}

/// An artifact together with its integrity fingerprint and authorship proof.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedArtifact {
    pub artifact: DecisionArtifact,
    /// Hex SHA-256 of the canonical bytes.
    pub artifact_hash: String,
    pub signature: String,
    pub public_key: String,
}

impl SignedArtifact {
    /// Sign first, then fingerprint the same canonical bytes.
    pub fn seal(artifact: DecisionArtifact, signer: &ArtifactSigner) -> FirewallResult<Self> {
        let signature = signer.sign(&artifact)?;
        let artifact_hash = artifact.canonical_hash()?;
        Ok(Self {
            artifact,
            artifact_hash,
            signature,
            public_key: signer.public_key_hex(),
        })
    }

    pub fn verify(&self) -> bool {
        ArtifactSigner::verify(&self.artifact, &self.signature, &self.public_key)
            && self.artifact.canonical_hash().ok().as_deref() == Some(self.artifact_hash.as_str())
    }
}
