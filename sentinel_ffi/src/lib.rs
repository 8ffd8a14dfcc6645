#![allow(clippy::missing_safety_doc)]

use std::ptr;

use serde_json::Value;

use sentinel_core::{
    confidence_band, normalize_panel, resolve_tier, score_panel, ConfidenceBand, RiskTier,
    SentinelCfg,
};
use sentinel_firewall::{canonical_hash, ArtifactSigner};

/// FFI ABI version for sentinel_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const SENTINEL_FFI_VERSION: u32 = 1;

/// Longest escalation plan representable in `SentinelTierPolicy`.
pub const SENTINEL_MAX_PLAN: usize = 8;

#[no_mangle]
pub extern "C" fn sentinel_ffi_version() -> u32 {
    SENTINEL_FFI_VERSION
}

/// Opaque signer handle exposed over FFI.
#[repr(C)]
pub struct SentinelSigner {
    inner: ArtifactSigner,
}

/// FFI string view (UTF-8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SentinelStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl SentinelStr {
    fn as_str(&self) -> Option<&str> {
        if self.ptr.is_null() {
            return None;
        }
        let bytes = unsafe { std::slice::from_raw_parts(self.ptr, self.len) };
        std::str::from_utf8(bytes).ok()
    }

    fn as_json(&self) -> Option<Value> {
        serde_json::from_str(self.as_str()?).ok()
    }
}

/// Owned byte buffer (hex strings, hashes). Free with `sentinel_bytes_free`.
#[repr(C)]
pub struct SentinelBytes {
    pub ptr: *mut u8,
    pub len: usize,
}

impl SentinelBytes {
    fn null() -> Self {
        SentinelBytes { ptr: ptr::null_mut(), len: 0 }
    }

    fn from_string(s: String) -> Self {
        let mut boxed = s.into_bytes().into_boxed_slice();
        let ptr = boxed.as_mut_ptr();
        let len = boxed.len();
        std::mem::forget(boxed);
        SentinelBytes { ptr, len }
    }
}

/// Risk tier as a C-friendly enum.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentinelTier {
    Low = 0,
    Medium = 1,
    High = 2,
}

/// Confidence band as a C-friendly enum.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SentinelBand {
    High = 0,
    Medium = 1,
    Low = 2,
    Unsafe = 3,
}

/// Resolved tier policy. Only the first `plan_len` entries of `plan` are meaningful.
#[repr(C)]
pub struct SentinelTierPolicy {
    pub tier: SentinelTier,
    pub threshold: f64,
    pub plan: [u32; SENTINEL_MAX_PLAN],
    pub plan_len: usize,
    pub rc: i32,
}

/// Scores for one validator panel.
#[repr(C)]
pub struct SentinelScores {
    pub agreement: f64,
    pub mean_confidence: f64,
    pub composite: f64,
    pub band: SentinelBand,
    /// Well-formed judgments in the panel.
    pub usable: u32,
    pub rc: i32,
}

fn tier_to_ffi(t: RiskTier) -> SentinelTier {
    match t {
        RiskTier::Low => SentinelTier::Low,
        RiskTier::Medium => SentinelTier::Medium,
        RiskTier::High => SentinelTier::High,
    }
}

fn band_to_ffi(b: ConfidenceBand) -> SentinelBand {
    match b {
        ConfidenceBand::High => SentinelBand::High,
        ConfidenceBand::Medium => SentinelBand::Medium,
        ConfidenceBand::Low => SentinelBand::Low,
        ConfidenceBand::Unsafe => SentinelBand::Unsafe,
    }
}

/// Resolve the default tier policy for a redundancy recommendation.
#[no_mangle]
pub extern "C" fn sentinel_resolve_tier(recommendation: u32) -> SentinelTierPolicy {
    let mut out = SentinelTierPolicy {
        tier: SentinelTier::Low,
        threshold: 0.0,
        plan: [0; SENTINEL_MAX_PLAN],
        plan_len: 0,
        rc: 0,
    };
    let policy = match resolve_tier(recommendation, &SentinelCfg::default()) {
        Ok(p) => p,
        Err(_) => {
            out.rc = -1;
            return out;
        }
    };
    let levels = policy.plan.levels();
    if levels.len() > SENTINEL_MAX_PLAN {
        out.rc = -2;
        return out;
    }
    out.tier = tier_to_ffi(policy.tier);
    out.threshold = policy.threshold;
    out.plan[..levels.len()].copy_from_slice(levels);
    out.plan_len = levels.len();
    out
}

/// Score a raw validator response (bare list, `{results: [...]}`, or one object).
///
/// rc: 0 ok, -1 null/invalid UTF-8, -2 not JSON.
#[no_mangle]
pub extern "C" fn sentinel_score_panel(response_json: SentinelStr) -> SentinelScores {
    let fail = |rc| SentinelScores {
        agreement: 0.0,
        mean_confidence: 0.0,
        composite: 0.0,
        band: SentinelBand::Unsafe,
        usable: 0,
        rc,
    };
    let Some(raw) = response_json.as_str() else {
        return fail(-1);
    };
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return fail(-2);
    };

    let s = score_panel(&normalize_panel(&value));
    SentinelScores {
        agreement: s.agreement,
        mean_confidence: s.mean_confidence,
        composite: s.composite,
        band: band_to_ffi(confidence_band(s.composite)),
        usable: u32::try_from(s.usable).unwrap_or(u32::MAX),
        rc: 0,
    }
}

/// Hex SHA-256 of the canonical serialization of an artifact JSON document.
/// Returns a null buffer on invalid input.
#[no_mangle]
pub extern "C" fn sentinel_canonical_hash(artifact_json: SentinelStr) -> SentinelBytes {
    let Some(value) = artifact_json.as_json() else {
        return SentinelBytes::null();
    };
    match canonical_hash(&value) {
        Ok(h) => SentinelBytes::from_string(h),
        Err(_) => SentinelBytes::null(),
    }
}

/// Verify a hex Ed25519 signature over an artifact's canonical bytes.
/// Returns 1 when valid, 0 for any mismatch or malformed input.
#[no_mangle]
pub extern "C" fn sentinel_verify_artifact(
    artifact_json: SentinelStr,
    signature_hex: SentinelStr,
    public_key_hex: SentinelStr,
) -> u8 {
    let (Some(value), Some(sig), Some(pk)) = (
        artifact_json.as_json(),
        signature_hex.as_str(),
        public_key_hex.as_str(),
    ) else {
        return 0;
    };
    ArtifactSigner::verify(&value, sig, pk) as u8
}

/// Create a signer from a hex 32-byte seed. Returns null if the key is missing or malformed.
#[no_mangle]
pub extern "C" fn sentinel_signer_new(secret_hex: SentinelStr) -> *mut SentinelSigner {
    let Some(secret) = secret_hex.as_str() else {
        return ptr::null_mut();
    };
    match ArtifactSigner::from_secret_hex(secret) {
        Ok(inner) => Box::into_raw(Box::new(SentinelSigner { inner })),
        Err(_) => ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn sentinel_signer_free(h: *mut SentinelSigner) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

/// Hex public key of the signer (64 ASCII bytes).
#[no_mangle]
pub unsafe extern "C" fn sentinel_signer_public_key(h: *const SentinelSigner) -> SentinelBytes {
    if h.is_null() {
        return SentinelBytes::null();
    }
    let handle = &*h;
    SentinelBytes::from_string(handle.inner.public_key_hex())
}

/// Hex signature (128 ASCII bytes) over the canonical form of `artifact_json`.
#[no_mangle]
pub unsafe extern "C" fn sentinel_signer_sign(
    h: *const SentinelSigner,
    artifact_json: SentinelStr,
) -> SentinelBytes {
    if h.is_null() {
        return SentinelBytes::null();
    }
    let handle = &*h;
    let Some(value) = artifact_json.as_json() else {
        return SentinelBytes::null();
    };
    match handle.inner.sign(&value) {
        Ok(sig) => SentinelBytes::from_string(sig),
        Err(_) => SentinelBytes::null(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn sentinel_bytes_free(b: SentinelBytes) {
    if !b.ptr.is_null() {
        let slice_ptr = std::ptr::slice_from_raw_parts_mut(b.ptr, b.len);
        drop(Box::from_raw(slice_ptr));
    }
}
