// Copyright (c) 2024 The Botho Foundation

#![deny(unsafe_code)]

//! Secp256k1 signing and signer recovery for SGO forward delegations.
//!
//! Accounts are identified by Ethereum-style 20-byte addresses: the last 20
//! bytes of `keccak256(x || y)` over the uncompressed public key. A forward
//! delegation is authorized by signing a 32-byte keccak digest directly (no
//! EIP-191 prefix) and the ledger recovers the signer from `(v, r, s)`.
//!
//! # Examples
//!
//! ```
//! use sgo_crypto_secp256k1::{keccak256, recover_address, Secp256k1Keypair};
//!
//! let mut key = [0u8; 32];
//! key[31] = 1;
//! let keypair = Secp256k1Keypair::from_bytes(&key).unwrap();
//!
//! let digest = keccak256(&[b"setup forward".as_slice(), &[0x11; 20]]);
//! let signature = keypair.sign_hash(&digest).unwrap();
//!
//! assert_eq!(recover_address(&digest, &signature).unwrap(), keypair.address());
//! ```

use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;
use sha3::{Digest, Keccak256};
use zeroize::ZeroizeOnDrop;

/// Errors that can occur during key and signature operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Signing failed: {0}")]
    SigningError(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid recovery id {0}")]
    InvalidRecoveryId(u8),

    #[error("Public key recovery failed")]
    RecoveryFailed,
}

/// Length of a serialized `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Offset added to the recovery id in the `v` byte, as produced by
/// Ethereum tooling.
const V_OFFSET: u8 = 27;

/// Compute keccak-256 over the concatenation of `parts`.
pub fn keccak256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Derive the 20-byte address for an uncompressed (65-byte, `0x04`-prefixed)
/// public key.
pub fn address_from_public_key(public_key: &[u8; 65]) -> [u8; 20] {
    let hash = keccak256(&[&public_key[1..]]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// A recoverable ECDSA signature split into its `(v, r, s)` parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecoverableSignature {
    /// Recovery byte, either `27`/`28` or the raw `0`/`1` id.
    pub v: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl RecoverableSignature {
    /// Build a signature from its parts.
    pub fn new(v: u8, r: [u8; 32], s: [u8; 32]) -> Self {
        Self { v, r, s }
    }

    /// Parse a 65-byte `r || s || v` signature.
    pub fn from_bytes(bytes: &[u8; SIGNATURE_LEN]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self { v: bytes[64], r, s }
    }

    /// Parse a hex string (with or without `0x`) holding `r || s || v`.
    pub fn from_hex(input: &str) -> Result<Self, Error> {
        let raw = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(raw).map_err(|e| Error::InvalidEncoding(e.to_string()))?;
        let bytes: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|v: Vec<u8>| {
            Error::InvalidEncoding(format!("expected {SIGNATURE_LEN} bytes, got {}", v.len()))
        })?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Serialize as `r || s || v`.
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(&self.r);
        out[32..64].copy_from_slice(&self.s);
        out[64] = self.v;
        out
    }

    /// Hex encoding of [`Self::to_bytes`], `0x`-prefixed.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    fn recovery_id(&self) -> Result<RecoveryId, Error> {
        let raw = if self.v >= V_OFFSET {
            self.v - V_OFFSET
        } else {
            self.v
        };
        RecoveryId::try_from(raw).map_err(|_| Error::InvalidRecoveryId(self.v))
    }
}

/// A secp256k1 keypair able to authorize forward delegations.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Secp256k1Keypair {
    #[zeroize(skip)] // SigningKey implements its own zeroization
    signing_key: SigningKey,
}

impl core::fmt::Debug for Secp256k1Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Secp256k1Keypair {{ address: 0x{} }}",
            hex::encode(self.address())
        )
    }
}

impl Secp256k1Keypair {
    /// Create a keypair from raw 32-byte private key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, Error> {
        let signing_key =
            SigningKey::from_bytes(bytes.into()).map_err(|_| Error::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Generate a fresh random keypair.
    pub fn random(rng: &mut impl CryptoRngCore) -> Self {
        Self {
            signing_key: SigningKey::random(rng),
        }
    }

    /// Get the public key as uncompressed bytes (65 bytes: 0x04 || x || y).
    pub fn public_key_uncompressed(&self) -> [u8; 65] {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        let mut result = [0u8; 65];
        result.copy_from_slice(point.as_bytes());
        result
    }

    /// The 20-byte address controlled by this keypair.
    pub fn address(&self) -> [u8; 20] {
        address_from_public_key(&self.public_key_uncompressed())
    }

    /// Sign a raw 32-byte digest.
    ///
    /// The returned `v` is the recovery id plus 27.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<RecoverableSignature, Error> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| Error::SigningError(e.to_string()))?;

        let bytes = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(RecoverableSignature {
            v: recovery_id.to_byte() + V_OFFSET,
            r,
            s,
        })
    }
}

/// Recover the uncompressed public key that produced `signature` over `hash`.
pub fn recover_public_key(
    hash: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<[u8; 65], Error> {
    let recovery_id = signature.recovery_id()?;

    let mut r_s = [0u8; 64];
    r_s[..32].copy_from_slice(&signature.r);
    r_s[32..].copy_from_slice(&signature.s);
    let sig = K256Signature::from_slice(&r_s)
        .map_err(|e| Error::InvalidEncoding(e.to_string()))?;

    let verifying_key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id)
        .map_err(|_| Error::RecoveryFailed)?;

    let point = verifying_key.to_encoded_point(false);
    let mut result = [0u8; 65];
    result.copy_from_slice(point.as_bytes());
    Ok(result)
}

/// Recover the address of the key that signed `hash`.
pub fn recover_address(
    hash: &[u8; 32],
    signature: &RecoverableSignature,
) -> Result<[u8; 20], Error> {
    let public_key = recover_public_key(hash, signature)?;
    Ok(address_from_public_key(&public_key))
}
