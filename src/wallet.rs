//! Key management and canonical transaction signing.
//!
//! # Security
//! - Keys are accepted as raw hex or WIF, never both
//! - Key material is never logged, serialized, or exposed via Debug
//! - Intermediate decode buffers are zeroized
//!
//! # Canonical signatures
//! The chain only accepts signatures whose `r`/`s` encodings satisfy a set
//! of sign-bit and non-zero-byte constraints. Low-S normalization alone
//! does not guarantee them, so signing retries with a fresh RFC6979 nonce
//! (attempt counter as additional entropy) until the checks hold, then
//! brute-forces the recovery id.

use k256::ecdsa::hazmat::SignPrimitive;
use k256::ecdsa::{RecoveryId, SigningKey, VerifyingKey};
use k256::FieldBytes;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{TransactionError, TxResult};

/// WIF version byte used by Steem/Hive-family keys.
const WIF_VERSION: u8 = 0x80;

/// Cap on nonce retries. Each canonicality check fails with probability
/// ~1/256, so hitting this cap indicates a broken RNG-free nonce path
/// rather than bad luck.
const MAX_NONCE_ATTEMPTS: u32 = 256;

/// An exclusively-owned secp256k1 signing key.
pub struct PrivateKey {
    signing: SigningKey,
}

impl PrivateKey {
    /// Parse a raw 32-byte private key from hex, with or without a `0x`
    /// prefix.
    pub fn from_hex(hex_key: &str) -> TxResult<Self> {
        let key_hex = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let mut bytes = hex::decode(key_hex)
            .map_err(|e| TransactionError::Configuration(format!("private key is not valid hex: {}", e)))?;
        let parsed = SigningKey::from_slice(&bytes)
            .map_err(|_| TransactionError::Configuration("invalid secp256k1 private key".to_string()));
        bytes.zeroize();
        Ok(Self { signing: parsed? })
    }

    /// Parse a wallet-import-format key: base58check, version `0x80`,
    /// double-SHA256 checksum, optional trailing compression flag.
    pub fn from_wif(wif: &str) -> TxResult<Self> {
        let mut raw = bs58::decode(wif)
            .into_vec()
            .map_err(|e| TransactionError::Configuration(format!("WIF is not valid base58: {}", e)))?;
        let parsed = Self::from_wif_bytes(&raw);
        raw.zeroize();
        parsed
    }

    fn from_wif_bytes(raw: &[u8]) -> TxResult<Self> {
        // 1 version + 32 key + 4 checksum, plus 1 for the compression flag.
        if raw.len() != 37 && raw.len() != 38 {
            return Err(TransactionError::Configuration(format!(
                "unexpected WIF length: {} bytes",
                raw.len()
            )));
        }

        let (body, checksum) = raw.split_at(raw.len() - 4);
        let expected = Sha256::digest(Sha256::digest(body));
        if expected[..4] != *checksum {
            return Err(TransactionError::Configuration("WIF checksum mismatch".to_string()));
        }

        if body[0] != WIF_VERSION {
            return Err(TransactionError::Configuration(format!(
                "unexpected WIF version byte: 0x{:02x}",
                body[0]
            )));
        }

        if body.len() == 34 && body[33] != 0x01 {
            return Err(TransactionError::Configuration("unexpected WIF compression flag".to_string()));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&body[1..33]);
        let parsed = SigningKey::from_slice(&key)
            .map_err(|_| TransactionError::Configuration("WIF does not encode a valid secp256k1 key".to_string()));
        key.zeroize();
        Ok(Self { signing: parsed? })
    }

    /// Compressed SEC1 public key (33 bytes).
    pub fn public_key(&self) -> [u8; 33] {
        let sec1 = self.signing.verifying_key().to_sec1_bytes();
        let mut out = [0u8; 33];
        out.copy_from_slice(&sec1[..33]);
        out
    }

    /// Produce a canonical, publicly-recoverable signature over a 32-byte
    /// digest: `r (32) ‖ s (32) ‖ recovery byte` = 65 bytes.
    ///
    /// The recovery byte is `27 + recid + 4`; this crate only ever derives
    /// compressed public keys, so the uncompressed offset never applies.
    pub fn sign_canonical(&self, digest: &[u8; 32]) -> TxResult<[u8; 65]> {
        let z = FieldBytes::clone_from_slice(digest);

        for attempt in 0..MAX_NONCE_ATTEMPTS {
            let counter = attempt.to_be_bytes();
            let ad: &[u8] = if attempt == 0 { &[] } else { &counter };

            let (signature, _) = self
                .signing
                .as_nonzero_scalar()
                .try_sign_prehashed_rfc6979::<Sha256>(&z, ad)
                .map_err(|e| TransactionError::Signing(e.to_string()))?;
            let signature = signature.normalize_s().unwrap_or(signature);

            let mut compact = [0u8; 64];
            compact.copy_from_slice(&signature.to_bytes());
            if !is_canonical(&compact) {
                continue;
            }

            for candidate in 0u8..4 {
                let Some(recid) = RecoveryId::from_byte(candidate) else {
                    continue;
                };
                let Ok(recovered) = VerifyingKey::recover_from_prehash(digest, &signature, recid)
                else {
                    continue;
                };
                if &recovered == self.signing.verifying_key() {
                    let mut out = [0u8; 65];
                    out[..64].copy_from_slice(&compact);
                    out[64] = 27 + candidate + 4;
                    return Ok(out);
                }
            }

            return Err(TransactionError::Signing(
                "no recovery id reproduces the signing key for a canonical signature".to_string(),
            ));
        }

        Err(TransactionError::Signing(format!(
            "no canonical signature after {} nonce attempts",
            MAX_NONCE_ATTEMPTS
        )))
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        self.signing.verifying_key()
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only the public half is ever printable.
        f.debug_struct("PrivateKey")
            .field("public_key", &hex::encode(self.public_key()))
            .finish()
    }
}

/// The six byte-level constraints the chain's `is_canonical` check
/// enforces on `r ‖ s`.
pub(crate) fn is_canonical(sig: &[u8; 64]) -> bool {
    !(sig[0] & 0x80 != 0
        || sig[0] == 0
        || sig[1] & 0x80 != 0
        || sig[32] & 0x80 != 0
        || sig[32] == 0
        || sig[33] & 0x80 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    // Classic base58check test pair: same secret encoded raw and as WIF.
    const WIF_KEY_HEX: &str = "0c28fca386c7a227600b2fe50b7cae11ec86d3bf1fbe471be89827e19d72aa1d";
    const WIF_KEY: &str = "5HueCGU8rMjxEXxiPuD5BDku4MkFqeZyd4dZ1jvhTVqvbTLvyTJ";

    #[test]
    fn test_from_hex_with_and_without_prefix() {
        let plain = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let prefixed = PrivateKey::from_hex(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
        assert_eq!(plain.public_key(), prefixed.public_key());
    }

    #[test]
    fn test_invalid_hex_key_rejected() {
        let result = PrivateKey::from_hex("zz");
        assert!(matches!(result, Err(TransactionError::Configuration(_))));
    }

    #[test]
    fn test_wif_decodes_to_known_key() {
        let from_wif = PrivateKey::from_wif(WIF_KEY).unwrap();
        let from_hex = PrivateKey::from_hex(WIF_KEY_HEX).unwrap();
        assert_eq!(from_wif.public_key(), from_hex.public_key());
    }

    #[test]
    fn test_wif_checksum_mismatch_rejected() {
        // Flip the final character; the checksum no longer matches.
        let mut corrupted = WIF_KEY.to_string();
        corrupted.pop();
        corrupted.push('K');
        let result = PrivateKey::from_wif(&corrupted);
        assert!(matches!(result, Err(TransactionError::Configuration(_))));
    }

    #[test]
    fn test_signature_is_canonical_and_65_bytes() {
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let digest = [0x42u8; 32];
        let signature = key.sign_canonical(&digest).unwrap();

        let mut compact = [0u8; 64];
        compact.copy_from_slice(&signature[..64]);
        assert!(is_canonical(&compact));
        assert!((31..=34).contains(&signature[64]));
    }

    #[test]
    fn test_signature_recovers_public_key() {
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let digest = [0x07u8; 32];
        let signature = key.sign_canonical(&digest).unwrap();

        let recid = RecoveryId::from_byte(signature[64] - 31).unwrap();
        let sig = k256::ecdsa::Signature::from_slice(&signature[..64]).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(&digest, &sig, recid).unwrap();
        assert_eq!(&recovered, key.verifying_key());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let digest = [0x11u8; 32];
        assert_eq!(key.sign_canonical(&digest).unwrap(), key.sign_canonical(&digest).unwrap());
    }

    #[test]
    fn test_canonicality_checks() {
        let mut sig = [0x01u8; 64];
        assert!(is_canonical(&sig));

        sig[0] = 0x80;
        assert!(!is_canonical(&sig));
        sig[0] = 0x00;
        assert!(!is_canonical(&sig));
        sig[0] = 0x01;

        sig[32] = 0x00;
        assert!(!is_canonical(&sig));
        sig[32] = 0x01;
        sig[33] = 0xF0;
        assert!(!is_canonical(&sig));
    }

    #[test]
    fn test_debug_never_prints_secret() {
        let key = PrivateKey::from_hex(TEST_PRIVATE_KEY).unwrap();
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains(TEST_PRIVATE_KEY));
    }
}
