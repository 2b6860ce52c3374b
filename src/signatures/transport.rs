//! The signing transport: where the private key lives.
//!
//! The embedder never touches key material. It hands a digest to a
//! [`SigningTransport`] and gets signature bytes back; whether the key
//! sits in a local file or behind a cloud HSM is the caller's wiring
//! decision. The crate ships the local flavor; an HSM-backed transport
//! implements the same one-method trait outside this crate.

use crate::signatures::types::{KeyAlgorithm, SignatureAlgorithm};

use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Sha256, Sha384, Sha512};
use signature::hazmat::PrehashSigner;

/// Errors a signing transport can fail with.
///
/// The embedder treats every one of these as "no signature produced" and
/// returns the document unsigned; none of them abort the signing call.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport cannot be reached or is not configured.
    #[error("signing transport unavailable: {0}")]
    Unavailable(String),

    /// The key material could not be loaded.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The held key cannot produce this kind of signature.
    #[error("key does not support {0}")]
    UnsupportedAlgorithm(SignatureAlgorithm),

    /// The digest length does not match the requested algorithm.
    #[error("digest of {actual} bytes does not match {algorithm}")]
    DigestMismatch {
        /// The requested algorithm
        algorithm: SignatureAlgorithm,
        /// Length of the digest that was passed in
        actual: usize,
    },

    /// The signing operation itself failed.
    #[error("signing operation failed: {0}")]
    Signing(String),
}

/// A capability that signs a precomputed digest.
///
/// Exactly one operation; implementations must not retry internally.
/// Retrying is the caller's decision.
pub trait SigningTransport: Send + Sync {
    /// Sign `digest` with the held private key using `algorithm`.
    fn sign(
        &self,
        digest: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> std::result::Result<Vec<u8>, TransportError>;
}

enum KeyMaterial {
    Rsa(RsaPrivateKey),
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
}

/// A transport backed by key material held in process memory, as loaded
/// from a local certificate/key file.
pub struct LocalKeyTransport {
    key: KeyMaterial,
}

impl std::fmt::Debug for LocalKeyTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.key {
            KeyMaterial::Rsa(_) => "RSA",
            KeyMaterial::P256(_) => "P-256",
            KeyMaterial::P384(_) => "P-384",
            KeyMaterial::P521(_) => "P-521",
        };
        f.debug_struct("LocalKeyTransport")
            .field("key", &format!("{} [REDACTED]", kind))
            .finish()
    }
}

impl LocalKeyTransport {
    /// Wrap an RSA private key.
    pub fn from_rsa(key: RsaPrivateKey) -> Self {
        Self {
            key: KeyMaterial::Rsa(key),
        }
    }

    /// Wrap a P-256 signing key.
    pub fn from_p256(key: p256::ecdsa::SigningKey) -> Self {
        Self {
            key: KeyMaterial::P256(key),
        }
    }

    /// Wrap a P-384 signing key.
    pub fn from_p384(key: p384::ecdsa::SigningKey) -> Self {
        Self {
            key: KeyMaterial::P384(key),
        }
    }

    /// Wrap a P-521 signing key.
    pub fn from_p521(key: p521::ecdsa::SigningKey) -> Self {
        Self {
            key: KeyMaterial::P521(key),
        }
    }

    /// Load a private key from PKCS#8 DER, trying RSA and the three
    /// supported curves in turn.
    pub fn from_pkcs8_der(der: &[u8]) -> std::result::Result<Self, TransportError> {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(Self::from_rsa(key));
        }
        if let Ok(key) = p256::ecdsa::SigningKey::from_pkcs8_der(der) {
            return Ok(Self::from_p256(key));
        }
        if let Ok(key) = p384::ecdsa::SigningKey::from_pkcs8_der(der) {
            return Ok(Self::from_p384(key));
        }
        // p521 0.13's `ecdsa::SigningKey` is a newtype that does not expose
        // `from_pkcs8_der` directly (unlike p256/p384). Decode the PKCS#8 key
        // into a `SecretKey` first, then build the signing key from its scalar.
        if let Ok(secret) = p521::SecretKey::from_pkcs8_der(der) {
            if let Ok(key) = p521::ecdsa::SigningKey::from_bytes(&secret.to_bytes()) {
                return Ok(Self::from_p521(key));
            }
        }
        Err(TransportError::InvalidKey(
            "not an RSA or supported ECDSA PKCS#8 key".into(),
        ))
    }

    /// The key algorithm this transport can sign with.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self.key {
            KeyMaterial::Rsa(_) => KeyAlgorithm::Rsa,
            _ => KeyAlgorithm::Ecdsa,
        }
    }
}

impl SigningTransport for LocalKeyTransport {
    fn sign(
        &self,
        digest: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> std::result::Result<Vec<u8>, TransportError> {
        if digest.len() != algorithm.hash_algorithm().digest_len() {
            return Err(TransportError::DigestMismatch {
                algorithm,
                actual: digest.len(),
            });
        }
        match (&self.key, algorithm) {
            (KeyMaterial::Rsa(key), SignatureAlgorithm::RsaPkcs1Sha256) => key
                .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
                .map_err(|e| TransportError::Signing(e.to_string())),
            (KeyMaterial::Rsa(key), SignatureAlgorithm::RsaPkcs1Sha384) => key
                .sign(Pkcs1v15Sign::new::<Sha384>(), digest)
                .map_err(|e| TransportError::Signing(e.to_string())),
            (KeyMaterial::Rsa(key), SignatureAlgorithm::RsaPkcs1Sha512) => key
                .sign(Pkcs1v15Sign::new::<Sha512>(), digest)
                .map_err(|e| TransportError::Signing(e.to_string())),
            (KeyMaterial::P256(key), SignatureAlgorithm::EcdsaP256Sha256) => {
                let sig: p256::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| TransportError::Signing(e.to_string()))?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            (KeyMaterial::P384(key), SignatureAlgorithm::EcdsaP384Sha384) => {
                let sig: p384::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| TransportError::Signing(e.to_string()))?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            (KeyMaterial::P521(key), SignatureAlgorithm::EcdsaP521Sha512) => {
                let sig: p521::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| TransportError::Signing(e.to_string()))?;
                Ok(sig.to_der().as_bytes().to_vec())
            }
            _ => Err(TransportError::UnsupportedAlgorithm(algorithm)),
        }
    }
}
