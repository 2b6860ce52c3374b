//! Signature types and data structures.

use crate::error::{Error, Result};
use crate::document::PdfDocument;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Hash algorithm used when digesting the signed byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HashAlgorithm {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Hash a byte slice.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }
}

/// Asymmetric key algorithm of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyAlgorithm {
    /// RSA
    Rsa,
    /// ECDSA over a NIST prime curve
    Ecdsa,
}

/// The signature algorithms this subsystem accepts.
///
/// These six identifiers are the only values ever valid anywhere in the
/// subsystem; everything else is rejected during verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256
    RsaPkcs1Sha256,
    /// RSA PKCS#1 v1.5 with SHA-384
    RsaPkcs1Sha384,
    /// RSA PKCS#1 v1.5 with SHA-512
    RsaPkcs1Sha512,
    /// ECDSA over P-256 with SHA-256
    EcdsaP256Sha256,
    /// ECDSA over P-384 with SHA-384
    EcdsaP384Sha384,
    /// ECDSA over P-521 with SHA-512
    EcdsaP521Sha512,
}

impl SignatureAlgorithm {
    /// Every supported algorithm, in a fixed order.
    pub const ALL: [SignatureAlgorithm; 6] = [
        SignatureAlgorithm::RsaPkcs1Sha256,
        SignatureAlgorithm::RsaPkcs1Sha384,
        SignatureAlgorithm::RsaPkcs1Sha512,
        SignatureAlgorithm::EcdsaP256Sha256,
        SignatureAlgorithm::EcdsaP384Sha384,
        SignatureAlgorithm::EcdsaP521Sha512,
    ];

    /// The hash algorithm this signature algorithm is defined over.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            SignatureAlgorithm::RsaPkcs1Sha256 | SignatureAlgorithm::EcdsaP256Sha256 => {
                HashAlgorithm::Sha256
            }
            SignatureAlgorithm::RsaPkcs1Sha384 | SignatureAlgorithm::EcdsaP384Sha384 => {
                HashAlgorithm::Sha384
            }
            SignatureAlgorithm::RsaPkcs1Sha512 | SignatureAlgorithm::EcdsaP521Sha512 => {
                HashAlgorithm::Sha512
            }
        }
    }

    /// The key algorithm this signature algorithm requires.
    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            SignatureAlgorithm::RsaPkcs1Sha256
            | SignatureAlgorithm::RsaPkcs1Sha384
            | SignatureAlgorithm::RsaPkcs1Sha512 => KeyAlgorithm::Rsa,
            _ => KeyAlgorithm::Ecdsa,
        }
    }

    /// Curve size in bits for the ECDSA variants, `None` for RSA (any
    /// size from 2048 bits up is acceptable).
    pub fn curve_bits(&self) -> Option<u32> {
        match self {
            SignatureAlgorithm::EcdsaP256Sha256 => Some(256),
            SignatureAlgorithm::EcdsaP384Sha384 => Some(384),
            SignatureAlgorithm::EcdsaP521Sha512 => Some(521),
            _ => None,
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::RsaPkcs1Sha256 => "RSA-PKCS1-SHA256",
            SignatureAlgorithm::RsaPkcs1Sha384 => "RSA-PKCS1-SHA384",
            SignatureAlgorithm::RsaPkcs1Sha512 => "RSA-PKCS1-SHA512",
            SignatureAlgorithm::EcdsaP256Sha256 => "ECDSA-P256-SHA256",
            SignatureAlgorithm::EcdsaP384Sha384 => "ECDSA-P384-SHA384",
            SignatureAlgorithm::EcdsaP521Sha512 => "ECDSA-P521-SHA512",
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The algorithm triple declared by an extracted signature.
///
/// Extraction is purely structural, so the triple may be internally
/// inconsistent; the verifier rejects mismatches. `None` components mean
/// the embedded identifier did not map to anything this subsystem
/// supports.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmInfo {
    /// The declared signature algorithm, when recognized.
    pub algorithm: Option<SignatureAlgorithm>,
    /// The declared digest algorithm, when recognized.
    pub hash_algorithm: Option<HashAlgorithm>,
    /// Key size in bits declared by the signer certificate.
    pub key_size: u32,
}

/// A certificate decoded from the embedded chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateInfo {
    /// Subject distinguished name.
    pub subject: String,
    /// Issuer distinguished name.
    pub issuer: String,
    /// Serial number as a hex string.
    pub serial_number: String,
    /// Start of the validity window.
    pub not_before: DateTime<Utc>,
    /// End of the validity window.
    pub not_after: DateTime<Utc>,
    /// Public key algorithm.
    pub key_algorithm: KeyAlgorithm,
    /// Public key size in bits.
    pub key_size: u32,
    /// The DER-encoded certificate.
    pub der_data: Vec<u8>,
}

impl CertificateInfo {
    /// Decode a DER certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::InvalidCertificate(e.to_string()))?;

        let validity = cert.validity();
        let not_before = DateTime::<Utc>::from_timestamp(validity.not_before.timestamp(), 0)
            .ok_or_else(|| Error::InvalidCertificate("notBefore out of range".into()))?;
        let not_after = DateTime::<Utc>::from_timestamp(validity.not_after.timestamp(), 0)
            .ok_or_else(|| Error::InvalidCertificate("notAfter out of range".into()))?;
        if not_before > not_after {
            return Err(Error::InvalidCertificate(
                "notBefore is after notAfter".into(),
            ));
        }

        let spki = cert.public_key();
        let (key_algorithm, key_size) = match spki.parsed() {
            Ok(PublicKey::RSA(rsa)) => (KeyAlgorithm::Rsa, modulus_bits(rsa.modulus)),
            Ok(PublicKey::EC(_)) => {
                let curve = spki
                    .algorithm
                    .parameters
                    .as_ref()
                    .and_then(|p| p.as_oid().ok())
                    .map(|oid| oid.to_id_string());
                let bits = match curve.as_deref() {
                    Some("1.2.840.10045.3.1.7") => 256,
                    Some("1.3.132.0.34") => 384,
                    Some("1.3.132.0.35") => 521,
                    _ => 0,
                };
                (KeyAlgorithm::Ecdsa, bits)
            }
            _ => {
                return Err(Error::InvalidCertificate(
                    "unsupported public key algorithm".into(),
                ))
            }
        };

        Ok(Self {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial_number: cert.raw_serial_as_string().replace(':', ""),
            not_before,
            not_after,
            key_algorithm,
            key_size,
            der_data: der.to_vec(),
        })
    }

    /// Whether `at` falls inside the validity window.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    /// The `CN` component of the subject, when present.
    pub fn common_name(&self) -> Option<String> {
        self.subject.split(',').find_map(|part| {
            part.trim()
                .strip_prefix("CN=")
                .map(|cn| cn.to_string())
        })
    }
}

fn modulus_bits(modulus: &[u8]) -> u32 {
    let stripped: &[u8] = match modulus.iter().position(|&b| b != 0) {
        Some(i) => &modulus[i..],
        None => return 0,
    };
    stripped.len() as u32 * 8 - stripped[0].leading_zeros()
}

/// A signature decoded out of a signed document.
///
/// Ephemeral: computed per verification request and discarded. No
/// cryptographic judgement has been made yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedSignature {
    /// Position in the document's signature list.
    pub signature_index: usize,
    /// Name of the field the signature is bound to.
    pub field_name: String,
    /// Signer name from the leaf certificate.
    pub signer_name: Option<String>,
    /// Signing time from the signed attributes.
    pub signing_time: Option<DateTime<Utc>>,
    /// Certificate chain, leaf first.
    pub certificate_chain: Vec<CertificateInfo>,
    /// The declared algorithm triple.
    pub signature_algorithm: AlgorithmInfo,
    /// Raw signature bytes.
    pub signature_data: Vec<u8>,
    /// Hash over the signed byte range.
    pub document_hash: Vec<u8>,
}

impl ExtractedSignature {
    /// The signer (leaf) certificate.
    pub fn leaf(&self) -> Option<&CertificateInfo> {
        self.certificate_chain.first()
    }
}

/// Result of verifying one signature.
///
/// Recomputed on every call; trust decisions are never cached.
/// `is_valid` is the sole authoritative field; an empty `errors` list by
/// itself proves nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    /// Whether every check passed.
    pub is_valid: bool,
    /// Whether the signer certificate is currently valid.
    pub certificate_valid: bool,
    /// Whether the signature matches the document hash.
    pub document_intact: bool,
    /// Failure descriptions, empty on success.
    pub errors: Vec<String>,
    /// Non-fatal observations.
    pub warnings: Vec<String>,
}

/// Outcome of a signing call.
///
/// Signing fails open: when the transport is missing, disabled or
/// broken, the original document comes back unsigned as `Skipped` rather
/// than an error. Callers must check the variant, since a returned
/// document alone does not mean a signature was produced.
#[derive(Debug)]
pub enum SigningOutcome {
    /// The document now carries the new signature.
    Signed(PdfDocument),
    /// Signing did not happen; the document is unchanged.
    Skipped {
        /// The original document.
        document: PdfDocument,
        /// Why signing was skipped.
        reason: SkipReason,
    },
}

impl SigningOutcome {
    /// Whether a signature was produced.
    pub fn was_signed(&self) -> bool {
        matches!(self, SigningOutcome::Signed(_))
    }

    /// The document, signed or not.
    pub fn document(&self) -> &PdfDocument {
        match self {
            SigningOutcome::Signed(doc) => doc,
            SigningOutcome::Skipped { document, .. } => document,
        }
    }

    /// Consume the outcome and return the document.
    pub fn into_document(self) -> PdfDocument {
        match self {
            SigningOutcome::Signed(doc) => doc,
            SigningOutcome::Skipped { document, .. } => document,
        }
    }
}

/// Why a signing call skipped instead of signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Signing is disabled by configuration.
    Disabled,
    /// No signing transport is wired in.
    NoTransport,
    /// The transport failed during the attempt.
    TransportFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Disabled => f.write_str("signing disabled by configuration"),
            SkipReason::NoTransport => f.write_str("no signing transport configured"),
            SkipReason::TransportFailed(e) => write!(f, "transport failed: {}", e),
        }
    }
}
