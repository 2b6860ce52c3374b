//! Signature verification.
//!
//! Verification is a three-part independent check (signature-data
//! sanity, certificate validity, algorithm support plus cryptographic
//! correctness) and all three parts must pass for `is_valid`. It never
//! throws:
//! every call returns a [`VerificationResult`], even for maximally
//! invalid input. Nothing is mutated and nothing is cached, so verifying
//! many signatures in parallel needs no locking.

use crate::signatures::types::{
    CertificateInfo, ExtractedSignature, HashAlgorithm, KeyAlgorithm, SignatureAlgorithm,
    VerificationResult,
};

use chrono::{DateTime, Utc};
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};
use signature::hazmat::PrehashVerifier;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Minimum plausible signature length in bytes.
const MIN_SIGNATURE_LEN: usize = 64;
/// Minimum plausible document hash length in bytes.
const MIN_HASH_LEN: usize = 32;

/// Verifies extracted signatures.
#[derive(Debug, Default)]
pub struct SignatureVerifier;

impl SignatureVerifier {
    /// Create a new verifier.
    pub fn new() -> Self {
        Self
    }

    /// Verify a signature against the wall clock.
    pub fn verify(&self, signature: &ExtractedSignature) -> VerificationResult {
        self.verify_at(signature, Utc::now())
    }

    /// Verify every signature of a document independently.
    pub fn verify_all(&self, signatures: &[ExtractedSignature]) -> Vec<VerificationResult> {
        signatures.iter().map(|s| self.verify(s)).collect()
    }

    /// Verify a signature against an explicit clock.
    ///
    /// Identical inputs yield identical results; the result is derived
    /// and never persisted.
    pub fn verify_at(
        &self,
        signature: &ExtractedSignature,
        at: DateTime<Utc>,
    ) -> VerificationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut certificate_valid = true;
        let mut document_intact = true;

        // Part 1: signature-data sanity.
        let sane = signature.signature_data.len() >= MIN_SIGNATURE_LEN
            && signature.document_hash.len() >= MIN_HASH_LEN
            && !signature.certificate_chain.is_empty();
        if !sane {
            document_intact = false;
            errors.push("Invalid signature data".to_string());
        }

        // Part 2: certificate validity. Expired by any margin fails;
        // there is no grace window.
        match signature.leaf() {
            Some(leaf) if !leaf.der_data.is_empty() && leaf.is_valid_at(at) => {
                if leaf.subject == leaf.issuer {
                    warnings.push("Certificate is self-signed".to_string());
                }
            }
            _ => {
                certificate_valid = false;
                errors.push("Invalid certificate".to_string());
            }
        }

        // Part 3: algorithm support and cryptographic correctness.
        match signature.signature_algorithm.algorithm {
            None => {
                document_intact = false;
                errors.push("Unsupported signature algorithm".to_string());
            }
            Some(algorithm) => {
                let mut rejected = false;
                if signature.signature_algorithm.hash_algorithm
                    != Some(algorithm.hash_algorithm())
                {
                    document_intact = false;
                    rejected = true;
                    errors.push("Hash algorithm mismatch".to_string());
                }
                match signature.leaf() {
                    Some(leaf) => {
                        if !key_checks(algorithm, leaf, &signature.signature_algorithm.key_size) {
                            document_intact = false;
                            rejected = true;
                            errors.push("Certificate key size mismatch".to_string());
                        }
                        // Mismatches are rejected before any cryptography.
                        if sane && !rejected {
                            if let Err(reason) = verify_raw(
                                leaf,
                                algorithm,
                                &signature.document_hash,
                                &signature.signature_data,
                            ) {
                                document_intact = false;
                                errors.push(format!("Signature verification failed: {}", reason));
                            }
                        }
                    }
                    None => {
                        document_intact = false;
                    }
                }
            }
        }

        if signature.signing_time.is_none() {
            warnings.push("Signature carries no signing time".to_string());
        }

        VerificationResult {
            is_valid: certificate_valid && document_intact && errors.is_empty(),
            certificate_valid,
            document_intact,
            errors,
            warnings,
        }
    }
}

/// The declared key size must equal the certificate's, the key algorithm
/// must match the signature algorithm, and the size itself must be
/// acceptable (RSA at least 2048 bits, ECDSA one of the named curves).
fn key_checks(algorithm: SignatureAlgorithm, leaf: &CertificateInfo, declared: &u32) -> bool {
    if *declared != leaf.key_size {
        return false;
    }
    if algorithm.key_algorithm() != leaf.key_algorithm {
        return false;
    }
    match algorithm.key_algorithm() {
        KeyAlgorithm::Rsa => leaf.key_size >= 2048,
        KeyAlgorithm::Ecdsa => algorithm.curve_bits() == Some(leaf.key_size),
    }
}

/// Recompute the expected signature with the certificate's public key
/// and compare against the supplied bytes.
fn verify_raw(
    leaf: &CertificateInfo,
    algorithm: SignatureAlgorithm,
    document_hash: &[u8],
    signature_data: &[u8],
) -> std::result::Result<(), String> {
    let (_, cert) = X509Certificate::from_der(&leaf.der_data).map_err(|e| e.to_string())?;
    let parsed = cert.public_key().parsed().map_err(|e| e.to_string())?;
    match parsed {
        PublicKey::RSA(rsa_key) => {
            let key = RsaPublicKey::new(
                BigUint::from_bytes_be(rsa_key.modulus),
                BigUint::from_bytes_be(rsa_key.exponent),
            )
            .map_err(|e| e.to_string())?;
            let padding = match algorithm.hash_algorithm() {
                HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
                HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
            };
            key.verify(padding, document_hash, signature_data)
                .map_err(|e| e.to_string())
        }
        PublicKey::EC(point) => match algorithm {
            SignatureAlgorithm::EcdsaP256Sha256 => {
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(point.data())
                    .map_err(|e| e.to_string())?;
                let sig =
                    p256::ecdsa::Signature::from_der(signature_data).map_err(|e| e.to_string())?;
                key.verify_prehash(document_hash, &sig).map_err(|e| e.to_string())
            }
            SignatureAlgorithm::EcdsaP384Sha384 => {
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(point.data())
                    .map_err(|e| e.to_string())?;
                let sig =
                    p384::ecdsa::Signature::from_der(signature_data).map_err(|e| e.to_string())?;
                key.verify_prehash(document_hash, &sig).map_err(|e| e.to_string())
            }
            SignatureAlgorithm::EcdsaP521Sha512 => {
                let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(point.data())
                    .map_err(|e| e.to_string())?;
                let sig =
                    p521::ecdsa::Signature::from_der(signature_data).map_err(|e| e.to_string())?;
                key.verify_prehash(document_hash, &sig).map_err(|e| e.to_string())
            }
            _ => Err("certificate key does not match algorithm".to_string()),
        },
        _ => Err("unsupported public key algorithm".to_string()),
    }
}
