//! Shared test fixtures: minimal PDF byte streams and self-contained
//! signing identities with structurally valid DER certificates.

use crate::signatures::{LocalKeyTransport, SignatureAlgorithm, SigningTransport};

use chrono::{DateTime, TimeZone, Utc};
use num_bigint::{BigInt, BigUint, Sign};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::RsaPrivateKey;
use simple_asn1::{oid, to_der, ASN1Block, ASN1Class, OID};

/// A minimal PDF with a page tree of `pages` pages.
pub(crate) fn pdf_bytes(pages: usize) -> Vec<u8> {
    let mut out = String::from("%PDF-1.7\n");
    out.push_str("1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    out.push_str(&format!(
        "2 0 obj << /Type /Pages /Count {} >> endobj\n",
        pages
    ));
    for i in 0..pages {
        out.push_str(&format!(
            "{} 0 obj << /Type /Page /Parent 2 0 R >> endobj\n",
            i + 3
        ));
    }
    out.push_str("%%EOF\n");
    out.into_bytes()
}

/// A signing key with a matching certificate.
pub(crate) struct TestIdentity {
    pub cert_der: Vec<u8>,
    pub transport: LocalKeyTransport,
    pub algorithm: SignatureAlgorithm,
}

/// Sign a digest with the identity's own key and algorithm.
pub(crate) fn sign_with(identity: &TestIdentity, digest: &[u8]) -> Vec<u8> {
    identity.transport.sign(digest, identity.algorithm).unwrap()
}

fn rdn(cn: &str) -> ASN1Block {
    ASN1Block::Sequence(
        0,
        vec![ASN1Block::Set(
            0,
            vec![ASN1Block::Sequence(
                0,
                vec![
                    ASN1Block::ObjectIdentifier(0, oid!(2, 5, 4, 3)),
                    ASN1Block::UTF8String(0, cn.to_string()),
                ],
            )],
        )],
    )
}

/// A structurally valid certificate around the given public key info.
/// The outer signature is a dummy; nothing in this crate verifies
/// certificate signatures.
fn build_cert(
    subject_cn: &str,
    serial: u32,
    spki: ASN1Block,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
) -> Vec<u8> {
    let sig_alg = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 1, 11)),
            ASN1Block::Null(0),
        ],
    );
    let tbs = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Explicit(
                ASN1Class::ContextSpecific,
                0,
                BigUint::from(0u8),
                Box::new(ASN1Block::Integer(0, BigInt::from(2))),
            ),
            ASN1Block::Integer(0, BigInt::from(serial)),
            sig_alg.clone(),
            rdn("Test CA"),
            ASN1Block::Sequence(
                0,
                vec![
                    ASN1Block::UTCTime(0, not_before),
                    ASN1Block::UTCTime(0, not_after),
                ],
            ),
            rdn(subject_cn),
            spki,
        ],
    );
    let cert = ASN1Block::Sequence(
        0,
        vec![tbs, sig_alg, ASN1Block::BitString(0, 8, vec![0u8])],
    );
    to_der(&cert).unwrap()
}

fn ec_spki(curve: OID, point: &[u8]) -> ASN1Block {
    ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Sequence(
                0,
                vec![
                    ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 10045, 2, 1)),
                    ASN1Block::ObjectIdentifier(0, curve),
                ],
            ),
            ASN1Block::BitString(0, point.len() * 8, point.to_vec()),
        ],
    )
}

fn rsa_spki(key: &rsa::RsaPublicKey) -> ASN1Block {
    use rsa::traits::PublicKeyParts;
    let n = BigInt::from_biguint(Sign::Plus, BigUint::from_bytes_be(&key.n().to_bytes_be()));
    let e = BigInt::from_biguint(Sign::Plus, BigUint::from_bytes_be(&key.e().to_bytes_be()));
    let rsa_pub = ASN1Block::Sequence(
        0,
        vec![ASN1Block::Integer(0, n), ASN1Block::Integer(0, e)],
    );
    let der = to_der(&rsa_pub).unwrap();
    ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Sequence(
                0,
                vec![
                    ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 1, 1)),
                    ASN1Block::Null(0),
                ],
            ),
            ASN1Block::BitString(0, der.len() * 8, der),
        ],
    )
}

fn default_validity() -> (DateTime<Utc>, DateTime<Utc>) {
    (
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2045, 1, 1, 0, 0, 0).unwrap(),
    )
}

pub(crate) fn p256_identity() -> TestIdentity {
    let key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
    let point = key.verifying_key().to_encoded_point(false);
    let (not_before, not_after) = default_validity();
    let cert_der = build_cert(
        "Test Signer",
        0x1234,
        ec_spki(oid!(1, 2, 840, 10045, 3, 1, 7), point.as_bytes()),
        not_before,
        not_after,
    );
    TestIdentity {
        cert_der,
        transport: LocalKeyTransport::from_p256(key),
        algorithm: SignatureAlgorithm::EcdsaP256Sha256,
    }
}

pub(crate) fn p256_identity_expired() -> TestIdentity {
    let key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
    let point = key.verifying_key().to_encoded_point(false);
    let cert_der = build_cert(
        "Expired Signer",
        0x1235,
        ec_spki(oid!(1, 2, 840, 10045, 3, 1, 7), point.as_bytes()),
        Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
    );
    TestIdentity {
        cert_der,
        transport: LocalKeyTransport::from_p256(key),
        algorithm: SignatureAlgorithm::EcdsaP256Sha256,
    }
}

pub(crate) fn p384_identity() -> TestIdentity {
    let key = p384::ecdsa::SigningKey::random(&mut rand::thread_rng());
    let point = key.verifying_key().to_encoded_point(false);
    let (not_before, not_after) = default_validity();
    let cert_der = build_cert(
        "Test Signer",
        0x2345,
        ec_spki(oid!(1, 3, 132, 0, 34), point.as_bytes()),
        not_before,
        not_after,
    );
    TestIdentity {
        cert_der,
        transport: LocalKeyTransport::from_p384(key),
        algorithm: SignatureAlgorithm::EcdsaP384Sha384,
    }
}

pub(crate) fn p521_identity() -> TestIdentity {
    let key = p521::ecdsa::SigningKey::random(&mut rand::thread_rng());
    // p521 0.13 gates `SigningKey::verifying_key()` behind a feature that does
    // not exist in this release; `VerifyingKey::from(&key)` is the same thing.
    let point = p521::ecdsa::VerifyingKey::from(&key).to_encoded_point(false);
    let (not_before, not_after) = default_validity();
    let cert_der = build_cert(
        "Test Signer",
        0x3456,
        ec_spki(oid!(1, 3, 132, 0, 35), point.as_bytes()),
        not_before,
        not_after,
    );
    TestIdentity {
        cert_der,
        transport: LocalKeyTransport::from_p521(key),
        algorithm: SignatureAlgorithm::EcdsaP521Sha512,
    }
}

// Key generation dominates debug-build test time, so every RSA identity
// shares one key.
fn shared_rsa_key() -> RsaPrivateKey {
    use std::sync::OnceLock;
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut rand::thread_rng(), 2048).unwrap())
        .clone()
}

pub(crate) fn rsa_identity() -> TestIdentity {
    let key = shared_rsa_key();
    let (not_before, not_after) = default_validity();
    let cert_der = build_cert(
        "Test Signer",
        0x4567,
        rsa_spki(&key.to_public_key()),
        not_before,
        not_after,
    );
    TestIdentity {
        cert_der,
        transport: LocalKeyTransport::from_rsa(key),
        algorithm: SignatureAlgorithm::RsaPkcs1Sha256,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signatures::{CertificateInfo, KeyAlgorithm};

    #[test]
    fn test_built_certificates_parse() {
        let identity = p256_identity();
        let cert = CertificateInfo::from_der(&identity.cert_der).unwrap();
        assert_eq!(cert.common_name().as_deref(), Some("Test Signer"));
        assert_eq!(cert.key_algorithm, KeyAlgorithm::Ecdsa);
        assert_eq!(cert.key_size, 256);
        assert_eq!(cert.serial_number, "1234");
        assert!(cert.not_before < cert.not_after);
    }

    #[test]
    fn test_rsa_certificate_key_size() {
        let identity = rsa_identity();
        let cert = CertificateInfo::from_der(&identity.cert_der).unwrap();
        assert_eq!(cert.key_algorithm, KeyAlgorithm::Rsa);
        assert_eq!(cert.key_size, 2048);
    }
}
