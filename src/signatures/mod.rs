//! PDF digital signatures.
//!
//! This module provides the signing-time and verification-time half of
//! the subsystem:
//!
//! - **Embedding**: hash the covered byte range, obtain the raw signature
//!   from a pluggable [`SigningTransport`], assemble a PKCS#7 container
//!   and write it into the document ([`SignatureEmbedder`])
//! - **Extraction**: decode embedded signatures into typed form without
//!   any cryptographic judgement ([`SignatureExtractor`])
//! - **Verification**: certificate window, algorithm support and
//!   cryptographic correctness, with accumulated errors instead of
//!   exceptions ([`SignatureVerifier`])
//!
//! ## Example
//!
//! ```ignore
//! use pdf_signet::signatures::{
//!     LocalKeyTransport, SignatureEmbedder, SignatureExtractor,
//!     SignatureVerifier, SignerIdentity, SignatureAlgorithm,
//! };
//! use pdf_signet::SigningConfig;
//!
//! let transport = LocalKeyTransport::from_pkcs8_der(&key_der)?;
//! let embedder = SignatureEmbedder::new(
//!     SignerIdentity::new(cert_der),
//!     Box::new(transport),
//!     SigningConfig::default(),
//! );
//! let outcome = embedder.sign_document(doc, "Signature1", SignatureAlgorithm::RsaPkcs1Sha256)?;
//! if !outcome.was_signed() {
//!     // fail-open: the document came back unsigned
//! }
//! ```

pub mod byterange;
mod embedder;
mod extractor;
mod pkcs7;
mod transport;
mod types;
mod verifier;

pub use byterange::ByteRange;
pub use embedder::{SignatureEmbedder, SignerIdentity};
pub use extractor::SignatureExtractor;
pub use transport::{LocalKeyTransport, SigningTransport, TransportError};
pub use types::{
    AlgorithmInfo, CertificateInfo, ExtractedSignature, HashAlgorithm, KeyAlgorithm,
    SignatureAlgorithm, SigningOutcome, SkipReason, VerificationResult,
};
pub use verifier::SignatureVerifier;

#[cfg(test)]
mod tests {
    //! End-to-end flow: author, sign, extract, verify.

    use super::*;
    use crate::config::SigningConfig;
    use crate::document::PdfDocument;
    use crate::fields;
    use crate::testutil;

    fn sign_and_reparse(
        identity: testutil::TestIdentity,
        algorithm: SignatureAlgorithm,
    ) -> PdfDocument {
        let mut doc = PdfDocument::parse(&testutil::pdf_bytes(2)).unwrap();
        let field = fields::create_default_field(&doc).unwrap();
        doc.add_signature_field(field).unwrap();

        let embedder = SignatureEmbedder::new(
            SignerIdentity::new(identity.cert_der),
            Box::new(identity.transport),
            SigningConfig::default().with_reason("Integration test"),
        );
        let outcome = embedder
            .sign_document(doc, "Signature1", algorithm)
            .unwrap();
        assert!(outcome.was_signed());
        // Go through bytes to prove the signature survives a re-parse.
        PdfDocument::parse(outcome.document().as_bytes()).unwrap()
    }

    fn assert_round_trip_valid(doc: &PdfDocument, algorithm: SignatureAlgorithm) {
        let extracted = SignatureExtractor::new().extract(doc);
        assert_eq!(extracted.len(), 1);
        let sig = extracted[0].as_ref().unwrap();
        assert_eq!(sig.signature_algorithm.algorithm, Some(algorithm));

        let result = SignatureVerifier::new().verify(sig);
        assert!(
            result.is_valid,
            "{} verification failed: {:?}",
            algorithm, result.errors
        );
        assert!(result.certificate_valid);
        assert!(result.document_intact);
    }

    #[test]
    fn test_end_to_end_p256() {
        let doc = sign_and_reparse(
            testutil::p256_identity(),
            SignatureAlgorithm::EcdsaP256Sha256,
        );
        assert_round_trip_valid(&doc, SignatureAlgorithm::EcdsaP256Sha256);
    }

    #[test]
    fn test_end_to_end_p384() {
        let doc = sign_and_reparse(
            testutil::p384_identity(),
            SignatureAlgorithm::EcdsaP384Sha384,
        );
        assert_round_trip_valid(&doc, SignatureAlgorithm::EcdsaP384Sha384);
    }

    #[test]
    fn test_end_to_end_p521() {
        let doc = sign_and_reparse(
            testutil::p521_identity(),
            SignatureAlgorithm::EcdsaP521Sha512,
        );
        assert_round_trip_valid(&doc, SignatureAlgorithm::EcdsaP521Sha512);
    }

    #[test]
    fn test_end_to_end_rsa_2048() {
        let doc = sign_and_reparse(
            testutil::rsa_identity(),
            SignatureAlgorithm::RsaPkcs1Sha256,
        );
        assert_round_trip_valid(&doc, SignatureAlgorithm::RsaPkcs1Sha256);
    }

    #[test]
    fn test_tampering_after_signing_is_detected() {
        let doc = sign_and_reparse(
            testutil::p256_identity(),
            SignatureAlgorithm::EcdsaP256Sha256,
        );
        // Flip one byte inside the covered range.
        let mut bytes = doc.as_bytes().to_vec();
        bytes[32] ^= 0xFF;
        let tampered = PdfDocument::parse(&bytes).unwrap();

        let extracted = SignatureExtractor::new().extract(&tampered);
        let sig = extracted[0].as_ref().unwrap();
        let result = SignatureVerifier::new().verify(sig);
        assert!(!result.is_valid);
        assert!(!result.document_intact);
        // Tampering with content does not invalidate the certificate.
        assert!(result.certificate_valid);
    }

    #[test]
    fn test_second_field_signs_independently() {
        let identity = testutil::p256_identity();
        let second = testutil::p256_identity();
        let mut doc = PdfDocument::parse(&testutil::pdf_bytes(1)).unwrap();
        let field = fields::create_default_field(&doc).unwrap();
        doc.add_signature_field(field).unwrap();
        let extra = fields::auto_position(&doc, "Countersign", 0).unwrap();
        doc.add_signature_field(extra).unwrap();

        let embedder = SignatureEmbedder::new(
            SignerIdentity::new(identity.cert_der),
            Box::new(identity.transport),
            SigningConfig::default(),
        );
        let doc = embedder
            .sign_document(doc, "Signature1", SignatureAlgorithm::EcdsaP256Sha256)
            .unwrap()
            .into_document();

        let embedder2 = SignatureEmbedder::new(
            SignerIdentity::new(second.cert_der),
            Box::new(second.transport),
            SigningConfig::default(),
        );
        let doc = embedder2
            .sign_document(doc, "Countersign", SignatureAlgorithm::EcdsaP256Sha256)
            .unwrap()
            .into_document();

        assert_eq!(doc.existing_signatures.len(), 2);
        let extracted = SignatureExtractor::new().extract(&doc);
        assert_eq!(extracted.len(), 2);
        // The second signature covers the final bytes and verifies; the
        // first was made before the second update was appended, so its
        // recorded range still hashes consistently.
        let verifier = SignatureVerifier::new();
        let second_result = verifier.verify(extracted[1].as_ref().unwrap());
        assert!(second_result.is_valid, "{:?}", second_result.errors);
        let first_result = verifier.verify(extracted[0].as_ref().unwrap());
        assert!(first_result.is_valid, "{:?}", first_result.errors);
    }
}
