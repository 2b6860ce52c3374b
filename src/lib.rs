//! # PDF Signet
//!
//! The PDF digital-signature subsystem of a document e-signature
//! platform: parse a document's signature-relevant structure, place
//! signature fields without geometric conflicts, embed PKCS#7/CMS
//! signatures, and verify embedded signatures against certificate chains
//! and document hashes.
//!
//! ## Core Features
//!
//! - **Parsing**: strict `%PDF-M.m` header and version validation, pure
//!   and deterministic recovery of pages, signature fields and embedded
//!   signatures from a raw byte buffer
//! - **Field Placement**: collision-free auto-positioning over canonical
//!   page anchors, batch creation, unique name generation, size
//!   suggestions
//! - **Signing**: digest of the covered byte range, raw signature via a
//!   pluggable [`SigningTransport`](signatures::SigningTransport)
//!   (local key file or cloud HSM), PKCS#7 `SignedData` assembly,
//!   incremental-update embedding
//! - **Verification**: certificate validity window, algorithm support
//!   and cryptographic correctness with strict failure semantics
//!
//! ## Fail-Open Signing
//!
//! When no transport is configured, signing is disabled, or the
//! transport fails, the signing path returns the original document
//! unchanged as [`SigningOutcome::Skipped`](signatures::SigningOutcome)
//! instead of raising. Callers must inspect the outcome to learn whether
//! a signature was produced.
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_signet::{PdfDocument, SigningConfig, fields};
//! use pdf_signet::signatures::{
//!     LocalKeyTransport, SignatureAlgorithm, SignatureEmbedder,
//!     SignatureExtractor, SignatureVerifier, SignerIdentity,
//! };
//!
//! # fn main() -> pdf_signet::Result<()> {
//! let mut doc = PdfDocument::parse(&std::fs::read("contract.pdf")?)?;
//!
//! // Authoring: place a field on the last page.
//! let field = fields::create_default_field(&doc)?;
//! doc.add_signature_field(field)?;
//!
//! // Signing: key custody stays behind the transport.
//! let transport = LocalKeyTransport::from_pkcs8_der(&key_der)?;
//! let embedder = SignatureEmbedder::new(
//!     SignerIdentity::new(cert_der),
//!     Box::new(transport),
//!     SigningConfig::default(),
//! );
//! let doc = embedder
//!     .sign_document(doc, "Signature1", SignatureAlgorithm::RsaPkcs1Sha256)?
//!     .into_document();
//!
//! // Verification: independent of authoring.
//! for extracted in SignatureExtractor::new().extract(&doc) {
//!     let result = SignatureVerifier::new().verify(&extracted?);
//!     println!("valid: {}", result.is_valid);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Core document model and parsing
pub mod document;

// Geometric primitives
pub mod geometry;

// Field definitions and placement
pub mod fields;

// Signing configuration
pub mod config;

// Signing, extraction and verification
pub mod signatures;

// Shared test fixtures
#[cfg(test)]
pub(crate) mod testutil;

// Re-exports
pub use config::SigningConfig;
pub use document::{DocumentMetadata, PdfDocument, PdfVersion, SignatureRecord};
pub use error::{Error, Result};
pub use fields::{FieldAppearance, SignatureField};
pub use geometry::Rect;

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.starts_with("0."));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pdf_signet");
    }
}
