//! Embedding signatures into the document byte stream.
//!
//! Signing appends an incremental update that re-emits the target field's
//! widget with a `/V` signature dictionary, fills in the `/ByteRange`,
//! hashes the covered bytes, obtains the raw signature from the
//! transport and writes the assembled PKCS#7 container into the
//! `/Contents` placeholder.
//!
//! The signing path fails open: a disabled configuration, a missing
//! transport or a transport failure all return the original document
//! unchanged as [`SigningOutcome::Skipped`]. Callers must inspect the
//! outcome: "no error" does not mean "signed".

use crate::config::SigningConfig;
use crate::document::{self, PdfDocument, SignatureRecord};
use crate::error::{Error, Result};
use crate::signatures::byterange::{self, ByteRange};
use crate::signatures::pkcs7::{self, SignedDataSpec};
use crate::signatures::transport::SigningTransport;
use crate::signatures::types::{SignatureAlgorithm, SigningOutcome, SkipReason};

use chrono::{DateTime, Utc};
use log::{debug, warn};

/// The `/SubFilter` this embedder produces.
const SUB_FILTER: &str = "adbe.pkcs7.detached";

/// Width of each zero-padded `/ByteRange` entry.
const BYTE_RANGE_DIGITS: usize = 10;

/// The public half of a signing identity: the signer certificate and its
/// chain. Private key material lives behind the transport.
#[derive(Debug, Clone)]
pub struct SignerIdentity {
    /// DER-encoded signer certificate.
    pub certificate: Vec<u8>,
    /// Intermediate certificates, closest to the leaf first.
    pub chain: Vec<Vec<u8>>,
}

impl SignerIdentity {
    /// Create an identity from the signer certificate alone.
    pub fn new(certificate: Vec<u8>) -> Self {
        Self {
            certificate,
            chain: Vec::new(),
        }
    }

    /// Attach the intermediate chain.
    pub fn with_chain(mut self, chain: Vec<Vec<u8>>) -> Self {
        self.chain = chain;
        self
    }

    /// The full chain, leaf first.
    pub fn full_chain(&self) -> Vec<Vec<u8>> {
        let mut chain = Vec::with_capacity(1 + self.chain.len());
        chain.push(self.certificate.clone());
        chain.extend(self.chain.iter().cloned());
        chain
    }
}

/// Embeds cryptographic signatures into documents.
pub struct SignatureEmbedder {
    identity: SignerIdentity,
    transport: Option<Box<dyn SigningTransport>>,
    config: SigningConfig,
}

impl SignatureEmbedder {
    /// Create an embedder with a wired-in transport.
    pub fn new(
        identity: SignerIdentity,
        transport: Box<dyn SigningTransport>,
        config: SigningConfig,
    ) -> Self {
        Self {
            identity,
            transport: Some(transport),
            config,
        }
    }

    /// Create an embedder with no transport. Every signing call skips.
    pub fn without_transport(identity: SignerIdentity, config: SigningConfig) -> Self {
        Self {
            identity,
            transport: None,
            config,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Sign the named field of a document.
    ///
    /// Unknown or already-signed fields are hard errors; capability
    /// outages (disabled config, missing transport, transport failure)
    /// degrade to [`SigningOutcome::Skipped`] with the document
    /// untouched. At most one transport attempt is made per call.
    pub fn sign_document(
        &self,
        document: PdfDocument,
        field_name: &str,
        algorithm: SignatureAlgorithm,
    ) -> Result<SigningOutcome> {
        let field = document
            .field(field_name)
            .ok_or_else(|| Error::UnknownField(field_name.to_string()))?;
        if field.is_signed {
            return Err(Error::FieldAlreadySigned(field_name.to_string()));
        }
        let field = field.clone();

        if !self.config.enabled {
            warn!("signing of '{}' skipped: disabled by configuration", field_name);
            return Ok(SigningOutcome::Skipped {
                document,
                reason: SkipReason::Disabled,
            });
        }
        let Some(transport) = self.transport.as_deref() else {
            warn!("signing of '{}' skipped: no transport configured", field_name);
            return Ok(SigningOutcome::Skipped {
                document,
                reason: SkipReason::NoTransport,
            });
        };

        let signing_time = self.config.signing_time.unwrap_or_else(Utc::now);

        // Build the incremental update on a scratch buffer so a failed
        // attempt leaves the document untouched.
        let mut bytes = document.as_bytes().to_vec();
        let base = bytes.len();
        let placeholder = byterange::contents_placeholder(self.config.signature_capacity);
        let (chunk, byte_range_offset, contents_offset) =
            self.signed_widget_chunk(&field, &placeholder, signing_time);
        bytes.extend_from_slice(chunk.as_bytes());

        let contents_start = base + contents_offset;
        let byte_range =
            ByteRange::around_placeholder(bytes.len(), contents_start, placeholder.len());
        write_byte_range(&mut bytes, base + byte_range_offset, &byte_range);

        let covered = byte_range.covered_bytes(&bytes)?;
        let digest = algorithm.hash_algorithm().digest(&covered);

        // Exactly one transport attempt; any failure means "not signed".
        let signature = match transport.sign(&digest, algorithm) {
            Ok(signature) => signature,
            Err(e) => {
                warn!("signing of '{}' skipped: {}", field_name, e);
                return Ok(SigningOutcome::Skipped {
                    document,
                    reason: SkipReason::TransportFailed(e.to_string()),
                });
            }
        };

        let certificates = self.identity.full_chain();
        let der = pkcs7::build_signed_data(&SignedDataSpec {
            algorithm,
            certificates: &certificates,
            document_hash: &digest,
            signature: &signature,
            signing_time,
        })
        .map_err(Error::InvalidCertificate)?;
        byterange::write_contents_hex(&mut bytes, contents_start, &der, placeholder.len())?;

        debug!(
            "embedded {} signature ({} bytes DER) into field '{}'",
            algorithm,
            der.len(),
            field_name
        );

        let mut document = document;
        document.raw_bytes = bytes;
        document.mark_signed(field_name);
        document.existing_signatures.push(SignatureRecord {
            field_name: field_name.to_string(),
            byte_range,
            contents: der,
            sub_filter: Some(SUB_FILTER.to_string()),
        });
        Ok(SigningOutcome::Signed(document))
    }

    /// Render the widget update with its `/V` signature dictionary.
    ///
    /// Returns the chunk plus the chunk-relative offsets of the first
    /// `/ByteRange` digit group and of the `/Contents` value.
    fn signed_widget_chunk(
        &self,
        field: &crate::fields::SignatureField,
        placeholder: &str,
        signing_time: DateTime<Utc>,
    ) -> (String, usize, usize) {
        let mut chunk = document::widget_prefix(field);
        chunk.push_str(" /V << /Type /Sig /Filter /Adobe.PPKLite /SubFilter /");
        chunk.push_str(SUB_FILTER);
        if let Some(reason) = &self.config.reason {
            chunk.push_str(&format!(" /Reason ({})", document::escape_pdf_string(reason)));
        }
        if let Some(location) = &self.config.location {
            chunk.push_str(&format!(
                " /Location ({})",
                document::escape_pdf_string(location)
            ));
        }
        chunk.push_str(&format!(
            " /M (D:{}Z)",
            signing_time.format("%Y%m%d%H%M%S")
        ));
        chunk.push_str(" /ByteRange [0 ");
        let byte_range_offset = chunk.len();
        for i in 0..3 {
            chunk.push_str(&"0".repeat(BYTE_RANGE_DIGITS));
            chunk.push(if i < 2 { ' ' } else { ']' });
        }
        chunk.push_str(" /Contents ");
        let contents_offset = chunk.len();
        chunk.push_str(placeholder);
        chunk.push_str(" >> >>\n%%EOF\n");
        (chunk, byte_range_offset, contents_offset)
    }
}

/// Overwrite the three zero-padded `/ByteRange` digit groups.
fn write_byte_range(bytes: &mut [u8], offset: usize, byte_range: &ByteRange) {
    let [_, b1, b2, b3] = byte_range.0;
    for (i, value) in [b1, b2, b3].into_iter().enumerate() {
        let text = format!("{:0width$}", value, width = BYTE_RANGE_DIGITS);
        let at = offset + i * (BYTE_RANGE_DIGITS + 1);
        bytes[at..at + BYTE_RANGE_DIGITS].copy_from_slice(text.as_bytes());
    }
}
