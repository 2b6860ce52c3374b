//! Structural extraction of embedded signatures.
//!
//! Extraction repackages bytes into typed fields; no cryptographic
//! judgement happens here. Each signature is decoded independently: a
//! malformed one yields an error entry without aborting extraction of
//! its siblings.

use crate::document::{PdfDocument, SignatureRecord};
use crate::error::{Error, Result};
use crate::signatures::pkcs7;
use crate::signatures::types::{AlgorithmInfo, CertificateInfo, ExtractedSignature};

/// Decodes the signatures a document carries.
#[derive(Debug, Default)]
pub struct SignatureExtractor;

impl SignatureExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self
    }

    /// Decode every signature in the document.
    ///
    /// The result has one entry per signature record, in document order.
    /// A record that cannot be decoded becomes an
    /// [`Error::MalformedSignature`] entry; valid siblings are
    /// unaffected.
    pub fn extract(&self, document: &PdfDocument) -> Vec<Result<ExtractedSignature>> {
        document
            .existing_signatures
            .iter()
            .enumerate()
            .map(|(index, record)| {
                self.extract_one(document, index, record)
                    .map_err(|reason| Error::MalformedSignature { index, reason })
            })
            .collect()
    }

    fn extract_one(
        &self,
        document: &PdfDocument,
        index: usize,
        record: &SignatureRecord,
    ) -> std::result::Result<ExtractedSignature, String> {
        let parsed = pkcs7::parse_signed_data(&record.contents)?;

        let mut chain = Vec::with_capacity(parsed.certificates.len());
        for der in &parsed.certificates {
            chain.push(CertificateInfo::from_der(der).map_err(|e| e.to_string())?);
        }
        // Order the chain leaf-first: the signer certificate is the one
        // whose serial number the SignerInfo names.
        let signer_serial = format!("{:x}", parsed.signer_serial);
        if let Some(pos) = chain
            .iter()
            .position(|cert| strip_leading_zeros(&cert.serial_number) == signer_serial)
        {
            chain.rotate_left(pos);
        }

        // An empty chain still extracts; rejecting it is the verifier's
        // call, not ours.
        let leaf = chain.first();
        let signer_name = leaf.and_then(|cert| cert.common_name());
        let algorithm = leaf.and_then(|cert| {
            pkcs7::algorithm_from_oid(
                &parsed.signature_algorithm_oid,
                cert.key_algorithm,
                cert.key_size,
            )
        });
        let signature_algorithm = AlgorithmInfo {
            algorithm,
            hash_algorithm: parsed.digest,
            key_size: leaf.map(|cert| cert.key_size).unwrap_or(0),
        };

        // The document hash covers the record's byte range, using the
        // digest algorithm the container declares. Signatures embedded
        // before a later incremental update cover a prefix of the file,
        // so the range is bounds-checked but not required to reach the
        // end.
        let document_hash = match parsed.digest {
            Some(hash) => {
                let covered = record
                    .byte_range
                    .covered_bytes(document.as_bytes())
                    .map_err(|e| e.to_string())?;
                hash.digest(&covered)
            }
            None => Vec::new(),
        };

        Ok(ExtractedSignature {
            signature_index: index,
            field_name: record.field_name.clone(),
            signer_name,
            signing_time: parsed.signing_time,
            certificate_chain: chain,
            signature_algorithm,
            signature_data: parsed.signature,
            document_hash,
        })
    }
}

/// Serial numbers compare without leading zero digits.
fn strip_leading_zeros(hex: &str) -> &str {
    let stripped = hex.trim_start_matches('0');
    if stripped.is_empty() {
        "0"
    } else {
        stripped
    }
}
