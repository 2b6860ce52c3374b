//! Error types for the PDF signature library.
//!
//! This module defines all error types that can occur during PDF parsing,
//! field placement and signature handling.

/// Result type alias for PDF signature operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while working with signed documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Unsupported PDF version
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Input ends before the minimum header is complete
    #[error("Truncated PDF: {actual} bytes, need at least {expected}")]
    Truncated {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes actually present
        actual: usize,
    },

    /// Signature field name is empty
    #[error("Signature field name is empty")]
    EmptyFieldName,

    /// Signature field name does not match the allowed pattern
    #[error("Illegal characters in field name: '{0}'")]
    IllegalFieldName(String),

    /// Field width or height is zero or negative
    #[error("Field dimensions must be positive, got {width}x{height}")]
    NonPositiveDimensions {
        /// Requested width
        width: f32,
        /// Requested height
        height: f32,
    },

    /// Field origin lies outside the page
    #[error("Field coordinates must be non-negative, got ({x}, {y})")]
    NegativeCoordinate {
        /// Requested x coordinate
        x: f32,
        /// Requested y coordinate
        y: f32,
    },

    /// A field with this name already exists in the document
    #[error("Duplicate field name: '{0}'")]
    DuplicateFieldName(String),

    /// Page index is outside the document
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange {
        /// Requested zero-based page index
        page: usize,
        /// Number of pages in the document
        page_count: usize,
    },

    /// The document already has signature fields
    #[error("Document already has signature fields")]
    FieldsAlreadyExist,

    /// The field bounds overlap another field on the same page
    #[error("Field '{name}' overlaps existing field '{other}'")]
    FieldOverlap {
        /// Name of the field being added
        name: String,
        /// Name of the field it collides with
        other: String,
    },

    /// No signature field with this name exists
    #[error("No signature field named '{0}'")]
    UnknownField(String),

    /// The field already carries a signature and is immutable
    #[error("Field '{0}' is already signed")]
    FieldAlreadySigned(String),

    /// A signature ByteRange does not describe the document
    #[error("Invalid ByteRange: {0}")]
    InvalidByteRange(String),

    /// A DER certificate could not be decoded
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// An embedded PKCS#7 structure could not be decoded
    #[error("Malformed signature at index {index}: {reason}")]
    MalformedSignature {
        /// Position of the signature in the document's signature list
        index: usize,
        /// What went wrong while decoding
        reason: String,
    },

    /// The assembled signature does not fit the reserved placeholder
    #[error("Signature ({size} bytes) exceeds reserved capacity ({capacity} bytes)")]
    SignatureTooLarge {
        /// DER size of the assembled signature
        size: usize,
        /// Bytes reserved in the /Contents placeholder
        capacity: usize,
    },
}
