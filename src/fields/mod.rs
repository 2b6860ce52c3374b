//! Signature field definitions and placement.
//!
//! This module provides the authoring-time half of the signature
//! subsystem:
//!
//! - **Field definitions**: [`SignatureField`] with validation of names,
//!   dimensions and coordinates
//! - **Placement**: collision-free auto-positioning over canonical page
//!   anchors with a stacking fallback
//! - **Naming**: unique field name generation
//! - **Sizing**: page-relative size suggestions
//!
//! ## Example
//!
//! ```ignore
//! use pdf_signet::PdfDocument;
//! use pdf_signet::fields;
//!
//! let mut doc = PdfDocument::parse(&bytes)?;
//! let field = fields::create_default_field(&doc)?;
//! doc.add_signature_field(field)?;
//! ```

mod placement;
mod types;

pub use placement::{
    auto_position, create_default_field, create_multiple, generate_unique_name,
    suggest_field_size, FieldSize, DEFAULT_APPEARANCE_TEXT, DEFAULT_FIELD_HEIGHT,
    DEFAULT_FIELD_NAME, DEFAULT_FIELD_WIDTH, PAGE_MARGIN, STACK_GAP,
};
pub use types::{is_valid_field_name, FieldAppearance, Rgb, SignatureField};
