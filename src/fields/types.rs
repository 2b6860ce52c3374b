//! Signature field types and definition validation.

use crate::error::{Error, Result};
use crate::geometry::Rect;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Allowed shape of a signature field name: a letter followed by
    /// letters, digits, underscores or dashes.
    static ref FIELD_NAME: Regex = Regex::new("^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap();
}

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    /// Red component
    pub r: f32,
    /// Green component
    pub g: f32,
    /// Blue component
    pub b: f32,
}

impl Rgb {
    /// Create a new color.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Visual configuration of a signature field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAppearance {
    /// Whether the field is rendered at all.
    pub visible: bool,
    /// Caption shown inside the field box.
    pub text: Option<String>,
    /// Fill color behind the caption.
    pub background: Option<Rgb>,
    /// Border color.
    pub border: Option<Rgb>,
}

impl Default for FieldAppearance {
    fn default() -> Self {
        Self {
            visible: true,
            text: None,
            background: None,
            border: None,
        }
    }
}

/// A signature field in a document.
///
/// Field names are unique within a document and bounds never overlap
/// another field on the same page. Once a field is signed it is
/// immutable.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureField {
    /// Field name, unique within the document.
    pub name: String,
    /// Zero-based page index.
    pub page: usize,
    /// Field box on the page.
    pub bounds: Rect,
    /// Optional visual configuration.
    pub appearance: Option<FieldAppearance>,
    /// Whether the field carries a signature.
    pub is_signed: bool,
}

impl SignatureField {
    /// Create a new unsigned field without appearance.
    pub fn new(name: impl Into<String>, page: usize, bounds: Rect) -> Self {
        Self {
            name: name.into(),
            page,
            bounds,
            appearance: None,
            is_signed: false,
        }
    }

    /// Attach an appearance to the field.
    pub fn with_appearance(mut self, appearance: FieldAppearance) -> Self {
        self.appearance = Some(appearance);
        self
    }

    /// Validate the field definition.
    ///
    /// Checks run in order: name presence, name shape, dimensions,
    /// coordinates. Nothing is auto-corrected.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::EmptyFieldName);
        }
        if !FIELD_NAME.is_match(&self.name) {
            return Err(Error::IllegalFieldName(self.name.clone()));
        }
        if self.bounds.width <= 0.0 || self.bounds.height <= 0.0 {
            return Err(Error::NonPositiveDimensions {
                width: self.bounds.width,
                height: self.bounds.height,
            });
        }
        if self.bounds.x < 0.0 || self.bounds.y < 0.0 {
            return Err(Error::NegativeCoordinate {
                x: self.bounds.x,
                y: self.bounds.y,
            });
        }
        Ok(())
    }
}

/// Check whether a string is a valid signature field name.
pub fn is_valid_field_name(name: &str) -> bool {
    FIELD_NAME.is_match(name)
}
