//! Collision-free placement of signature fields.
//!
//! Placement works on a fixed reference page box. Candidate positions are
//! tried in a fixed priority order so that repeated calls over the same
//! document are deterministic; when every canonical anchor is taken the
//! engine falls back to stacking fields vertically along the left edge.
//! The fallback always terminates but grows without bound, so callers
//! that need a hard page boundary must validate the returned bounds.

use crate::document::PdfDocument;
use crate::error::{Error, Result};
use crate::fields::types::{FieldAppearance, SignatureField};
use crate::geometry::Rect;

use chrono::Utc;

/// Standard signature box width in points.
pub const DEFAULT_FIELD_WIDTH: f32 = 150.0;
/// Standard signature box height in points.
pub const DEFAULT_FIELD_HEIGHT: f32 = 50.0;
/// Margin kept between a canonical anchor and the page edge.
pub const PAGE_MARGIN: f32 = 50.0;
/// Vertical gap between stacked fallback placements.
pub const STACK_GAP: f32 = 10.0;
/// Name given to the default field of an otherwise empty document.
pub const DEFAULT_FIELD_NAME: &str = "Signature1";
/// Caption of the default field.
pub const DEFAULT_APPEARANCE_TEXT: &str = "Digitally signed";

// Reference page box for anchor geometry. The bottom-right anchor of a
// 150pt box with a 50pt margin lands at x = 400.
const PAGE_WIDTH: f32 = 600.0;
const PAGE_HEIGHT: f32 = 800.0;

// Reference width used for size suggestions (A4 in points).
const SUGGEST_PAGE_WIDTH: f32 = 595.0;

/// Canonical anchor positions, in placement priority order.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
}

const ANCHOR_ORDER: [Anchor; 4] = [
    Anchor::BottomRight,
    Anchor::BottomLeft,
    Anchor::TopRight,
    Anchor::TopLeft,
];

fn anchor_rect(anchor: Anchor) -> Rect {
    let w = DEFAULT_FIELD_WIDTH;
    let h = DEFAULT_FIELD_HEIGHT;
    match anchor {
        Anchor::BottomRight => Rect::new(PAGE_WIDTH - PAGE_MARGIN - w, PAGE_MARGIN, w, h),
        Anchor::BottomLeft => Rect::new(PAGE_MARGIN, PAGE_MARGIN, w, h),
        Anchor::TopRight => Rect::new(
            PAGE_WIDTH - PAGE_MARGIN - w,
            PAGE_HEIGHT - PAGE_MARGIN - h,
            w,
            h,
        ),
        Anchor::TopLeft => Rect::new(PAGE_MARGIN, PAGE_HEIGHT - PAGE_MARGIN - h, w, h),
    }
}

/// Pick a non-overlapping box given the boxes already occupying the page.
fn place_among(occupied: &[Rect]) -> Rect {
    for anchor in ANCHOR_ORDER {
        let candidate = anchor_rect(anchor);
        if !occupied.iter().any(|r| candidate.overlaps(r)) {
            return candidate;
        }
    }
    // Every anchor is taken: stack along the left edge. The row index is
    // the number of fields already on the page.
    let y = PAGE_MARGIN + occupied.len() as f32 * (DEFAULT_FIELD_HEIGHT + STACK_GAP);
    Rect::new(
        PAGE_MARGIN,
        y,
        DEFAULT_FIELD_WIDTH,
        DEFAULT_FIELD_HEIGHT,
    )
}

/// Create the default field for a document that has none yet.
///
/// The field sits bottom-right on the last page with the standard box and
/// the default caption. Fails with [`Error::FieldsAlreadyExist`] when the
/// document already has signature fields.
pub fn create_default_field(document: &PdfDocument) -> Result<SignatureField> {
    if !document.signature_fields.is_empty() {
        return Err(Error::FieldsAlreadyExist);
    }
    let page = document.page_count - 1;
    let bounds = anchor_rect(Anchor::BottomRight);
    Ok(
        SignatureField::new(DEFAULT_FIELD_NAME, page, bounds).with_appearance(FieldAppearance {
            text: Some(DEFAULT_APPEARANCE_TEXT.to_string()),
            ..FieldAppearance::default()
        }),
    )
}

/// Place a new field on `page` without overlapping any existing field.
///
/// Anchors are tried bottom-right, bottom-left, top-right, top-left; if
/// all four collide the field is stacked along the left edge. The result
/// is deterministic for an unmodified document.
pub fn auto_position(document: &PdfDocument, name: &str, page: usize) -> Result<SignatureField> {
    if page >= document.page_count {
        return Err(Error::PageOutOfRange {
            page,
            page_count: document.page_count,
        });
    }
    let occupied: Vec<Rect> = document
        .fields_on_page(page)
        .map(|f| f.bounds)
        .collect();
    let field = SignatureField::new(name, page, place_among(&occupied));
    field.validate()?;
    Ok(field)
}

/// Place several fields at once on a single page.
///
/// The target page is resolved once: the preferred page when given, the
/// last page otherwise. Every requested name must be new to the document
/// and unique within the batch. Placement is sequential; each placed
/// field is fed back so later placements see earlier ones, which keeps
/// the batch mutually non-overlapping.
pub fn create_multiple(
    document: &PdfDocument,
    names: &[&str],
    preferred_page: Option<usize>,
) -> Result<Vec<SignatureField>> {
    let page = preferred_page.unwrap_or(document.page_count - 1);
    if page >= document.page_count {
        return Err(Error::PageOutOfRange {
            page,
            page_count: document.page_count,
        });
    }
    for (i, name) in names.iter().enumerate() {
        if document.has_field(name) || names[..i].contains(name) {
            return Err(Error::DuplicateFieldName(name.to_string()));
        }
    }

    let mut occupied: Vec<Rect> = document
        .fields_on_page(page)
        .map(|f| f.bounds)
        .collect();
    let mut placed = Vec::with_capacity(names.len());
    for name in names {
        let field = SignatureField::new(*name, page, place_among(&occupied));
        field.validate()?;
        occupied.push(field.bounds);
        placed.push(field);
    }
    Ok(placed)
}

/// Generate a field name that is unique within the document.
///
/// Returns `base` unchanged when free, otherwise the first free name among
/// `base1` .. `base1000`. When all thousand are taken a timestamp suffix
/// is appended; the result is unique but not reproducible.
pub fn generate_unique_name(document: &PdfDocument, base: &str) -> String {
    if !document.has_field(base) {
        return base.to_string();
    }
    for i in 1..=1000u32 {
        let candidate = format!("{}{}", base, i);
        if !document.has_field(&candidate) {
            return candidate;
        }
    }
    format!("{}_{}", base, Utc::now().timestamp_millis())
}

/// Suggested dimensions for a signature field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSize {
    /// Suggested width in points.
    pub width: f32,
    /// Suggested height in points.
    pub height: f32,
}

/// Suggest field dimensions for a page.
///
/// A quarter of the reference page width, clamped to `[100, 200]`, with a
/// 3.5 aspect ratio clamped to `[30, 80]`. Independent of document
/// content.
pub fn suggest_field_size(document: &PdfDocument, page: usize) -> Result<FieldSize> {
    if page >= document.page_count {
        return Err(Error::PageOutOfRange {
            page,
            page_count: document.page_count,
        });
    }
    let width = (SUGGEST_PAGE_WIDTH * 0.25).clamp(100.0, 200.0);
    let height = (width / 3.5).clamp(30.0, 80.0);
    Ok(FieldSize { width, height })
}
