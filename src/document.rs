//! In-memory model of a PDF's signature-relevant structure.
//!
//! Parsing is a pure, deterministic function of the input buffer: the
//! header and version token are validated strictly, while the page tree,
//! signature field widgets and embedded signature dictionaries are
//! recovered with a windowed byte scan. Everything else in the document
//! is carried as opaque pass-through bytes.
//!
//! Mutations (adding a field, embedding a signature) append incremental
//! update sections to the byte stream rather than rewriting it, so a
//! later occurrence of a field widget overrides an earlier one.

use crate::error::{Error, Result};
use crate::fields::SignatureField;
use crate::geometry::Rect;
use crate::signatures::byterange::ByteRange;

use log::debug;

/// Supported PDF version tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PdfVersion {
    V1_0,
    V1_1,
    V1_2,
    V1_3,
    V1_4,
    V1_5,
    V1_6,
    V1_7,
    V2_0,
}

impl PdfVersion {
    /// Parse a `M.m` token into a supported version.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "1.0" => Some(PdfVersion::V1_0),
            "1.1" => Some(PdfVersion::V1_1),
            "1.2" => Some(PdfVersion::V1_2),
            "1.3" => Some(PdfVersion::V1_3),
            "1.4" => Some(PdfVersion::V1_4),
            "1.5" => Some(PdfVersion::V1_5),
            "1.6" => Some(PdfVersion::V1_6),
            "1.7" => Some(PdfVersion::V1_7),
            "2.0" => Some(PdfVersion::V2_0),
            _ => None,
        }
    }

    /// The version token as it appears in the header.
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfVersion::V1_0 => "1.0",
            PdfVersion::V1_1 => "1.1",
            PdfVersion::V1_2 => "1.2",
            PdfVersion::V1_3 => "1.3",
            PdfVersion::V1_4 => "1.4",
            PdfVersion::V1_5 => "1.5",
            PdfVersion::V1_6 => "1.6",
            PdfVersion::V1_7 => "1.7",
            PdfVersion::V2_0 => "2.0",
        }
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document information entries relevant for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    /// `/Title` entry of the Info dictionary.
    pub title: Option<String>,
    /// `/Author` entry of the Info dictionary.
    pub author: Option<String>,
}

/// A raw signature record parsed out of a signed document.
///
/// Carries the undecoded PKCS#7 blob; decoding happens in the
/// [`SignatureExtractor`](crate::signatures::SignatureExtractor).
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureRecord {
    /// Name of the field the signature is bound to.
    pub field_name: String,
    /// Byte runs covered by the signature.
    pub byte_range: ByteRange,
    /// Hex-decoded `/Contents` value (trailing padding included).
    pub contents: Vec<u8>,
    /// `/SubFilter` name, when present.
    pub sub_filter: Option<String>,
}

/// A parsed PDF document.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    /// PDF version from the header.
    pub version: PdfVersion,
    /// Number of pages, at least 1.
    pub page_count: usize,
    /// Document information entries.
    pub metadata: DocumentMetadata,
    /// Signature fields, in document order.
    pub signature_fields: Vec<SignatureField>,
    /// Raw signature records, in document order.
    pub existing_signatures: Vec<SignatureRecord>,
    pub(crate) raw_bytes: Vec<u8>,
}

const MIN_HEADER: usize = 8;

impl PdfDocument {
    /// Parse a document from raw bytes.
    ///
    /// Fails with [`Error::Truncated`] when fewer than the minimum header
    /// bytes are present, [`Error::InvalidHeader`] when the buffer does
    /// not start with a `%PDF-M.m` signature and
    /// [`Error::UnsupportedVersion`] when the version token is outside
    /// the supported set.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_signet::PdfDocument;
    ///
    /// let doc = PdfDocument::parse(b"%PDF-1.7\n%%EOF\n").unwrap();
    /// assert_eq!(doc.version.as_str(), "1.7");
    /// assert_eq!(doc.page_count, 1);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_HEADER {
            return Err(Error::Truncated {
                expected: MIN_HEADER,
                actual: bytes.len(),
            });
        }
        if &bytes[..5] != b"%PDF-" {
            return Err(Error::InvalidHeader(
                String::from_utf8_lossy(&bytes[..5]).into_owned(),
            ));
        }
        let token = &bytes[5..8];
        if !token[0].is_ascii_digit() || token[1] != b'.' || !token[2].is_ascii_digit() {
            return Err(Error::InvalidHeader(
                String::from_utf8_lossy(token).into_owned(),
            ));
        }
        let token = String::from_utf8_lossy(token).into_owned();
        let version = match PdfVersion::from_token(&token) {
            Some(v) => v,
            None => return Err(Error::UnsupportedVersion(token)),
        };

        let page_count = scan_page_count(bytes);
        let metadata = DocumentMetadata {
            title: literal_string_after(bytes, b"/Title "),
            author: literal_string_after(bytes, b"/Author "),
        };
        let (signature_fields, existing_signatures) = scan_acro_fields(bytes, page_count);
        debug!(
            "parsed PDF {}: {} pages, {} fields, {} signatures",
            version,
            page_count,
            signature_fields.len(),
            existing_signatures.len()
        );

        Ok(Self {
            version,
            page_count,
            metadata,
            signature_fields,
            existing_signatures,
            raw_bytes: bytes.to_vec(),
        })
    }

    /// The document's byte stream.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Consume the document and return its byte stream.
    pub fn into_bytes(self) -> Vec<u8> {
        self.raw_bytes
    }

    /// Look up a signature field by name.
    pub fn field(&self, name: &str) -> Option<&SignatureField> {
        self.signature_fields.iter().find(|f| f.name == name)
    }

    /// Check whether a field with this name exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Iterate over the fields placed on one page.
    pub fn fields_on_page(&self, page: usize) -> impl Iterator<Item = &SignatureField> {
        self.signature_fields.iter().filter(move |f| f.page == page)
    }

    /// Add a signature field to the document.
    ///
    /// The definition is validated, the page index checked, and the name
    /// and bounds checked against existing fields; the widget is then
    /// appended to the byte stream as an incremental update so that
    /// re-parsing the bytes recovers the field.
    pub fn add_signature_field(&mut self, field: SignatureField) -> Result<()> {
        field.validate()?;
        if field.page >= self.page_count {
            return Err(Error::PageOutOfRange {
                page: field.page,
                page_count: self.page_count,
            });
        }
        if self.has_field(&field.name) {
            return Err(Error::DuplicateFieldName(field.name.clone()));
        }
        if let Some(other) = self
            .fields_on_page(field.page)
            .find(|f| f.bounds.overlaps(&field.bounds))
        {
            return Err(Error::FieldOverlap {
                name: field.name.clone(),
                other: other.name.clone(),
            });
        }

        let mut chunk = widget_prefix(&field);
        chunk.push_str(" >>\n%%EOF\n");
        self.raw_bytes.extend_from_slice(chunk.as_bytes());
        self.signature_fields.push(field);
        Ok(())
    }

    /// Flag a field as signed. The embedder calls this after it has
    /// written the signature into the byte stream.
    pub(crate) fn mark_signed(&mut self, name: &str) {
        if let Some(field) = self.signature_fields.iter_mut().find(|f| f.name == name) {
            field.is_signed = true;
        }
    }
}

/// Opening of a signature widget dictionary, up to (not including) the
/// optional `/V` entry.
pub(crate) fn widget_prefix(field: &SignatureField) -> String {
    let b = &field.bounds;
    format!(
        "\n<< /Type /Annot /Subtype /Widget /FT /Sig /T ({}) /Rect [{} {} {} {}] /P {} 0 R /F 4",
        escape_pdf_string(&field.name),
        b.x,
        b.y,
        b.right(),
        b.top(),
        field.page + 1,
    )
}

/// Escape special characters in a PDF literal string.
pub(crate) fn escape_pdf_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '(' => result.push_str("\\("),
            ')' => result.push_str("\\)"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            _ => result.push(c),
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Byte scanning
// ---------------------------------------------------------------------------

fn find_from(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if needle.is_empty() || start >= haystack.len() {
        return None;
    }
    haystack[start..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| i + start)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    find_from(haystack, needle, 0)
}

fn scan_page_count(bytes: &[u8]) -> usize {
    // Prefer the page tree's /Count entry.
    if let Some(pos) = find(bytes, b"/Type /Pages") {
        let window_end = (pos + 256).min(bytes.len());
        if let Some(count) = integer_after(&bytes[pos..window_end], b"/Count ") {
            if count >= 1 {
                return count;
            }
        }
    }
    // Fall back to counting page objects.
    let mut count = 0;
    let mut at = 0;
    while let Some(pos) = find_from(bytes, b"/Type /Page", at) {
        at = pos + b"/Type /Page".len();
        if bytes.get(at) != Some(&b's') {
            count += 1;
        }
    }
    count.max(1)
}

/// Parse the literal string that follows `needle` (expects an opening
/// parenthesis right after the needle).
fn literal_string_after(window: &[u8], needle: &[u8]) -> Option<String> {
    let pos = find(window, needle)? + needle.len();
    if window.get(pos) != Some(&b'(') {
        return None;
    }
    let mut out = String::new();
    let mut i = pos + 1;
    while i < window.len() {
        match window[i] {
            b')' => return Some(out),
            b'\\' => {
                i += 1;
                match window.get(i)? {
                    b'n' => out.push('\n'),
                    b'r' => out.push('\r'),
                    other => out.push(*other as char),
                }
            }
            other => out.push(other as char),
        }
        i += 1;
    }
    None
}

/// Parse the unsigned integer that follows `needle`.
fn integer_after(window: &[u8], needle: &[u8]) -> Option<usize> {
    let mut pos = find(window, needle)? + needle.len();
    while window.get(pos) == Some(&b' ') {
        pos += 1;
    }
    let start = pos;
    while window.get(pos).is_some_and(|b| b.is_ascii_digit()) {
        pos += 1;
    }
    if pos == start {
        return None;
    }
    std::str::from_utf8(&window[start..pos]).ok()?.parse().ok()
}

/// Parse the numbers between `needle`'s bracket and the closing one.
fn numbers_after(window: &[u8], needle: &[u8]) -> Option<Vec<f64>> {
    let start = find(window, needle)? + needle.len();
    let end = find_from(window, b"]", start)?;
    let body = std::str::from_utf8(&window[start..end]).ok()?;
    let mut numbers = Vec::new();
    for part in body.split_ascii_whitespace() {
        numbers.push(part.parse().ok()?);
    }
    Some(numbers)
}

fn rect_after(window: &[u8], needle: &[u8]) -> Option<Rect> {
    let numbers = numbers_after(window, needle)?;
    if numbers.len() < 4 {
        return None;
    }
    Some(Rect::from_corners(
        numbers[0] as f32,
        numbers[1] as f32,
        numbers[2] as f32,
        numbers[3] as f32,
    ))
}

fn byte_range_after(window: &[u8], needle: &[u8]) -> Option<ByteRange> {
    let numbers = numbers_after(window, needle)?;
    if numbers.len() != 4 {
        return None;
    }
    Some(ByteRange([
        numbers[0] as i64,
        numbers[1] as i64,
        numbers[2] as i64,
        numbers[3] as i64,
    ]))
}

/// Decode the hex string between `needle`'s angle bracket and `>`.
fn hex_string_after(window: &[u8], needle: &[u8]) -> Option<Vec<u8>> {
    let start = find(window, needle)? + needle.len();
    let end = find_from(window, b">", start)?;
    let mut out = Vec::with_capacity((end - start) / 2);
    let mut nibbles = window[start..end]
        .iter()
        .filter(|b| b.is_ascii_hexdigit())
        .map(|b| match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            _ => b - b'A' + 10,
        });
    while let Some(high) = nibbles.next() {
        let low = nibbles.next().unwrap_or(0);
        out.push((high << 4) | low);
    }
    Some(out)
}

/// Parse the name token that follows `needle`.
fn name_token_after(window: &[u8], needle: &[u8]) -> Option<String> {
    let start = find(window, needle)? + needle.len();
    let mut end = start;
    while window
        .get(end)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'.')
    {
        end += 1;
    }
    if end == start {
        return None;
    }
    Some(String::from_utf8_lossy(&window[start..end]).into_owned())
}

fn scan_acro_fields(bytes: &[u8], page_count: usize) -> (Vec<SignatureField>, Vec<SignatureRecord>) {
    let mut fields: Vec<SignatureField> = Vec::new();
    let mut records: Vec<SignatureRecord> = Vec::new();
    let mut at = 0;
    while let Some(pos) = find_from(bytes, b"/FT /Sig", at) {
        at = pos + b"/FT /Sig".len();
        // One widget's keys live between its /FT marker and the next.
        let end = find_from(bytes, b"/FT /Sig", at).unwrap_or(bytes.len());
        let window = &bytes[pos..end];

        let Some(name) = literal_string_after(window, b"/T ") else {
            continue;
        };
        let Some(bounds) = rect_after(window, b"/Rect [") else {
            continue;
        };
        let page = integer_after(window, b"/P ")
            .map(|n| n.saturating_sub(1).min(page_count.saturating_sub(1)))
            .unwrap_or(0);
        let mut field = SignatureField::new(name.clone(), page, bounds);

        let mut record = None;
        if let Some(vpos) = find(window, b"/V <<") {
            let vwindow = &window[vpos..];
            if find(vwindow, b"/Type /Sig").is_some() {
                let contents = hex_string_after(vwindow, b"/Contents <").unwrap_or_default();
                // An all-zero value is an unfilled placeholder, not a
                // signature.
                if contents.iter().any(|&b| b != 0) {
                    field.is_signed = true;
                    record = Some(SignatureRecord {
                        field_name: name.clone(),
                        byte_range: byte_range_after(vwindow, b"/ByteRange [")
                            .unwrap_or(ByteRange([0; 4])),
                        contents,
                        sub_filter: name_token_after(vwindow, b"/SubFilter /"),
                    });
                }
            }
        }

        // Incremental updates re-emit the widget; the last occurrence of
        // a field name wins.
        if let Some(existing) = fields.iter_mut().find(|f| f.name == name) {
            *existing = field;
            records.retain(|r| r.field_name != name);
        } else {
            fields.push(field);
        }
        if let Some(record) = record {
            records.push(record);
        }
    }
    (fields, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::pdf_bytes;

    #[test]
    fn test_parse_minimal_header() {
        let doc = PdfDocument::parse(b"%PDF-1.4\n%%EOF\n").unwrap();
        assert_eq!(doc.version, PdfVersion::V1_4);
        assert_eq!(doc.page_count, 1);
        assert!(doc.signature_fields.is_empty());
        assert!(doc.existing_signatures.is_empty());
    }

    #[test]
    fn test_parse_supports_2_0() {
        let doc = PdfDocument::parse(b"%PDF-2.0\n%%EOF\n").unwrap();
        assert_eq!(doc.version, PdfVersion::V2_0);
    }

    #[test]
    fn test_parse_truncated() {
        assert!(matches!(
            PdfDocument::parse(b"%PDF-1."),
            Err(Error::Truncated {
                expected: 8,
                actual: 7
            })
        ));
    }

    #[test]
    fn test_parse_invalid_header() {
        assert!(matches!(
            PdfDocument::parse(b"Hello, world"),
            Err(Error::InvalidHeader(_))
        ));
        // Magic present, version token garbled.
        assert!(matches!(
            PdfDocument::parse(b"%PDF-abc\n"),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_parse_unsupported_version() {
        assert!(matches!(
            PdfDocument::parse(b"%PDF-1.9\n%%EOF\n"),
            Err(Error::UnsupportedVersion(v)) if v == "1.9"
        ));
        assert!(matches!(
            PdfDocument::parse(b"%PDF-3.0\n%%EOF\n"),
            Err(Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_parse_page_count_from_count_entry() {
        let doc = PdfDocument::parse(&pdf_bytes(4)).unwrap();
        assert_eq!(doc.page_count, 4);
    }

    #[test]
    fn test_parse_page_count_fallback_counts_page_objects() {
        let bytes =
            b"%PDF-1.7\n<< /Type /Page >>\n<< /Type /Page >>\n<< /Type /Page >>\n%%EOF\n";
        let doc = PdfDocument::parse(bytes).unwrap();
        assert_eq!(doc.page_count, 3);
    }

    #[test]
    fn test_parse_metadata() {
        let bytes = b"%PDF-1.7\n<< /Title (Quarterly Report) /Author (Jo Vance) >>\n%%EOF\n";
        let doc = PdfDocument::parse(bytes).unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Quarterly Report"));
        assert_eq!(doc.metadata.author.as_deref(), Some("Jo Vance"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let bytes = pdf_bytes(3);
        let a = PdfDocument::parse(&bytes).unwrap();
        let b = PdfDocument::parse(&bytes).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_add_field_round_trip() {
        let mut doc = PdfDocument::parse(&pdf_bytes(2)).unwrap();
        let field = SignatureField::new("Approval-1", 1, Rect::new(400.0, 50.0, 150.0, 50.0));
        doc.add_signature_field(field.clone()).unwrap();

        let reparsed = PdfDocument::parse(doc.as_bytes()).unwrap();
        assert_eq!(reparsed.signature_fields.len(), 1);
        let recovered = &reparsed.signature_fields[0];
        assert_eq!(recovered.name, "Approval-1");
        assert_eq!(recovered.page, 1);
        assert_eq!(recovered.bounds, field.bounds);
        assert!(!recovered.is_signed);
    }

    #[test]
    fn test_add_field_rejects_duplicate_name() {
        let mut doc = PdfDocument::parse(&pdf_bytes(1)).unwrap();
        doc.add_signature_field(SignatureField::new(
            "Sig",
            0,
            Rect::new(50.0, 50.0, 150.0, 50.0),
        ))
        .unwrap();
        let dup = SignatureField::new("Sig", 0, Rect::new(400.0, 50.0, 150.0, 50.0));
        assert!(matches!(
            doc.add_signature_field(dup),
            Err(Error::DuplicateFieldName(_))
        ));
    }

    #[test]
    fn test_add_field_rejects_overlap() {
        let mut doc = PdfDocument::parse(&pdf_bytes(1)).unwrap();
        doc.add_signature_field(SignatureField::new(
            "Sig1",
            0,
            Rect::new(50.0, 50.0, 150.0, 50.0),
        ))
        .unwrap();
        let overlapping = SignatureField::new("Sig2", 0, Rect::new(100.0, 60.0, 150.0, 50.0));
        assert!(matches!(
            doc.add_signature_field(overlapping),
            Err(Error::FieldOverlap { .. })
        ));
        // Same bounds on another page are fine.
        let mut doc2 = PdfDocument::parse(&pdf_bytes(2)).unwrap();
        doc2.add_signature_field(SignatureField::new(
            "Sig1",
            0,
            Rect::new(50.0, 50.0, 150.0, 50.0),
        ))
        .unwrap();
        doc2.add_signature_field(SignatureField::new(
            "Sig2",
            1,
            Rect::new(50.0, 50.0, 150.0, 50.0),
        ))
        .unwrap();
    }

    #[test]
    fn test_add_field_rejects_bad_page() {
        let mut doc = PdfDocument::parse(&pdf_bytes(1)).unwrap();
        let field = SignatureField::new("Sig", 3, Rect::new(50.0, 50.0, 150.0, 50.0));
        assert!(matches!(
            doc.add_signature_field(field),
            Err(Error::PageOutOfRange { page: 3, .. })
        ));
    }

    #[test]
    fn test_add_field_validates_definition() {
        let mut doc = PdfDocument::parse(&pdf_bytes(1)).unwrap();
        let field = SignatureField::new("", 0, Rect::new(50.0, 50.0, 150.0, 50.0));
        assert!(matches!(
            doc.add_signature_field(field),
            Err(Error::EmptyFieldName)
        ));
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(escape_pdf_string("Hello"), "Hello");
        assert_eq!(escape_pdf_string("a(b)c"), "a\\(b\\)c");
        assert_eq!(escape_pdf_string("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_literal_string_unescape() {
        let window = b"/T (a\\(b\\)c) /Rect";
        assert_eq!(
            literal_string_after(window, b"/T ").as_deref(),
            Some("a(b)c")
        );
    }

    #[test]
    fn test_hex_string_after() {
        let window = b"/Contents <48656C6C6F> def";
        assert_eq!(
            hex_string_after(window, b"/Contents <").unwrap(),
            b"Hello".to_vec()
        );
    }

    #[test]
    fn test_fields_on_page() {
        let mut doc = PdfDocument::parse(&pdf_bytes(2)).unwrap();
        doc.add_signature_field(SignatureField::new(
            "A",
            0,
            Rect::new(50.0, 50.0, 150.0, 50.0),
        ))
        .unwrap();
        doc.add_signature_field(SignatureField::new(
            "B",
            1,
            Rect::new(50.0, 50.0, 150.0, 50.0),
        ))
        .unwrap();
        assert_eq!(doc.fields_on_page(0).count(), 1);
        assert_eq!(doc.fields_on_page(1).count(), 1);
        assert_eq!(doc.fields_on_page(0).next().unwrap().name, "A");
    }
}
