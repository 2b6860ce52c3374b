//! Signed byte ranges and the `/Contents` placeholder.
//!
//! A PDF signature covers everything except the hex string holding the
//! signature itself. The covered region is described by a four-integer
//! array `[offset1 length1 offset2 length2]`: the bytes before the
//! opening `<` of the `/Contents` value and the bytes after its closing
//! `>`.

use crate::error::{Error, Result};

/// The two byte runs covered by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange(pub [i64; 4]);

impl ByteRange {
    /// Describe a document of `total_len` bytes whose `/Contents` value
    /// starts at `contents_start` and occupies `placeholder_len` bytes
    /// (angle brackets included).
    pub fn around_placeholder(
        total_len: usize,
        contents_start: usize,
        placeholder_len: usize,
    ) -> Self {
        let after = contents_start + placeholder_len;
        ByteRange([
            0,
            contents_start as i64,
            after as i64,
            total_len as i64 - after as i64,
        ])
    }

    /// Check that the range starts at zero, ends at the file size and
    /// has no overlap between its two runs.
    pub fn validate_covers(&self, file_size: usize) -> Result<()> {
        let [offset1, length1, offset2, length2] = self.0;
        if offset1 != 0 {
            return Err(Error::InvalidByteRange(format!(
                "range must start at 0, got {}",
                offset1
            )));
        }
        if length1 < 0 || length2 < 0 || offset2 < length1 {
            return Err(Error::InvalidByteRange(format!(
                "inconsistent range [{} {} {} {}]",
                offset1, length1, offset2, length2
            )));
        }
        if offset2 + length2 != file_size as i64 {
            return Err(Error::InvalidByteRange(format!(
                "range ends at {}, file has {} bytes",
                offset2 + length2,
                file_size
            )));
        }
        Ok(())
    }

    /// Concatenate the two covered runs of `data`.
    pub fn covered_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        let [offset1, length1, offset2, length2] = self.0;
        if offset1 < 0 || length1 < 0 || offset2 < 0 || length2 < 0 {
            return Err(Error::InvalidByteRange("negative offset or length".into()));
        }
        let (o1, l1, o2, l2) = (
            offset1 as usize,
            length1 as usize,
            offset2 as usize,
            length2 as usize,
        );
        if o1 + l1 > data.len() || o2 + l2 > data.len() {
            return Err(Error::InvalidByteRange(format!(
                "range [{} {} {} {}] exceeds {} bytes",
                offset1,
                length1,
                offset2,
                length2,
                data.len()
            )));
        }
        let mut covered = Vec::with_capacity(l1 + l2);
        covered.extend_from_slice(&data[o1..o1 + l1]);
        covered.extend_from_slice(&data[o2..o2 + l2]);
        Ok(covered)
    }
}

/// Build a zero-filled `/Contents` placeholder reserving `capacity`
/// signature bytes (each byte is two hex digits, plus the brackets).
pub fn contents_placeholder(capacity: usize) -> String {
    format!("<{}>", "0".repeat(capacity * 2))
}

/// Write the DER signature into the placeholder at `contents_start`,
/// hex-encoded and zero-padded to the reserved width.
pub fn write_contents_hex(
    data: &mut [u8],
    contents_start: usize,
    der: &[u8],
    placeholder_len: usize,
) -> Result<()> {
    let needed = der.len() * 2 + 2;
    if needed > placeholder_len {
        return Err(Error::SignatureTooLarge {
            size: der.len(),
            capacity: (placeholder_len - 2) / 2,
        });
    }
    if contents_start + placeholder_len > data.len() {
        return Err(Error::InvalidByteRange(
            "placeholder lies outside the document".into(),
        ));
    }
    let hex = hex_upper(der);
    let target = &mut data[contents_start..contents_start + placeholder_len];
    target[1..1 + hex.len()].copy_from_slice(hex.as_bytes());
    Ok(())
}

/// Convert bytes to an uppercase hex string.
pub(crate) fn hex_upper(bytes: &[u8]) -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0F) as usize] as char);
    }
    out
}
