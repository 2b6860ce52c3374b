//! PKCS#7 / CMS `SignedData` assembly and decoding.
//!
//! The embedded signature container carries the signer certificate chain,
//! algorithm identifiers, signed attributes (content type, signing time,
//! message digest) and the signature bytes. Only the subset of CMS this
//! subsystem produces and consumes is handled here; errors are plain
//! strings that callers wrap into their own error types.

use crate::signatures::types::{HashAlgorithm, KeyAlgorithm, SignatureAlgorithm};

use chrono::{DateTime, Utc};
use num_bigint::{BigInt, BigUint, Sign};
use simple_asn1::{from_der, oid, to_der, ASN1Block, ASN1Class, OID};
use x509_parser::prelude::*;

type Pkcs7Result<T> = std::result::Result<T, String>;

/// Inputs for assembling a `SignedData` container.
pub(crate) struct SignedDataSpec<'a> {
    /// Algorithm the signature was produced with.
    pub algorithm: SignatureAlgorithm,
    /// Certificate chain, leaf first. The leaf identifies the signer.
    pub certificates: &'a [Vec<u8>],
    /// Hash over the signed byte range.
    pub document_hash: &'a [u8],
    /// Raw signature bytes from the transport.
    pub signature: &'a [u8],
    /// Signing time for the signed attributes.
    pub signing_time: DateTime<Utc>,
}

/// The fields this subsystem reads back out of a `SignedData` container.
#[derive(Debug, Clone)]
pub(crate) struct ParsedSignedData {
    /// Embedded certificates as raw DER, in container order.
    pub certificates: Vec<Vec<u8>>,
    /// Serial number of the signer certificate.
    pub signer_serial: BigUint,
    /// Declared digest algorithm, when recognized.
    pub digest: Option<HashAlgorithm>,
    /// Declared signature algorithm identifier.
    pub signature_algorithm_oid: OID,
    /// Signing time from the signed attributes.
    pub signing_time: Option<DateTime<Utc>>,
    /// The messageDigest attribute value.
    pub message_digest: Vec<u8>,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

fn tag0() -> BigUint {
    BigUint::from(0u8)
}

fn algorithm_identifier(oid: OID, with_null_params: bool) -> ASN1Block {
    let mut items = vec![ASN1Block::ObjectIdentifier(0, oid)];
    if with_null_params {
        items.push(ASN1Block::Null(0));
    }
    ASN1Block::Sequence(0, items)
}

fn attribute(attr_oid: OID, value: ASN1Block) -> ASN1Block {
    ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, attr_oid),
            ASN1Block::Set(0, vec![value]),
        ],
    )
}

fn digest_oid(hash: HashAlgorithm) -> OID {
    match hash {
        HashAlgorithm::Sha256 => oid!(2, 16, 840, 1, 101, 3, 4, 2, 1),
        HashAlgorithm::Sha384 => oid!(2, 16, 840, 1, 101, 3, 4, 2, 2),
        HashAlgorithm::Sha512 => oid!(2, 16, 840, 1, 101, 3, 4, 2, 3),
    }
}

fn hash_from_oid(o: &OID) -> Option<HashAlgorithm> {
    if *o == oid!(2, 16, 840, 1, 101, 3, 4, 2, 1) {
        Some(HashAlgorithm::Sha256)
    } else if *o == oid!(2, 16, 840, 1, 101, 3, 4, 2, 2) {
        Some(HashAlgorithm::Sha384)
    } else if *o == oid!(2, 16, 840, 1, 101, 3, 4, 2, 3) {
        Some(HashAlgorithm::Sha512)
    } else {
        None
    }
}

fn signature_oid(algorithm: SignatureAlgorithm) -> OID {
    match algorithm {
        SignatureAlgorithm::RsaPkcs1Sha256 => oid!(1, 2, 840, 113549, 1, 1, 11),
        SignatureAlgorithm::RsaPkcs1Sha384 => oid!(1, 2, 840, 113549, 1, 1, 12),
        SignatureAlgorithm::RsaPkcs1Sha512 => oid!(1, 2, 840, 113549, 1, 1, 13),
        SignatureAlgorithm::EcdsaP256Sha256 => oid!(1, 2, 840, 10045, 4, 3, 2),
        SignatureAlgorithm::EcdsaP384Sha384 => oid!(1, 2, 840, 10045, 4, 3, 3),
        SignatureAlgorithm::EcdsaP521Sha512 => oid!(1, 2, 840, 10045, 4, 3, 4),
    }
}

/// Map a declared signature algorithm identifier onto the supported set,
/// using the signer key to resolve the ECDSA curve.
pub(crate) fn algorithm_from_oid(
    o: &OID,
    key_algorithm: KeyAlgorithm,
    key_size: u32,
) -> Option<SignatureAlgorithm> {
    match key_algorithm {
        KeyAlgorithm::Rsa => {
            if *o == oid!(1, 2, 840, 113549, 1, 1, 11) {
                Some(SignatureAlgorithm::RsaPkcs1Sha256)
            } else if *o == oid!(1, 2, 840, 113549, 1, 1, 12) {
                Some(SignatureAlgorithm::RsaPkcs1Sha384)
            } else if *o == oid!(1, 2, 840, 113549, 1, 1, 13) {
                Some(SignatureAlgorithm::RsaPkcs1Sha512)
            } else {
                None
            }
        }
        KeyAlgorithm::Ecdsa => {
            if *o == oid!(1, 2, 840, 10045, 4, 3, 2) && key_size == 256 {
                Some(SignatureAlgorithm::EcdsaP256Sha256)
            } else if *o == oid!(1, 2, 840, 10045, 4, 3, 3) && key_size == 384 {
                Some(SignatureAlgorithm::EcdsaP384Sha384)
            } else if *o == oid!(1, 2, 840, 10045, 4, 3, 4) && key_size == 521 {
                Some(SignatureAlgorithm::EcdsaP521Sha512)
            } else {
                None
            }
        }
    }
}

/// Issuer name block and serial number of the signer certificate, for the
/// `issuerAndSerialNumber` field.
fn issuer_and_serial(cert_der: &[u8]) -> Pkcs7Result<(ASN1Block, BigInt)> {
    let (_, cert) = X509Certificate::from_der(cert_der).map_err(|e| e.to_string())?;
    let issuer_raw = cert.tbs_certificate.issuer.as_raw();
    let mut blocks = from_der(issuer_raw).map_err(|e| e.to_string())?;
    if blocks.len() != 1 {
        return Err("unexpected issuer encoding".into());
    }
    let serial = BigInt::from_biguint(
        Sign::Plus,
        BigUint::from_bytes_be(cert.tbs_certificate.raw_serial()),
    );
    Ok((blocks.remove(0), serial))
}

/// Assemble a DER-encoded `SignedData` container.
pub(crate) fn build_signed_data(spec: &SignedDataSpec<'_>) -> Pkcs7Result<Vec<u8>> {
    let leaf = spec.certificates.first().ok_or("no signer certificate")?;
    let (issuer, serial) = issuer_and_serial(leaf)?;
    let digest_alg = algorithm_identifier(digest_oid(spec.algorithm.hash_algorithm()), true);

    // Signed attributes: content-type, signing-time, message-digest.
    let attributes = [
        attribute(
            oid!(1, 2, 840, 113549, 1, 9, 3),
            ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 7, 1)),
        ),
        attribute(
            oid!(1, 2, 840, 113549, 1, 9, 5),
            ASN1Block::UTCTime(0, spec.signing_time),
        ),
        attribute(
            oid!(1, 2, 840, 113549, 1, 9, 4),
            ASN1Block::OctetString(0, spec.document_hash.to_vec()),
        ),
    ];
    let mut attrs_content = Vec::new();
    for attr in &attributes {
        attrs_content.extend(to_der(attr).map_err(|e| e.to_string())?);
    }

    let rsa = spec.algorithm.key_algorithm() == KeyAlgorithm::Rsa;
    let signer_info = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Integer(0, BigInt::from(1)),
            ASN1Block::Sequence(0, vec![issuer, ASN1Block::Integer(0, serial)]),
            digest_alg.clone(),
            ASN1Block::Unknown(ASN1Class::ContextSpecific, true, 0, tag0(), attrs_content),
            algorithm_identifier(signature_oid(spec.algorithm), rsa),
            ASN1Block::OctetString(0, spec.signature.to_vec()),
        ],
    );

    let mut certs_content = Vec::new();
    for cert in spec.certificates {
        certs_content.extend_from_slice(cert);
    }

    let signed_data = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::Integer(0, BigInt::from(1)),
            ASN1Block::Set(0, vec![digest_alg]),
            ASN1Block::Sequence(
                0,
                vec![ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 7, 1))],
            ),
            ASN1Block::Unknown(ASN1Class::ContextSpecific, true, 0, tag0(), certs_content),
            ASN1Block::Set(0, vec![signer_info]),
        ],
    );

    let content_info = ASN1Block::Sequence(
        0,
        vec![
            ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 7, 2)),
            ASN1Block::Explicit(
                ASN1Class::ContextSpecific,
                0,
                tag0(),
                Box::new(signed_data),
            ),
        ],
    );
    to_der(&content_info).map_err(|e| e.to_string())
}

/// Decode the fields of a `SignedData` container.
///
/// Accepts trailing padding after the outer object (the `/Contents`
/// placeholder is zero-padded to its reserved width).
pub(crate) fn parse_signed_data(der: &[u8]) -> Pkcs7Result<ParsedSignedData> {
    let der = trim_der(der)?;
    let blocks = from_der(der).map_err(|e| format!("DER parse error: {}", e))?;
    let children = match blocks.first() {
        Some(ASN1Block::Sequence(_, children)) => children,
        _ => return Err("top-level is not a SEQUENCE".into()),
    };
    match children.first() {
        Some(ASN1Block::ObjectIdentifier(_, o)) if *o == oid!(1, 2, 840, 113549, 1, 7, 2) => {}
        _ => return Err("not a SignedData content type".into()),
    }
    let signed = signed_data_children(children.get(1))?;
    let certificates = find_certificate_ders(&signed)?;

    let signer_info = match signed.last() {
        Some(ASN1Block::Set(_, items)) => match items.first() {
            Some(ASN1Block::Sequence(_, info)) => info.clone(),
            _ => return Err("SignerInfo SET is empty".into()),
        },
        _ => return Err("SignerInfos SET missing".into()),
    };
    if signer_info.len() < 6 {
        return Err("SignerInfo too short".into());
    }

    let signer_serial = match &signer_info[1] {
        ASN1Block::Sequence(_, parts) if parts.len() == 2 => match &parts[1] {
            ASN1Block::Integer(_, serial) => BigUint::from_bytes_be(&serial.to_signed_bytes_be()),
            _ => return Err("serialNumber is not an INTEGER".into()),
        },
        _ => return Err("issuerAndSerialNumber missing".into()),
    };

    let digest = match &signer_info[2] {
        ASN1Block::Sequence(_, items) => match items.first() {
            Some(ASN1Block::ObjectIdentifier(_, o)) => hash_from_oid(o),
            _ => return Err("digestAlgorithm missing".into()),
        },
        _ => return Err("digestAlgorithm missing".into()),
    };

    let mut found = None;
    for (i, block) in signer_info.iter().enumerate() {
        match block {
            ASN1Block::Unknown(ASN1Class::ContextSpecific, _, _, tag, content)
                if *tag == tag0() =>
            {
                let blocks =
                    from_der(content).map_err(|e| format!("signedAttrs parse error: {}", e))?;
                found = Some((i, blocks));
                break;
            }
            ASN1Block::Explicit(ASN1Class::ContextSpecific, _, tag, inner) if *tag == tag0() => {
                found = Some((i, vec![(**inner).clone()]));
                break;
            }
            _ => {}
        }
    }
    let (attrs_index, attr_blocks) = found.ok_or("signedAttrs [0] not found")?;
    let message_digest =
        attribute_value(&attr_blocks, &oid!(1, 2, 840, 113549, 1, 9, 4)).and_then(|v| match v {
            ASN1Block::OctetString(_, bytes) => Some(bytes.clone()),
            _ => None,
        });
    let signing_time =
        attribute_value(&attr_blocks, &oid!(1, 2, 840, 113549, 1, 9, 5)).and_then(|v| match v {
            ASN1Block::UTCTime(_, at) => Some(*at),
            ASN1Block::GeneralizedTime(_, at) => Some(*at),
            _ => None,
        });

    let signature_algorithm_oid = match signer_info.get(attrs_index + 1) {
        Some(ASN1Block::Sequence(_, items)) => match items.first() {
            Some(ASN1Block::ObjectIdentifier(_, o)) => o.clone(),
            _ => return Err("signatureAlgorithm missing".into()),
        },
        _ => return Err("signatureAlgorithm missing".into()),
    };
    let signature = match signer_info.get(attrs_index + 2) {
        Some(ASN1Block::OctetString(_, bytes)) => bytes.clone(),
        _ => return Err("signature value missing".into()),
    };

    Ok(ParsedSignedData {
        certificates,
        signer_serial,
        digest,
        signature_algorithm_oid,
        signing_time,
        message_digest: message_digest.ok_or("messageDigest attribute not found")?,
        signature,
    })
}

fn signed_data_children(block: Option<&ASN1Block>) -> Pkcs7Result<Vec<ASN1Block>> {
    match block {
        Some(ASN1Block::Explicit(ASN1Class::ContextSpecific, _, _, inner)) => {
            match inner.as_ref() {
                ASN1Block::Sequence(_, children) => Ok(children.clone()),
                _ => Err("SignedData is not a SEQUENCE".into()),
            }
        }
        Some(ASN1Block::Unknown(ASN1Class::ContextSpecific, _, _, _, content)) => {
            let parsed = from_der(content).map_err(|e| format!("SignedData parse error: {}", e))?;
            match parsed.into_iter().next() {
                Some(ASN1Block::Sequence(_, children)) => Ok(children),
                _ => Err("SignedData is not a SEQUENCE".into()),
            }
        }
        _ => Err("SignedData content missing".into()),
    }
}

fn find_certificate_ders(signed: &[ASN1Block]) -> Pkcs7Result<Vec<Vec<u8>>> {
    for block in signed {
        match block {
            ASN1Block::Unknown(ASN1Class::ContextSpecific, _, _, tag, content)
                if *tag == tag0() =>
            {
                return split_der_blocks(content);
            }
            ASN1Block::Explicit(ASN1Class::ContextSpecific, _, tag, inner) if *tag == tag0() => {
                return to_der(inner).map(|der| vec![der]).map_err(|e| e.to_string());
            }
            _ => {}
        }
    }
    Ok(Vec::new())
}

fn attribute_value<'a>(attrs: &'a [ASN1Block], wanted: &OID) -> Option<&'a ASN1Block> {
    for attr in attrs {
        if let ASN1Block::Sequence(_, items) = attr {
            if let Some(ASN1Block::ObjectIdentifier(_, o)) = items.first() {
                if o == wanted {
                    if let Some(ASN1Block::Set(_, values)) = items.get(1) {
                        return values.first();
                    }
                }
            }
        }
    }
    None
}

/// Total encoded length of the DER object at the start of `bytes`.
fn der_object_len(bytes: &[u8]) -> Pkcs7Result<usize> {
    if bytes.len() < 2 {
        return Err("DER object too short".into());
    }
    let first = bytes[1];
    if first & 0x80 == 0 {
        let total = 2 + first as usize;
        if bytes.len() < total {
            return Err("DER object truncated".into());
        }
        return Ok(total);
    }
    let len_bytes = (first & 0x7F) as usize;
    if len_bytes == 0 || len_bytes > 4 || bytes.len() < 2 + len_bytes {
        return Err("unsupported DER length encoding".into());
    }
    let mut len: usize = 0;
    for &b in &bytes[2..2 + len_bytes] {
        len = (len << 8) | b as usize;
    }
    let total = 2 + len_bytes + len;
    if bytes.len() < total {
        return Err("DER object truncated".into());
    }
    Ok(total)
}

/// Slice off trailing padding after the outer DER object.
pub(crate) fn trim_der(bytes: &[u8]) -> Pkcs7Result<&[u8]> {
    let total = der_object_len(bytes)?;
    Ok(&bytes[..total])
}

fn split_der_blocks(mut bytes: &[u8]) -> Pkcs7Result<Vec<Vec<u8>>> {
    let mut blocks = Vec::new();
    while !bytes.is_empty() {
        let len = der_object_len(bytes)?;
        blocks.push(bytes[..len].to_vec());
        bytes = &bytes[len..];
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use chrono::TimeZone;

    #[test]
    fn test_trim_der_short_form() {
        let der = to_der(&ASN1Block::OctetString(0, vec![1, 2, 3])).unwrap();
        let mut padded = der.clone();
        padded.extend_from_slice(&[0u8; 16]);
        assert_eq!(trim_der(&padded).unwrap(), der.as_slice());
    }

    #[test]
    fn test_trim_der_long_form() {
        let der = to_der(&ASN1Block::OctetString(0, vec![7u8; 300])).unwrap();
        let mut padded = der.clone();
        padded.extend_from_slice(&[0u8; 64]);
        assert_eq!(trim_der(&padded).unwrap(), der.as_slice());
    }

    #[test]
    fn test_trim_der_truncated() {
        assert!(trim_der(&[0x30]).is_err());
        assert!(trim_der(&[0x30, 0x10, 0x00]).is_err());
    }

    #[test]
    fn test_split_der_blocks() {
        let a = to_der(&ASN1Block::OctetString(0, vec![1])).unwrap();
        let b = to_der(&ASN1Block::OctetString(0, vec![2, 3])).unwrap();
        let mut joined = a.clone();
        joined.extend_from_slice(&b);
        let blocks = split_der_blocks(&joined).unwrap();
        assert_eq!(blocks, vec![a, b]);
    }

    #[test]
    fn test_build_and_parse_round_trip() {
        let identity = testutil::p256_identity();
        let signing_time = Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap();
        let document_hash = HashAlgorithm::Sha256.digest(b"signed bytes");
        let signature = vec![0xAB; 70];

        let der = build_signed_data(&SignedDataSpec {
            algorithm: SignatureAlgorithm::EcdsaP256Sha256,
            certificates: &[identity.cert_der.clone()],
            document_hash: &document_hash,
            signature: &signature,
            signing_time,
        })
        .unwrap();

        // Parsing tolerates the zero padding the placeholder adds.
        let mut padded = der.clone();
        padded.extend_from_slice(&[0u8; 100]);
        let parsed = parse_signed_data(&padded).unwrap();

        assert_eq!(parsed.certificates, vec![identity.cert_der.clone()]);
        assert_eq!(parsed.digest, Some(HashAlgorithm::Sha256));
        assert_eq!(parsed.message_digest, document_hash);
        assert_eq!(parsed.signature, signature);
        assert_eq!(parsed.signing_time, Some(signing_time));
        assert_eq!(
            algorithm_from_oid(&parsed.signature_algorithm_oid, KeyAlgorithm::Ecdsa, 256),
            Some(SignatureAlgorithm::EcdsaP256Sha256)
        );
    }

    #[test]
    fn test_build_carries_full_chain() {
        let leaf = testutil::p256_identity();
        let issuer = testutil::p384_identity();
        let der = build_signed_data(&SignedDataSpec {
            algorithm: SignatureAlgorithm::EcdsaP256Sha256,
            certificates: &[leaf.cert_der.clone(), issuer.cert_der.clone()],
            document_hash: &[0u8; 32],
            signature: &[1u8; 70],
            signing_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        })
        .unwrap();
        let parsed = parse_signed_data(&der).unwrap();
        assert_eq!(parsed.certificates.len(), 2);
        assert_eq!(parsed.certificates[0], leaf.cert_der);
        assert_eq!(parsed.certificates[1], issuer.cert_der);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_signed_data(&[0xFF, 0x00, 0x01]).is_err());
        let not_signed_data = to_der(&ASN1Block::Sequence(
            0,
            vec![ASN1Block::ObjectIdentifier(0, oid!(1, 2, 840, 113549, 1, 7, 1))],
        ))
        .unwrap();
        assert!(parse_signed_data(&not_signed_data).is_err());
    }

    #[test]
    fn test_algorithm_from_oid_requires_matching_curve() {
        let ecdsa_sha256 = oid!(1, 2, 840, 10045, 4, 3, 2);
        assert_eq!(
            algorithm_from_oid(&ecdsa_sha256, KeyAlgorithm::Ecdsa, 384),
            None
        );
        assert_eq!(
            algorithm_from_oid(&ecdsa_sha256, KeyAlgorithm::Rsa, 2048),
            None
        );
    }
}
