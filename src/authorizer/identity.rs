//! Certificate identity extraction.
//!
//! Parses a PEM-encoded X.509 client certificate and renders its subject
//! distinguished name in RFC 4514 string form, which is the identity the
//! authorizer hands back to the gateway as `principalId`.
//!
//! # DN rendering
//!
//! | Rule | Example |
//! |------|---------|
//! | RDNs in reverse encoded order, joined by `,` | `C=US, O=Acme, CN=svc` → `CN=svc,O=Acme,C=US` |
//! | multi-valued RDN members joined by `+` | `CN=svc+UID=42` |
//! | registry short names, dotted OID otherwise | `CN`, `O`, `1.2.3.4` |
//! | special characters backslash-escaped | `O=Acme\, Inc.` |
//! | BMP, Universal and Teletex strings decoded to text | `CN=svc` |
//! | non-string values as `#` + hex of their full DER encoding | `1.2.3.4=#0101ff` |
//!
//! No chain, signature, validity-window or revocation checks happen here:
//! the transport has already terminated TLS and this module only reads
//! what the certificate says.

use x509_parser::asn1_rs::Any;
use x509_parser::certificate::X509Certificate;
use x509_parser::objects::{oid2abbrev, oid_registry};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::FromDer;
use x509_parser::x509::{AttributeTypeAndValue, X509Name};

use crate::error::CertificateError;

/// PEM label a client certificate block must carry.
const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Universal tag numbers of the string types decoded by hand.
const TAG_TELETEX_STRING: u32 = 20;
const TAG_VISIBLE_STRING: u32 = 26;
const TAG_UNIVERSAL_STRING: u32 = 28;
const TAG_BMP_STRING: u32 = 30;

// ─────────────────────────────────────────────────────────────────────────────
// Certificate identity
// ─────────────────────────────────────────────────────────────────────────────

/// Identity fields read from a client certificate.
///
/// Only `subject_dn` feeds the decision; issuer and serial travel along
/// for audit logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertIdentity {
    /// Subject DN in RFC 4514 form. Never empty.
    pub subject_dn: String,

    /// Issuer DN in RFC 4514 form. May be empty for malformed issuers.
    pub issuer_dn: String,

    /// Serial number as colon-separated lowercase hex.
    pub serial_number: String,
}

impl CertIdentity {
    /// Parse the first PEM block of `pem` as a client certificate.
    ///
    /// # Errors
    ///
    /// Returns a [`CertificateError`] if the payload is not PEM, the first
    /// block is not labelled `CERTIFICATE`, the contents are not a valid
    /// X.509 structure, or the subject is empty.
    pub fn from_pem(pem: &str) -> Result<Self, CertificateError> {
        let (_, block) = parse_x509_pem(pem.trim().as_bytes())
            .map_err(|e| CertificateError::Pem(e.to_string()))?;

        if block.label != CERTIFICATE_LABEL {
            return Err(CertificateError::UnexpectedLabel(block.label));
        }

        Self::from_der(&block.contents)
    }

    /// Parse a DER-encoded certificate.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError::Der`] if the bytes are not a certificate
    /// and [`CertificateError::EmptySubject`] if the subject has no
    /// attributes.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CertificateError::Der(e.to_string()))?;

        let subject_dn = render_dn(cert.subject());
        if subject_dn.is_empty() {
            return Err(CertificateError::EmptySubject);
        }

        Ok(Self {
            subject_dn,
            issuer_dn: render_dn(cert.issuer()),
            serial_number: cert.raw_serial_as_string(),
        })
    }
}

/// Parse a raw client certificate and return its identity.
///
/// Thin wrapper over [`CertIdentity::from_pem`], the single fallible step
/// of the decision procedure.
pub fn parse_client_certificate(pem: &str) -> Result<CertIdentity, CertificateError> {
    CertIdentity::from_pem(pem)
}

// ─────────────────────────────────────────────────────────────────────────────
// RFC 4514 rendering
// ─────────────────────────────────────────────────────────────────────────────

/// Render a distinguished name as an RFC 4514 string.
pub fn render_dn(name: &X509Name<'_>) -> String {
    let rdns: Vec<String> = name
        .iter_rdn()
        .map(|rdn| {
            rdn.iter()
                .map(render_attribute)
                .collect::<Vec<_>>()
                .join("+")
        })
        .filter(|rdn| !rdn.is_empty())
        .collect();

    rdns.into_iter().rev().collect::<Vec<_>>().join(",")
}

fn render_attribute(attr: &AttributeTypeAndValue<'_>) -> String {
    let oid = attr.attr_type();
    let key = oid2abbrev(oid, oid_registry())
        .map_or_else(|_| oid.to_id_string(), str::to_owned);

    let any = attr.attr_value();
    let text = match attr.as_str() {
        Ok(s) => Some(s.to_owned()),
        Err(_) => decode_string(any.header.tag().0, any.as_bytes()),
    };

    let value = match text {
        Some(s) => escape_value(&s),
        None => format!("#{}", hex::encode(encode_der(any))),
    };

    format!("{key}={value}")
}

/// Decode the character string types `as_str` does not cover.
///
/// `tag` is the universal tag number, `bytes` the content octets.
fn decode_string(tag: u32, bytes: &[u8]) -> Option<String> {
    match tag {
        // Teletex read as Latin-1, the subset CAs actually emit; Visible is ASCII.
        TAG_TELETEX_STRING | TAG_VISIBLE_STRING => {
            Some(bytes.iter().map(|&b| char::from(b)).collect())
        }
        // UniversalString: UCS-4 big endian
        TAG_UNIVERSAL_STRING => {
            if bytes.len() % 4 != 0 {
                return None;
            }
            bytes
                .chunks_exact(4)
                .map(|c| char::from_u32(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
                .collect()
        }
        // BMPString: UCS-2 big endian
        TAG_BMP_STRING => {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16(&units).ok()
        }
        _ => None,
    }
}

/// Full DER encoding (identifier, length, content) of an attribute value.
fn encode_der(any: &Any<'_>) -> Vec<u8> {
    let content = any.as_bytes();
    let tag = any.header.tag().0;
    let class = any.header.class() as u8;
    let constructed = u8::from(any.header.is_constructed());

    let mut out = Vec::with_capacity(content.len() + 8);
    let leading = (class << 6) | (constructed << 5);
    if tag < 0x1f {
        // tag < 31 fits the low five bits
        out.push(leading | u8::try_from(tag).unwrap_or(0x1f));
    } else {
        out.push(leading | 0x1f);
        out.extend(base128(tag));
    }

    let len = content.len();
    if len < 0x80 {
        out.push(u8::try_from(len).unwrap_or_default());
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count();
        let significant = &bytes[skip..];
        out.push(0x80 | u8::try_from(significant.len()).unwrap_or_default());
        out.extend_from_slice(significant);
    }

    out.extend_from_slice(content);
    out
}

/// High-tag-number form: base-128, most significant group first.
fn base128(mut value: u32) -> Vec<u8> {
    let mut groups = vec![u8::try_from(value & 0x7f).unwrap_or_default()];
    value >>= 7;
    while value > 0 {
        groups.push(0x80 | u8::try_from(value & 0x7f).unwrap_or_default());
        value >>= 7;
    }
    groups.reverse();
    groups
}

/// Escape an attribute value per RFC 4514 §2.4.
fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);

    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' => {
                out.push('\\');
                out.push(c);
            }
            '#' if i == 0 => out.push_str("\\#"),
            ' ' if i == 0 || i == last => out.push_str("\\ "),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }

    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
