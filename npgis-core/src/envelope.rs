//! Final signed document handed to the transport layer.
use crate::canonical::CanonicalXml;
use crate::sign::Base64Signature;
use base64ct::{Base64, Encoding};
use std::fmt;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
pub const ENVELOPE_ROOT: &str = "NPGIS";

/// Declaration, `NPGIS` root, canonical report and signature element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope(String);

impl SignedEnvelope {
    /// Wrap an envelope read back from storage, e.g. for [`verify_envelope`].
    ///
    /// [`verify_envelope`]: crate::sign::verify_envelope
    pub fn from_stored(xml: impl Into<String>) -> Self {
        Self(xml.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Whole envelope as base64, for transports that want opaque payloads.
    pub fn to_base64(&self) -> String {
        Base64::encode_string(self.0.as_bytes())
    }

    /// Canonical report fragment, without the signature element.
    pub fn report_fragment(&self, signature_tag: &str) -> Option<&str> {
        self.split(signature_tag).map(|(fragment, _)| fragment)
    }

    /// Text of the signature element.
    pub fn signature(&self, signature_tag: &str) -> Option<&str> {
        self.split(signature_tag).map(|(_, signature)| signature)
    }

    fn split(&self, signature_tag: &str) -> Option<(&str, &str)> {
        let body = self
            .0
            .strip_prefix(XML_DECLARATION)?
            .strip_prefix(&format!("<{ENVELOPE_ROOT}>"))?
            .strip_suffix(&format!("</{ENVELOPE_ROOT}>"))?;
        let open = format!("<{signature_tag}>");
        let start = body.rfind(&open)?;
        let signature = body[start + open.len()..].strip_suffix(&format!("</{signature_tag}>"))?;
        Some((&body[..start], signature))
    }
}

impl fmt::Display for SignedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SignedEnvelope {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SignedEnvelope> for String {
    fn from(envelope: SignedEnvelope) -> Self {
        envelope.0
    }
}

/// Concatenate the envelope; no schema validation is performed.
pub fn assemble(
    canonical: &CanonicalXml,
    signature_tag: &str,
    signature: &Base64Signature,
) -> SignedEnvelope {
    let fragment = canonical.as_str();
    let value = signature.as_str();
    let mut out = String::with_capacity(
        XML_DECLARATION.len() + fragment.len() + value.len() + 2 * signature_tag.len() + 32,
    );
    out.push_str(XML_DECLARATION);
    out.push('<');
    out.push_str(ENVELOPE_ROOT);
    out.push('>');
    out.push_str(fragment);
    out.push('<');
    out.push_str(signature_tag);
    out.push('>');
    out.push_str(value);
    out.push_str("</");
    out.push_str(signature_tag);
    out.push('>');
    out.push_str("</");
    out.push_str(ENVELOPE_ROOT);
    out.push('>');
    SignedEnvelope(out)
}
