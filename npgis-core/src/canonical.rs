//! Canonical byte form that signatures are computed over.
use std::fmt;

/// XML with inter-element whitespace removed and the ends trimmed.
///
/// Only [`canonicalize`] constructs it, so holding one means the bytes are
/// already in the form the regulator recomputes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalXml(String);

impl CanonicalXml {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalXml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalXml {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Strip whitespace runs lying strictly between `>` and the next `<`, then
/// trim the whole document.
///
/// Whitespace means the XML `S` production: space, tab, CR and LF. Other
/// Unicode spaces such as U+00A0 or U+0085 are content and survive.
///
/// Text content, attributes and entity references are left untouched. Never
/// fails, and applying it twice gives the same result as applying it once.
///
/// # Examples
/// ```rust
/// use npgis_core::canonical::canonicalize;
///
/// let canonical = canonicalize("  <A>\n  <B> x </B>\n</A>\n");
/// assert_eq!(canonical.as_str(), "<A><B> x </B></A>");
/// ```
pub fn canonicalize(xml: &str) -> CanonicalXml {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(c) = rest.chars().next() {
        if is_xml_space(c) {
            let run = rest
                .find(|ch: char| !is_xml_space(ch))
                .unwrap_or(rest.len());
            let after = &rest[run..];
            if !(out.ends_with('>') && after.starts_with('<')) {
                out.push_str(&rest[..run]);
            }
            rest = after;
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    CanonicalXml(out.trim_matches(is_xml_space).to_string())
}

fn is_xml_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}
