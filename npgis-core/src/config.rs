//! Configuration for the signing pipeline.
use crate::report::xml::XmlEscaping;
use secrecy::SecretString;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Environment variable holding the PKCS#12 keystore passphrase.
pub const PASSPHRASE_ENV: &str = "NPGIS_KEYSTORE_PASSPHRASE";

/// Wrapper tag used for the signature element unless configured otherwise.
pub const DEFAULT_SIGNATURE_TAG: &str = "EWURASignature";

/// Upper bound on keystore parsing when loaded through the async path.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised when required configuration is absent or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("keystore passphrase is not configured (set NPGIS_KEYSTORE_PASSPHRASE)")]
    MissingPassphrase,
    #[error("keystore file not found: {path}")]
    MissingKeystore { path: PathBuf },
    #[error("signature tag must be a non-empty XML name, got '{tag}'")]
    InvalidSignatureTag { tag: String },
    #[error("invalid XML escaping mode: {input}")]
    InvalidEscaping { input: String },
}

/// Configuration for [`FiscalSigner`](crate::sign::FiscalSigner).
///
/// # Examples
/// ```rust
/// use npgis_core::config::Config;
/// use secrecy::SecretString;
///
/// let config = Config::new("keys/station.p12")
///     .with_passphrase(SecretString::from("changeit"));
/// assert_eq!(config.signature_tag(), "EWURASignature");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    keystore_path: PathBuf,
    passphrase: Option<SecretString>,
    signature_tag: String,
    escaping: XmlEscaping,
    load_timeout: Duration,
}

impl Config {
    pub fn new(keystore_path: impl Into<PathBuf>) -> Self {
        Self {
            keystore_path: keystore_path.into(),
            passphrase: None,
            signature_tag: DEFAULT_SIGNATURE_TAG.to_string(),
            escaping: XmlEscaping::default(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }

    /// Build a config whose passphrase comes from [`PASSPHRASE_ENV`].
    ///
    /// A missing or empty variable leaves the passphrase unset; the error
    /// surfaces from [`Config::validate`] or the first signing attempt.
    pub fn from_env(keystore_path: impl Into<PathBuf>) -> Self {
        let passphrase = std::env::var(PASSPHRASE_ENV)
            .ok()
            .filter(|value| !value.is_empty())
            .map(SecretString::from);
        Self {
            passphrase,
            ..Self::new(keystore_path)
        }
    }

    pub fn with_passphrase(mut self, passphrase: SecretString) -> Self {
        self.passphrase = Some(passphrase);
        self
    }

    pub fn with_signature_tag(mut self, tag: impl Into<String>) -> Self {
        self.signature_tag = tag.into();
        self
    }

    pub fn with_escaping(mut self, escaping: XmlEscaping) -> Self {
        self.escaping = escaping;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn keystore_path(&self) -> &Path {
        &self.keystore_path
    }

    pub fn passphrase(&self) -> Option<&SecretString> {
        self.passphrase.as_ref()
    }

    pub fn signature_tag(&self) -> &str {
        &self.signature_tag
    }

    pub fn escaping(&self) -> XmlEscaping {
        self.escaping
    }

    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }

    /// Startup check: everything needed to offer signing is present.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.passphrase.is_none() {
            return Err(ConfigError::MissingPassphrase);
        }
        if !is_xml_name(&self.signature_tag) {
            return Err(ConfigError::InvalidSignatureTag {
                tag: self.signature_tag.clone(),
            });
        }
        if !self.keystore_path.is_file() {
            return Err(ConfigError::MissingKeystore {
                path: self.keystore_path.clone(),
            });
        }
        Ok(())
    }
}

// ASCII subset of the XML Name production; enough for wrapper tags.
pub(crate) fn is_xml_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
