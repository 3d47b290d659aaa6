//! RSA-SHA1 signatures over canonical report XML.
use crate::Error;
use crate::canonical::{CanonicalXml, canonicalize};
use crate::config::{Config, ConfigError, is_xml_name};
use crate::envelope::{self, SignedEnvelope};
use crate::keystore::{self, LoadError, SigningKey};
use crate::report::FiscalReport;
use crate::report::xml::{ToXml, XmlOptions};
use base64ct::{Base64, Encoding};
use rsa::{
    RsaPublicKey,
    pkcs1v15::{self, VerifyingKey},
    pkcs8::DecodePublicKey,
    signature::{SignatureEncoding, Signer, Verifier},
};
use sha1::Sha1;
use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use x509_cert::{
    Certificate,
    der::{Decode, Encode},
};

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("signature primitive failed: {0}")]
    Primitive(String),
    #[error("signature primitive produced no bytes")]
    EmptySignature,
    #[error("signature is not valid base64")]
    InvalidBase64,
    #[error("signature bytes are malformed: {0}")]
    MalformedSignature(String),
    #[error("signature does not match the canonical report")]
    VerificationFailed,
    #[error("certificate parse error: {0}")]
    Certificate(String),
    #[error("envelope has no '{tag}' signature element")]
    MalformedEnvelope { tag: String },
}

/// Base64 text of a PKCS#1 v1.5 signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Base64Signature(String);

impl Base64Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_encoded(value: String) -> Self {
        Self(value)
    }

    /// Raw signature bytes.
    pub fn decode(&self) -> Result<Vec<u8>, SigningError> {
        Base64::decode_vec(&self.0).map_err(|_| SigningError::InvalidBase64)
    }
}

impl fmt::Display for Base64Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Base64Signature {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize `fragment` and sign it.
pub fn sign(fragment: &str, key: &SigningKey) -> Result<Base64Signature, SigningError> {
    sign_canonical(&canonicalize(fragment), key)
}

/// SHA-1 digest of the canonical bytes, RSA PKCS#1 v1.5 signed, base64 encoded.
///
/// Signing is deterministic: the same bytes and key always give the same
/// signature.
pub fn sign_canonical(
    canonical: &CanonicalXml,
    key: &SigningKey,
) -> Result<Base64Signature, SigningError> {
    let signature = key
        .signer()
        .try_sign(canonical.as_bytes())
        .map_err(|e| SigningError::Primitive(e.to_string()))?;
    let bytes = signature.to_bytes();
    if bytes.is_empty() {
        return Err(SigningError::EmptySignature);
    }
    Ok(Base64Signature(Base64::encode_string(&bytes)))
}

/// Check `signature` against the canonical form of `fragment`.
pub fn verify(
    fragment: &str,
    signature: &str,
    verifying_key: &VerifyingKey<Sha1>,
) -> Result<(), SigningError> {
    let canonical = canonicalize(fragment);
    let bytes = Base64::decode_vec(signature.trim()).map_err(|_| SigningError::InvalidBase64)?;
    let signature = pkcs1v15::Signature::try_from(bytes.as_slice())
        .map_err(|e| SigningError::MalformedSignature(e.to_string()))?;
    verifying_key
        .verify(canonical.as_bytes(), &signature)
        .map_err(|_| SigningError::VerificationFailed)
}

/// Public key of a DER certificate, ready for [`verify`].
pub fn verifying_key_from_certificate(cert_der: &[u8]) -> Result<VerifyingKey<Sha1>, SigningError> {
    let certificate =
        Certificate::from_der(cert_der).map_err(|e| SigningError::Certificate(e.to_string()))?;
    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| SigningError::Certificate(e.to_string()))?;
    let public_key = RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| SigningError::Certificate(e.to_string()))?;
    Ok(VerifyingKey::<Sha1>::new(public_key))
}

/// Re-check a stored envelope against the signer's certificate.
pub fn verify_envelope(
    envelope: &SignedEnvelope,
    signature_tag: &str,
    cert_der: &[u8],
) -> Result<(), SigningError> {
    let malformed = || SigningError::MalformedEnvelope {
        tag: signature_tag.to_string(),
    };
    let fragment = envelope.report_fragment(signature_tag).ok_or_else(malformed)?;
    let signature = envelope.signature(signature_tag).ok_or_else(malformed)?;
    verify(fragment, signature, &verifying_key_from_certificate(cert_der)?)
}

/// Full pipeline with a cached signing key.
///
/// The key is loaded on first use and shared read-only by every signing call.
/// [`FiscalSigner::reload`] parses the keystore again without blocking
/// signers, then swaps the new key in; calls already holding the old key
/// finish with it. Reloads run one at a time, so the cached key is always
/// the one parsed last.
///
/// The lazy first load in [`FiscalSigner::signing_key`] has no time bound.
/// Prime the cache with [`FiscalSigner::reload_with_timeout`] at startup to
/// apply [`Config::load_timeout`].
///
/// # Examples
/// ```rust,no_run
/// use npgis_core::{config::Config, sign::FiscalSigner};
///
/// # async fn run() -> Result<(), npgis_core::Error> {
/// let signer = FiscalSigner::new(Config::from_env("/etc/npgis/station.p12"));
/// signer.config().validate()?;
/// signer.reload_with_timeout().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FiscalSigner {
    config: Config,
    key: RwLock<Option<Arc<SigningKey>>>,
    reload_lock: Mutex<()>,
}

impl FiscalSigner {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            key: RwLock::new(None),
            reload_lock: Mutex::new(()),
        }
    }

    /// Start with an already loaded key.
    pub fn with_key(config: Config, key: SigningKey) -> Self {
        Self {
            config,
            key: RwLock::new(Some(Arc::new(key))),
            reload_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cached key, loading it from the configured keystore if needed.
    ///
    /// The load on a cold cache blocks for as long as reading and parsing the
    /// keystore takes; [`Config::load_timeout`] is not applied here.
    pub fn signing_key(&self) -> Result<Arc<SigningKey>, LoadError> {
        if let Some(key) = self.cached() {
            return Ok(key);
        }
        let loaded = Arc::new(keystore::load_file(
            self.config.keystore_path(),
            self.config.passphrase(),
        )?);
        let mut slot = self.key.write().unwrap_or_else(PoisonError::into_inner);
        // A concurrent first call may have filled the slot meanwhile.
        Ok(Arc::clone(slot.get_or_insert(loaded)))
    }

    /// Parse the keystore again and replace the cached key.
    ///
    /// On failure the previous key stays in place. Concurrent reloads wait
    /// for each other, so a slow parse never replaces a newer key.
    ///
    /// # Panics
    /// When called from inside an async runtime; use
    /// [`FiscalSigner::reload_with_timeout`] there.
    pub fn reload(&self) -> Result<Arc<SigningKey>, LoadError> {
        let _serial = self.reload_lock.blocking_lock();
        let result = keystore::load_file(self.config.keystore_path(), self.config.passphrase());
        self.install(result)
    }

    /// [`FiscalSigner::reload`] bounded by the configured load timeout.
    ///
    /// The timeout covers the load only, not the wait behind another reload.
    pub async fn reload_with_timeout(&self) -> Result<Arc<SigningKey>, LoadError> {
        let _serial = self.reload_lock.lock().await;
        let result = keystore::load_file_with_timeout(
            self.config.keystore_path(),
            self.config.passphrase(),
            self.config.load_timeout(),
        )
        .await;
        self.install(result)
    }

    /// Validate, build, canonicalize, sign and wrap one report.
    ///
    /// # Errors
    /// Any [`Error`] variant; no envelope is produced on failure.
    pub fn sign_report(&self, report: &FiscalReport) -> Result<SignedEnvelope, Error> {
        let tag = self.config.signature_tag();
        if !is_xml_name(tag) {
            return Err(ConfigError::InvalidSignatureTag {
                tag: tag.to_string(),
            }
            .into());
        }
        report.validate()?;

        let fragment = report.to_xml_with(XmlOptions::compact(self.config.escaping()))?;
        let canonical = canonicalize(&fragment);
        let key = self.signing_key()?;
        let signature = sign_canonical(&canonical, &key)?;
        info!(
            kind = %report.kind(),
            tran_id = report.tran_id(),
            bytes = canonical.as_bytes().len(),
            "signed fiscal report"
        );
        Ok(envelope::assemble(&canonical, tag, &signature))
    }

    fn cached(&self) -> Option<Arc<SigningKey>> {
        self.key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn install(
        &self,
        result: Result<SigningKey, LoadError>,
    ) -> Result<Arc<SigningKey>, LoadError> {
        let key = match result {
            Ok(key) => Arc::new(key),
            Err(err) => {
                warn!(error = %err, "keystore reload failed, keeping previous key");
                return Err(err);
            }
        };
        let previous = self
            .key
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&key));
        match previous {
            Some(old) => info!(
                previous = %old.serial_number(),
                current = %key.serial_number(),
                "signing key rotated"
            ),
            None => debug!(current = %key.serial_number(), "signing key installed"),
        }
        Ok(key)
    }
}
