//! PKCS#12 keystore loading.
use crate::config::ConfigError;
use base64ct::{Base64, Encoding};
use p12_keystore::KeyStore;
use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs1v15,
    pkcs8::{DecodePrivateKey, DecodePublicKey},
};
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;
use tracing::debug;
use x509_cert::{
    Certificate,
    der::{Decode, Encode},
};

/// Failure to turn keystore bytes into a usable signing key.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("failed to read keystore {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("keystore passphrase is incorrect")]
    WrongPassphrase,
    #[error("keystore container is unreadable: {0}")]
    Container(#[source] p12_keystore::error::Error),
    #[error("keystore holds no private key with a matching certificate")]
    MissingPrivateKey,
    #[error("keystore private key has no certificate")]
    MissingCertificate,
    #[error("certificate parse error: {0}")]
    Certificate(String),
    #[error("private key is not a usable RSA key: {0}")]
    UnsupportedKey(String),
    #[error("certificate public key does not match the private key")]
    KeyMismatch,
    #[error("keystore loading did not finish within {after:?}")]
    Timeout { after: Duration },
    #[error("keystore loading task failed: {0}")]
    Task(String),
}

impl From<p12_keystore::error::Error> for KeystoreError {
    fn from(err: p12_keystore::error::Error) -> Self {
        match err {
            p12_keystore::error::Error::MacError(_) => KeystoreError::WrongPassphrase,
            other => KeystoreError::Container(other),
        }
    }
}

/// Either the passphrase was never configured or the keystore itself is bad.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
}

/// RSA private key plus the certificate it was issued with.
///
/// Immutable once loaded; share it behind an `Arc` across signing threads.
pub struct SigningKey {
    alias: String,
    signer: pkcs1v15::SigningKey<Sha1>,
    verifier: pkcs1v15::VerifyingKey<Sha1>,
    certificate: Certificate,
    certificate_der: Vec<u8>,
}

impl SigningKey {
    /// Build from a PKCS#8 private key and a DER certificate.
    ///
    /// # Errors
    /// Returns [`KeystoreError::KeyMismatch`] when the certificate was issued
    /// for another key.
    pub fn from_der(
        alias: impl Into<String>,
        private_key_der: &[u8],
        cert_der: &[u8],
    ) -> Result<Self, KeystoreError> {
        let certificate = Certificate::from_der(cert_der)
            .map_err(|e| KeystoreError::Certificate(e.to_string()))?;
        let private_key = RsaPrivateKey::from_pkcs8_der(private_key_der)
            .map_err(|e| KeystoreError::UnsupportedKey(e.to_string()))?;

        let spki = certificate
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| KeystoreError::Certificate(e.to_string()))?;
        let cert_public = RsaPublicKey::from_public_key_der(&spki)
            .map_err(|e| KeystoreError::Certificate(e.to_string()))?;
        if cert_public != private_key.to_public_key() {
            return Err(KeystoreError::KeyMismatch);
        }

        Ok(Self {
            alias: alias.into(),
            signer: pkcs1v15::SigningKey::<Sha1>::new(private_key),
            verifier: pkcs1v15::VerifyingKey::<Sha1>::new(cert_public),
            certificate,
            certificate_der: cert_der.to_vec(),
        })
    }

    /// Keystore alias (friendly name) of the key entry.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    pub fn certificate_base64(&self) -> String {
        Base64::encode_string(&self.certificate_der)
    }

    pub fn subject(&self) -> String {
        self.certificate.tbs_certificate.subject.to_string()
    }

    /// Certificate serial number in decimal.
    pub fn serial_number(&self) -> String {
        serial_bytes_to_decimal_string(self.certificate.tbs_certificate.serial_number.as_bytes())
    }

    pub fn verifying_key(&self) -> &pkcs1v15::VerifyingKey<Sha1> {
        &self.verifier
    }

    pub(crate) fn signer(&self) -> &pkcs1v15::SigningKey<Sha1> {
        &self.signer
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("alias", &self.alias)
            .field("subject", &self.subject())
            .field("serial", &self.serial_number())
            .finish_non_exhaustive()
    }
}

/// Parse a PKCS#12 container and extract the first private key entry.
///
/// # Errors
/// [`ConfigError::MissingPassphrase`] when `passphrase` is `None`, otherwise
/// a [`KeystoreError`] describing why the container is unusable.
pub fn load(container: &[u8], passphrase: Option<&SecretString>) -> Result<SigningKey, LoadError> {
    let passphrase = passphrase.ok_or(ConfigError::MissingPassphrase)?;
    let store = KeyStore::from_pkcs12(container, passphrase.expose_secret())
        .map_err(KeystoreError::from)?;
    let (alias, chain) = store
        .private_key_chain()
        .ok_or(KeystoreError::MissingPrivateKey)?;
    let leaf = chain
        .chain()
        .first()
        .ok_or(KeystoreError::MissingCertificate)?;
    let key = SigningKey::from_der(alias, chain.key(), leaf.as_der())?;
    debug!(
        alias = key.alias(),
        subject = %key.subject(),
        serial = %key.serial_number(),
        "loaded signing key from keystore"
    );
    Ok(key)
}

/// Read the container at `path` once and [`load`] it.
pub fn load_file(
    path: impl AsRef<Path>,
    passphrase: Option<&SecretString>,
) -> Result<SigningKey, LoadError> {
    let path = path.as_ref();
    if passphrase.is_none() {
        return Err(ConfigError::MissingPassphrase.into());
    }
    let container = std::fs::read(path).map_err(|source| KeystoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    load(&container, passphrase)
}

/// Async [`load_file`] bounded by `timeout`.
///
/// Parsing runs on the blocking pool. When the deadline passes the result is
/// abandoned and [`KeystoreError::Timeout`] is returned.
pub async fn load_file_with_timeout(
    path: impl AsRef<Path>,
    passphrase: Option<&SecretString>,
    timeout: Duration,
) -> Result<SigningKey, LoadError> {
    let passphrase = passphrase.cloned().ok_or(ConfigError::MissingPassphrase)?;
    let path = path.as_ref().to_path_buf();

    let work = async move {
        let container = tokio::fs::read(&path)
            .await
            .map_err(|source| KeystoreError::Read {
                path: path.clone(),
                source,
            })?;
        let key = tokio::task::spawn_blocking(move || load(&container, Some(&passphrase)))
            .await
            .map_err(|e| KeystoreError::Task(e.to_string()))??;
        Ok::<SigningKey, LoadError>(key)
    };

    match tokio::time::timeout(timeout, work).await {
        Ok(result) => result,
        Err(_) => Err(KeystoreError::Timeout { after: timeout }.into()),
    }
}

fn serial_bytes_to_decimal_string(bytes: &[u8]) -> String {
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            let value = u32::from(*digit) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }
    digits.iter().rev().map(|d| char::from(b'0' + d)).collect()
}
