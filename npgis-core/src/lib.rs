//! Fiscal report signing for retail fuel stations.
//!
//! A typed report is built into a fixed-order XML fragment, canonicalized,
//! signed with RSA-SHA1 using the station key from a PKCS#12 keystore, and
//! wrapped in an `NPGIS` envelope ready for submission.
//!
//! # Examples
//! ```rust,no_run
//! use npgis_core::{config::Config, report::FiscalReport, sign::FiscalSigner};
//!
//! # async fn run(report: FiscalReport) -> Result<(), npgis_core::Error> {
//! let signer = FiscalSigner::new(Config::from_env("/etc/npgis/station.p12"));
//! signer.config().validate()?;
//! // Load the key once, bounded by the configured timeout.
//! signer.reload_with_timeout().await?;
//! let envelope = signer.sign_report(&report)?;
//! println!("{envelope}");
//! # Ok(())
//! # }
//! ```
pub mod canonical;
pub mod config;
pub mod envelope;
pub mod keystore;
pub mod report;
pub mod sign;

use thiserror::Error;

pub use canonical::{CanonicalXml, canonicalize};
pub use config::{Config, ConfigError};
pub use envelope::SignedEnvelope;
pub use keystore::{KeystoreError, LoadError, SigningKey};
pub use report::{FiscalReport, ValidationError};
pub use sign::{Base64Signature, FiscalSigner, SigningError};

/// Top-level error wrapper for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Xml(#[from] report::xml::ReportXmlError),
    #[error(transparent)]
    Signing(#[from] SigningError),
}

impl From<LoadError> for Error {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Config(err) => Error::Config(err),
            LoadError::Keystore(err) => Error::Keystore(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::{
        config::ConfigError,
        keystore::{KeystoreError, LoadError},
        report::{ReportField, ValidationError, ValidationIssue, ValidationKind, xml::ReportXmlError},
        sign::SigningError,
    };

    #[test]
    fn error_conversions_cover_variants() {
        let err: Error = ConfigError::MissingPassphrase.into();
        assert!(matches!(err, Error::Config(_)));

        let err: Error = KeystoreError::WrongPassphrase.into();
        assert!(matches!(err, Error::Keystore(_)));

        let err: Error = LoadError::Config(ConfigError::MissingPassphrase).into();
        assert!(matches!(err, Error::Config(ConfigError::MissingPassphrase)));

        let err: Error = LoadError::Keystore(KeystoreError::KeyMismatch).into();
        assert!(matches!(err, Error::Keystore(KeystoreError::KeyMismatch)));

        let err: Error = ValidationError::new(vec![ValidationIssue {
            field: ReportField::TranId,
            kind: ValidationKind::Empty,
            tank_index: None,
        }])
        .into();
        assert!(matches!(err, Error::Validation(_)));

        let io = std::io::Error::other("xml");
        let err: Error = ReportXmlError::Write(io).into();
        assert!(matches!(err, Error::Xml(_)));

        let err: Error = SigningError::EmptySignature.into();
        assert!(matches!(err, Error::Signing(_)));
    }

    #[test]
    fn missing_passphrase_message_names_the_variable() {
        let err: Error = ConfigError::MissingPassphrase.into();
        assert!(err.to_string().contains("NPGIS_KEYSTORE_PASSPHRASE"));
    }
}
