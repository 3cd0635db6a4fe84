//! Error types for the PDF security handler

use std::io;
use thiserror::Error;

/// Main error type for PDF security operations
#[derive(Error, Debug)]
pub enum PDFSecurityError {
    /// Password is longer than the revision allows
    #[error("Password too long: {length} bytes exceeds the R{revision} limit of {limit} bytes")]
    PasswordTooLong {
        length: usize,
        limit: usize,
        revision: u8,
    },

    /// Revision / key length / cipher combination outside the supported set
    #[error("Unsupported revision: R{revision} with a {key_length}-bit key")]
    UnsupportedRevision {
        revision: u8,
        key_length: u16,
    },

    /// The document already carries an /Encrypt dictionary
    #[error("Document is already encrypted")]
    AlreadyEncrypted,

    /// Supplied password matches neither the user nor the owner hash
    #[error("Invalid password")]
    InvalidPassword,

    /// AES payload has a bad length or inconsistent padding
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// The random source failed to produce bytes
    #[error("Insecure random source: {0}")]
    InsecureRandomSource(String),

    /// Document has no /Encrypt dictionary
    #[error("Document is not encrypted")]
    NotEncrypted,

    /// Trailer has no usable /ID array
    #[error("Missing document identifier (/ID)")]
    MissingDocumentId,

    /// Missing required dictionary entry
    #[error("Missing required dictionary entry: {0}")]
    MissingDictionaryEntry(String),

    /// Invalid dictionary value
    #[error("Invalid dictionary value for key {key}: {message}")]
    InvalidDictionaryValue {
        key: String,
        message: String,
    },

    /// Object not found in the document
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object number that cannot appear in a cross-reference table
    #[error("Invalid object number: {0}")]
    InvalidObjectNumber(u32),

    /// Invalid key length
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// Cryptographic operation failed
    #[error("Cryptographic operation failed: {0}")]
    CryptoError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Result type for PDF security operations
pub type PDFSecurityResult<T> = Result<T, PDFSecurityError>;

impl PDFSecurityError {
    /// Create a new malformed ciphertext error
    pub fn malformed_ciphertext(msg: impl Into<String>) -> Self {
        Self::MalformedCiphertext(msg.into())
    }

    /// Create a new invalid dictionary value error
    pub fn invalid_dict_value(key: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidDictionaryValue {
            key: key.into(),
            message: msg.into(),
        }
    }

    /// Create a new missing dictionary entry error
    pub fn missing_entry(key: impl Into<String>) -> Self {
        Self::MissingDictionaryEntry(key.into())
    }

    /// Check if error is authentication related
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::InvalidPassword | Self::PasswordTooLong { .. })
    }

    /// Check if error is cryptographic
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedCiphertext(_)
                | Self::InsecureRandomSource(_)
                | Self::InvalidKeyLength(_)
                | Self::CryptoError(_)
        )
    }

    /// Check if error is related to the document structure
    pub fn is_structure_error(&self) -> bool {
        matches!(
            self,
            Self::NotEncrypted
                | Self::MissingDocumentId
                | Self::MissingDictionaryEntry(_)
                | Self::InvalidDictionaryValue { .. }
                | Self::ObjectNotFound(..)
                | Self::InvalidObjectNumber(_)
        )
    }
}

impl From<aes::cipher::InvalidLength> for PDFSecurityError {
    fn from(err: aes::cipher::InvalidLength) -> Self {
        Self::CryptoError(err.to_string())
    }
}

impl From<rand::Error> for PDFSecurityError {
    fn from(err: rand::Error) -> Self {
        Self::InsecureRandomSource(err.to_string())
    }
}
