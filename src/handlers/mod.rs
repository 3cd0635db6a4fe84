//! Security handlers for PDF encryption/decryption

mod dictionary;
mod standard;

pub use dictionary::{EncryptionDictionary, STANDARD_CRYPT_FILTER};
pub use standard::StandardSecurityHandler;
