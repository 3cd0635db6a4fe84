//! Cipher primitives: RC4, AES-CBC and the digests the key schedules are built from

mod aes;
mod engine;
mod random;
mod rc4;

pub(crate) use self::aes::{
    aes128_cbc_encrypt_no_padding, aes256_cbc_decrypt_no_padding, aes256_cbc_encrypt_no_padding,
    aes256_ecb_decrypt_block, aes256_ecb_encrypt_block, AESProvider,
};
pub(crate) use self::engine::PDFCryptoEngine;
pub(crate) use self::rc4::{rc4_apply, RC4Provider};
pub(crate) use self::random::check_source as check_random_source;
pub use self::random::{OsRandom, RandomSource};

use md5::Md5;
use sha2::{Digest, Sha256};

use crate::error::PDFSecurityResult;

/// String/stream cipher for one algorithm, selected once per document
pub(crate) trait CryptoProvider: Send + Sync {
    /// Encrypt `data` under an object key
    fn encrypt(
        &self,
        key: &[u8],
        data: &[u8],
        rng: &mut dyn RandomSource,
    ) -> PDFSecurityResult<Vec<u8>>;

    /// Decrypt `data` under an object key
    fn decrypt(&self, key: &[u8], data: &[u8]) -> PDFSecurityResult<Vec<u8>>;
}

/// MD5 over the concatenation of `parts`
pub(crate) fn md5_digest(parts: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; 16];
    digest.copy_from_slice(&hasher.finalize());
    digest
}

/// SHA-256 over the concatenation of `parts`
pub(crate) fn sha256_digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    digest
}
