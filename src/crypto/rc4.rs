//! RC4 encryption provider implementation

use rc4::consts::{U10, U11, U12, U13, U14, U15, U16, U5, U6, U7, U8, U9};
use rc4::{KeyInit, Rc4, StreamCipher};

use super::{CryptoProvider, RandomSource};
use crate::error::{PDFSecurityError, PDFSecurityResult};

// PDF RC4 keys are 40 to 128 bits; the key size is a type parameter of the cipher.
macro_rules! rc4_keystream {
    ($key:expr, $data:expr, $($len:literal => $size:ty),+ $(,)?) => {
        match $key.len() {
            $(
                $len => {
                    let mut cipher = Rc4::<$size>::new_from_slice($key)
                        .map_err(|_| PDFSecurityError::InvalidKeyLength($len))?;
                    cipher.apply_keystream($data);
                }
            )+
            other => return Err(PDFSecurityError::InvalidKeyLength(other)),
        }
    };
}

/// Apply the RC4 keystream for `key` to `data` in place.
///
/// RC4 is symmetric, the same call encrypts and decrypts.
pub(crate) fn rc4_apply(key: &[u8], data: &mut [u8]) -> PDFSecurityResult<()> {
    rc4_keystream!(key, data,
        5 => U5, 6 => U6, 7 => U7, 8 => U8, 9 => U9, 10 => U10,
        11 => U11, 12 => U12, 13 => U13, 14 => U14, 15 => U15, 16 => U16,
    );
    Ok(())
}

/// RC4 encryption provider
#[derive(Debug, Default)]
pub(crate) struct RC4Provider;

impl RC4Provider {
    /// Create new RC4 provider
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for RC4Provider {
    fn encrypt(
        &self,
        key: &[u8],
        data: &[u8],
        _rng: &mut dyn RandomSource,
    ) -> PDFSecurityResult<Vec<u8>> {
        let mut out = data.to_vec();
        rc4_apply(key, &mut out)?;
        Ok(out)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> PDFSecurityResult<Vec<u8>> {
        let mut out = data.to_vec();
        rc4_apply(key, &mut out)?;
        Ok(out)
    }
}
