//! AES encryption provider implementation

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};

use super::{CryptoProvider, RandomSource};
use crate::error::{PDFSecurityError, PDFSecurityResult};

const BLOCK_SIZE: usize = 16;

/// AES block cipher keyed for either PDF key size
enum AesCipher {
    Aes128(Aes128),
    Aes256(Aes256),
}

impl AesCipher {
    fn new(key: &[u8]) -> PDFSecurityResult<Self> {
        match key.len() {
            16 => Ok(Self::Aes128(Aes128::new_from_slice(key)?)),
            32 => Ok(Self::Aes256(Aes256::new_from_slice(key)?)),
            other => Err(PDFSecurityError::InvalidKeyLength(other)),
        }
    }

    fn encrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut [u8]) {
        let block = GenericArray::from_mut_slice(block);
        match self {
            Self::Aes128(cipher) => cipher.decrypt_block(block),
            Self::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }

    /// CBC-encrypt `buf` in place; its length must be a multiple of the block size
    fn cbc_encrypt(&self, iv: &[u8; BLOCK_SIZE], buf: &mut [u8]) {
        let mut prev_block = *iv;
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            for (b, p) in chunk.iter_mut().zip(prev_block.iter()) {
                *b ^= p;
            }
            self.encrypt_block(chunk);
            prev_block.copy_from_slice(chunk);
        }
    }

    /// CBC-decrypt `buf` in place; its length must be a multiple of the block size
    fn cbc_decrypt(&self, iv: &[u8; BLOCK_SIZE], buf: &mut [u8]) {
        let mut prev_block = *iv;
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            let mut saved_block = [0u8; BLOCK_SIZE];
            saved_block.copy_from_slice(chunk);

            self.decrypt_block(chunk);
            for (b, p) in chunk.iter_mut().zip(prev_block.iter()) {
                *b ^= p;
            }

            prev_block = saved_block;
        }
    }
}

/// AES-CBC encrypt with PKCS#7 padding. Output is `iv || ciphertext`.
pub(crate) fn aes_cbc_encrypt(
    key: &[u8],
    iv: &[u8; BLOCK_SIZE],
    plaintext: &[u8],
) -> PDFSecurityResult<Vec<u8>> {
    let cipher = AesCipher::new(key)?;

    let padding_len = BLOCK_SIZE - (plaintext.len() % BLOCK_SIZE);
    let mut buf = Vec::with_capacity(BLOCK_SIZE + plaintext.len() + padding_len);
    buf.extend_from_slice(iv);
    buf.extend_from_slice(plaintext);
    buf.resize(buf.len() + padding_len, padding_len as u8);

    cipher.cbc_encrypt(iv, &mut buf[BLOCK_SIZE..]);
    Ok(buf)
}

/// Reverse [`aes_cbc_encrypt`]: strip the IV prefix, decrypt, validate and strip padding
pub(crate) fn aes_cbc_decrypt(key: &[u8], data: &[u8]) -> PDFSecurityResult<Vec<u8>> {
    let cipher = AesCipher::new(key)?;

    if data.len() < 2 * BLOCK_SIZE {
        return Err(PDFSecurityError::malformed_ciphertext(format!(
            "{} bytes is shorter than an IV plus one block",
            data.len()
        )));
    }
    if data.len() % BLOCK_SIZE != 0 {
        return Err(PDFSecurityError::malformed_ciphertext(format!(
            "{} bytes is not a whole number of blocks",
            data.len()
        )));
    }

    let (iv_bytes, ciphertext) = data.split_at(BLOCK_SIZE);
    let mut iv = [0u8; BLOCK_SIZE];
    iv.copy_from_slice(iv_bytes);

    let mut buf = ciphertext.to_vec();
    cipher.cbc_decrypt(&iv, &mut buf);

    let padding_len = buf.last().copied().unwrap_or(0) as usize;
    if padding_len == 0 || padding_len > BLOCK_SIZE {
        return Err(PDFSecurityError::malformed_ciphertext(format!(
            "invalid padding length {}",
            padding_len
        )));
    }
    let body_len = buf.len() - padding_len;
    if buf[body_len..].iter().any(|&b| b as usize != padding_len) {
        return Err(PDFSecurityError::malformed_ciphertext(
            "inconsistent padding bytes",
        ));
    }

    buf.truncate(body_len);
    Ok(buf)
}

fn cbc_no_padding(
    key: &[u8],
    iv: &[u8; BLOCK_SIZE],
    data: &[u8],
    encrypt: bool,
) -> PDFSecurityResult<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(PDFSecurityError::malformed_ciphertext(format!(
            "{} bytes is not a whole number of blocks",
            data.len()
        )));
    }

    let cipher = AesCipher::new(key)?;
    let mut buf = data.to_vec();
    if encrypt {
        cipher.cbc_encrypt(iv, &mut buf);
    } else {
        cipher.cbc_decrypt(iv, &mut buf);
    }
    Ok(buf)
}

/// AES-128-CBC without padding, used by the revision 6 hardening hash
pub(crate) fn aes128_cbc_encrypt_no_padding(
    key: &[u8],
    iv: &[u8; BLOCK_SIZE],
    data: &[u8],
) -> PDFSecurityResult<Vec<u8>> {
    if key.len() != 16 {
        return Err(PDFSecurityError::InvalidKeyLength(key.len()));
    }
    cbc_no_padding(key, iv, data, true)
}

/// AES-256-CBC without padding, zero IV: wraps the file key into /UE and /OE
pub(crate) fn aes256_cbc_encrypt_no_padding(
    key: &[u8],
    data: &[u8],
) -> PDFSecurityResult<Vec<u8>> {
    if key.len() != 32 {
        return Err(PDFSecurityError::InvalidKeyLength(key.len()));
    }
    cbc_no_padding(key, &[0u8; BLOCK_SIZE], data, true)
}

/// Unwrap /UE or /OE
pub(crate) fn aes256_cbc_decrypt_no_padding(
    key: &[u8],
    data: &[u8],
) -> PDFSecurityResult<Vec<u8>> {
    if key.len() != 32 {
        return Err(PDFSecurityError::InvalidKeyLength(key.len()));
    }
    cbc_no_padding(key, &[0u8; BLOCK_SIZE], data, false)
}

/// AES-256-ECB on a single block, used for /Perms
pub(crate) fn aes256_ecb_encrypt_block(
    key: &[u8],
    block: &[u8; BLOCK_SIZE],
) -> PDFSecurityResult<[u8; BLOCK_SIZE]> {
    if key.len() != 32 {
        return Err(PDFSecurityError::InvalidKeyLength(key.len()));
    }
    let cipher = AesCipher::new(key)?;
    let mut out = *block;
    cipher.encrypt_block(&mut out);
    Ok(out)
}

/// Inverse of [`aes256_ecb_encrypt_block`]
pub(crate) fn aes256_ecb_decrypt_block(
    key: &[u8],
    block: &[u8; BLOCK_SIZE],
) -> PDFSecurityResult<[u8; BLOCK_SIZE]> {
    if key.len() != 32 {
        return Err(PDFSecurityError::InvalidKeyLength(key.len()));
    }
    let cipher = AesCipher::new(key)?;
    let mut out = *block;
    cipher.decrypt_block(&mut out);
    Ok(out)
}

/// AES-CBC provider for AESV2 (128-bit) and AESV3 (256-bit) crypt filters
pub(crate) struct AESProvider {
    key_length: usize,
}

impl AESProvider {
    pub fn new(key_length: usize) -> Self {
        Self { key_length }
    }
}

impl CryptoProvider for AESProvider {
    fn encrypt(
        &self,
        key: &[u8],
        data: &[u8],
        rng: &mut dyn RandomSource,
    ) -> PDFSecurityResult<Vec<u8>> {
        if key.len() != self.key_length {
            return Err(PDFSecurityError::InvalidKeyLength(key.len()));
        }

        let mut iv = [0u8; BLOCK_SIZE];
        rng.fill(&mut iv)?;
        aes_cbc_encrypt(key, &iv, data)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> PDFSecurityResult<Vec<u8>> {
        if key.len() != self.key_length {
            return Err(PDFSecurityError::InvalidKeyLength(key.len()));
        }

        aes_cbc_decrypt(key, data)
    }
}
