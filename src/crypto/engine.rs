//! Core cryptographic engine: per-object keys and string/stream transforms

use zeroize::Zeroizing;

use super::{md5_digest, AESProvider, CryptoProvider, RC4Provider, RandomSource};
use crate::error::PDFSecurityResult;
use crate::pdf::ObjectId;
use crate::security::{FileEncryptionKey, SecurityRevision};

/// Salt appended to the object key input for AES crypt filters
const AES_SALT: &[u8; 4] = b"sAlT";

/// Encrypts and decrypts the data of individual objects under one file key.
///
/// The cipher is chosen once, from the revision, when the engine is built.
pub(crate) struct PDFCryptoEngine {
    revision: SecurityRevision,
    provider: Box<dyn CryptoProvider>,
    file_key: FileEncryptionKey,
}

impl PDFCryptoEngine {
    /// Create a new engine for `revision` keyed with the document's file key
    pub fn new(revision: SecurityRevision, file_key: FileEncryptionKey) -> Self {
        let provider: Box<dyn CryptoProvider> = match revision {
            SecurityRevision::R2Rc4_40 | SecurityRevision::R3Rc4_128 => {
                Box::new(RC4Provider::new())
            }
            SecurityRevision::R4Aes128 => Box::new(AESProvider::new(16)),
            SecurityRevision::R5Aes256 | SecurityRevision::R6Aes256 => {
                Box::new(AESProvider::new(32))
            }
        };

        Self {
            revision,
            provider,
            file_key,
        }
    }

    pub fn revision(&self) -> SecurityRevision {
        self.revision
    }

    /// Algorithm 1: derive the key for one object.
    ///
    /// AES-256 revisions use the file key unchanged. Earlier revisions hash the file key
    /// with the low-order three bytes of the object number and two bytes of the
    /// generation, plus "sAlT" for AES-128, and keep `min(n + 5, 16)` bytes.
    pub fn object_key(&self, id: ObjectId) -> Zeroizing<Vec<u8>> {
        if self.revision.is_aes_256() {
            return Zeroizing::new(self.file_key.as_bytes().to_vec());
        }

        let (number, generation) = id;
        let number_bytes = number.to_le_bytes();
        let generation_bytes = generation.to_le_bytes();
        let salt: &[u8] = if self.revision.is_aes() { AES_SALT } else { &[] };

        let hash = md5_digest(&[
            self.file_key.as_bytes(),
            &number_bytes[..3],
            &generation_bytes,
            salt,
        ]);

        let key_len = (self.file_key.len() + 5).min(16);
        Zeroizing::new(hash[..key_len].to_vec())
    }

    /// Encrypt the bytes of a string or stream belonging to object `id`
    pub fn encrypt_bytes(
        &self,
        id: ObjectId,
        data: &[u8],
        rng: &mut dyn RandomSource,
    ) -> PDFSecurityResult<Vec<u8>> {
        let key = self.object_key(id);
        self.provider.encrypt(&key, data, rng)
    }

    /// Decrypt the bytes of a string or stream belonging to object `id`
    pub fn decrypt_bytes(&self, id: ObjectId, data: &[u8]) -> PDFSecurityResult<Vec<u8>> {
        let key = self.object_key(id);
        self.provider.decrypt(&key, data)
    }
}
