//! PDF Standard Security Handler for Rust
//!
//! Password-based encryption and decryption of an in-memory PDF object graph, covering
//! revisions 2 to 6 of the standard security handler (RC4 40/128-bit, AES-128, AES-256).
//!
//! ```no_run
//! use pdf_security::{Document, EncryptionParameters, PDFProtector, Permissions};
//!
//! # fn main() -> pdf_security::PDFSecurityResult<()> {
//! let mut document = Document::new();
//! let mut protector = PDFProtector::new()?;
//! let params = EncryptionParameters::aes_128()
//!     .user_password("orange123")
//!     .permissions(Permissions::all());
//! protector.encrypt(&mut document, &params)?;
//! let bytes = document.save()?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

mod crypto;
mod error;
mod handlers;
pub mod pdf;
mod security;

use log::debug;

use crypto::check_random_source;

pub use crypto::{OsRandom, RandomSource};
pub use error::{PDFSecurityError, PDFSecurityResult};
pub use handlers::{EncryptionDictionary, StandardSecurityHandler, STANDARD_CRYPT_FILTER};
pub use pdf::{Dictionary, Document, Object, ObjectId, Stream};
pub use security::{
    CipherAlgorithm, EncryptionParameters, FileEncryptionKey, ObjectEncryptor, PasswordKind,
    PermissionBits, Permissions, PrintPermission, SecurityRevision,
};

/// Information about a document's encryption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionInfo {
    pub revision: SecurityRevision,
    pub cipher: CipherAlgorithm,
    pub key_length_bits: u16,
    /// /P as stored
    pub permission_value: i32,
    pub permissions: Permissions,
    pub encrypt_metadata: bool,
}

impl From<&EncryptionDictionary> for EncryptionInfo {
    fn from(dictionary: &EncryptionDictionary) -> Self {
        let revision = dictionary.revision;
        Self {
            revision,
            cipher: revision.cipher(),
            key_length_bits: revision.key_length_bits(),
            permission_value: dictionary.p,
            permissions: dictionary.permissions(),
            encrypt_metadata: dictionary.encrypt_metadata,
        }
    }
}

/// Main PDF encryption/decryption interface.
///
/// Owns the random source used for owner passwords, salts, IVs and document
/// identifiers. The source is checked once at construction.
pub struct PDFProtector<R: RandomSource = OsRandom> {
    rng: R,
}

impl PDFProtector<OsRandom> {
    /// Protector backed by the operating system CSPRNG
    pub fn new() -> PDFSecurityResult<Self> {
        Self::with_random_source(OsRandom::default())
    }
}

impl<R: RandomSource> PDFProtector<R> {
    /// Protector backed by `rng`, which must be cryptographically secure in production
    pub fn with_random_source(mut rng: R) -> PDFSecurityResult<Self> {
        check_random_source(&mut rng)?;
        Ok(Self { rng })
    }

    /// Encrypt `document` in place and attach its /Encrypt dictionary.
    ///
    /// A trailer /ID is generated when missing, and the header version is raised to the
    /// lowest one that knows the chosen revision. On error the document must be discarded.
    pub fn encrypt(
        &mut self,
        document: &mut Document,
        params: &EncryptionParameters,
    ) -> PDFSecurityResult<EncryptionInfo> {
        if document.is_encrypted() {
            return Err(PDFSecurityError::AlreadyEncrypted);
        }
        let revision = params.validate()?;

        let document_id = document.ensure_identity(&mut self.rng)?;
        let handler = StandardSecurityHandler::new(params, &document_id, &mut self.rng)?;
        let count = handler
            .object_encryptor()
            .encrypt_document(document, &mut self.rng)?;

        let encrypt_id = document.add_object(handler.dictionary().to_dict());
        document.trailer.set("Encrypt", encrypt_id);

        let minimum = revision.minimum_pdf_version();
        if document.version < minimum {
            debug!(
                "Raising header version from {}.{} to {}.{}",
                document.version.0, document.version.1, minimum.0, minimum.1
            );
            document.version = minimum;
        }

        debug!(
            "Encrypted {} objects with {}, /Encrypt at {} {}",
            count, revision, encrypt_id.0, encrypt_id.1
        );
        Ok(EncryptionInfo::from(handler.dictionary()))
    }

    /// Decrypt `document` in place with the user or owner password, then drop its
    /// /Encrypt dictionary
    pub fn decrypt(
        &self,
        document: &mut Document,
        password: impl AsRef<[u8]>,
    ) -> PDFSecurityResult<()> {
        let handler = open(document, password.as_ref())?;
        let count = handler.object_encryptor().decrypt_document(document)?;

        if let Some(id) = document.encryption_reference() {
            document.remove_object(id);
        }
        document.trailer.remove("Encrypt");

        debug!("Decrypted {} objects", count);
        Ok(())
    }

    /// Recover the file key of an encrypted document without modifying it
    pub fn authenticate(
        &self,
        document: &Document,
        password: impl AsRef<[u8]>,
    ) -> PDFSecurityResult<FileEncryptionKey> {
        Ok(open(document, password.as_ref())?.file_key().clone())
    }

    /// Permissions granted to a user of an encrypted document
    pub fn permissions(&self, document: &Document) -> PDFSecurityResult<Permissions> {
        Ok(self.encryption_info(document)?.permissions)
    }

    /// Get encryption information from an encrypted document
    pub fn encryption_info(&self, document: &Document) -> PDFSecurityResult<EncryptionInfo> {
        let dictionary = EncryptionDictionary::from_dict(document.encryption_dictionary()?)?;
        Ok(EncryptionInfo::from(&dictionary))
    }
}

/// Authenticate against a serialized /Encrypt dictionary.
///
/// `document_id` is the first element of the trailer /ID; revisions 5 and 6 ignore it.
/// Returns the file key for either password, or [`PDFSecurityError::InvalidPassword`].
pub fn authenticate(
    encrypt: &Dictionary,
    document_id: &[u8],
    password: &[u8],
) -> PDFSecurityResult<FileEncryptionKey> {
    let dictionary = EncryptionDictionary::from_dict(encrypt)?;
    let handler = StandardSecurityHandler::authenticate(dictionary, document_id, password)?;
    Ok(handler.file_key().clone())
}

fn open(document: &Document, password: &[u8]) -> PDFSecurityResult<StandardSecurityHandler> {
    let dictionary = EncryptionDictionary::from_dict(document.encryption_dictionary()?)?;
    let document_id = if dictionary.revision.is_aes_256() {
        document.identity().unwrap_or(&[])
    } else {
        document.identity()?
    };
    StandardSecurityHandler::authenticate(dictionary, document_id, password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{CryptoRng, RngCore, SeedableRng};

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    impl CryptoRng for BrokenRng {}

    fn protector() -> PDFProtector<StdRng> {
        PDFProtector::with_random_source(StdRng::seed_from_u64(41)).unwrap()
    }

    #[test_log::test]
    fn test_broken_random_source_rejected() {
        assert!(matches!(
            PDFProtector::with_random_source(BrokenRng),
            Err(PDFSecurityError::InsecureRandomSource(_))
        ));
    }

    #[test_log::test]
    fn test_os_random_source() -> PDFSecurityResult<()> {
        PDFProtector::new()?;
        Ok(())
    }

    #[test_log::test]
    fn test_already_encrypted_guard() -> PDFSecurityResult<()> {
        let mut protector = protector();
        let mut document = Document::new();
        let params = EncryptionParameters::rc4_128().user_password("a");

        protector.encrypt(&mut document, &params)?;
        let snapshot = document.clone();
        assert!(matches!(
            protector.encrypt(&mut document, &params),
            Err(PDFSecurityError::AlreadyEncrypted)
        ));
        assert_eq!(document, snapshot);
        Ok(())
    }

    #[test_log::test]
    fn test_header_version_raised() -> PDFSecurityResult<()> {
        let mut protector = protector();

        let mut document = Document::with_version(1, 3);
        protector.encrypt(&mut document, &EncryptionParameters::aes_128())?;
        assert_eq!(document.version, (1, 6));

        let mut document = Document::with_version(1, 7);
        protector.encrypt(&mut document, &EncryptionParameters::rc4_40())?;
        assert_eq!(document.version, (1, 7));
        Ok(())
    }

    #[test_log::test]
    fn test_not_encrypted() {
        let protector = protector();
        let mut document = Document::new();
        assert!(matches!(
            protector.decrypt(&mut document, "pw"),
            Err(PDFSecurityError::NotEncrypted)
        ));
        assert!(matches!(
            protector.permissions(&document),
            Err(PDFSecurityError::NotEncrypted)
        ));
    }

    #[test_log::test]
    fn test_authenticate_entry_point() -> PDFSecurityResult<()> {
        let mut protector = protector();
        let mut document = Document::new();
        let params = EncryptionParameters::rc4_40()
            .user_password("user")
            .owner_password("owner");
        protector.encrypt(&mut document, &params)?;

        let encrypt = document.encryption_dictionary()?.clone();
        let id = document.identity()?.to_vec();
        let user_key = authenticate(&encrypt, &id, b"user")?;
        let owner_key = authenticate(&encrypt, &id, b"owner")?;
        assert_eq!(user_key, owner_key);
        assert_eq!(user_key, protector.authenticate(&document, "user")?);
        assert!(matches!(
            authenticate(&encrypt, &id, b"guest"),
            Err(PDFSecurityError::InvalidPassword)
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_encryption_info() -> PDFSecurityResult<()> {
        let mut protector = protector();
        let mut document = Document::new();
        let returned = protector.encrypt(&mut document, &EncryptionParameters::aes_256())?;
        let info = protector.encryption_info(&document)?;

        assert_eq!(info, returned);
        assert_eq!(info.revision, SecurityRevision::R6Aes256);
        assert_eq!(info.cipher, CipherAlgorithm::AesCbc);
        assert_eq!(info.key_length_bits, 256);
        assert_eq!(info.permissions, Permissions::none());
        Ok(())
    }
}
