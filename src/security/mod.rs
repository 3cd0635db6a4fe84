//! Security handler configuration: revisions, parameters and the file encryption key

mod authentication;
mod key_derivation;
mod object_encryption;
mod permissions;

pub use authentication::PasswordKind;
pub(crate) use authentication::{
    authenticate_legacy, authenticate_modern, compute_legacy_owner_value,
    compute_legacy_user_value, compute_modern_owner_values, compute_modern_user_values,
    compute_perms_value, verify_perms_value,
};
pub(crate) use key_derivation::{check_password_length, compute_legacy_file_key};
pub use object_encryption::ObjectEncryptor;
pub use permissions::{PermissionBits, Permissions, PrintPermission};

use std::fmt;

use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{PDFSecurityError, PDFSecurityResult};

/// Longest password accepted by any revision
const MAX_PASSWORD_LEN: usize = 127;

/// Stream/string cipher requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherAlgorithm {
    /// RC4 stream cipher (revisions 2 and 3)
    Rc4,
    /// AES in CBC mode with a random IV (revisions 4 to 6)
    AesCbc,
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherAlgorithm::Rc4 => write!(f, "RC4"),
            CipherAlgorithm::AesCbc => write!(f, "AES-CBC"),
        }
    }
}

/// The supported revision/algorithm combinations.
///
/// Chosen once when parameters are validated; everything downstream matches on this
/// instead of re-checking revision numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityRevision {
    /// R2, RC4 with a 40-bit key (PDF 1.3)
    R2Rc4_40,
    /// R3, RC4 with a 128-bit key (PDF 1.4)
    R3Rc4_128,
    /// R4, AES-128 through the StdCF crypt filter (PDF 1.6)
    R4Aes128,
    /// R5, AES-256 with plain SHA-256 validation (Adobe extension level 3)
    R5Aes256,
    /// R6, AES-256 with the hardened hash (PDF 2.0)
    R6Aes256,
}

impl SecurityRevision {
    /// Resolve a revision / key length / cipher triple
    pub fn from_parts(
        revision: u8,
        key_length_bits: u16,
        cipher: CipherAlgorithm,
    ) -> PDFSecurityResult<Self> {
        use CipherAlgorithm::*;

        match (revision, key_length_bits, cipher) {
            (2, 40, Rc4) => Ok(Self::R2Rc4_40),
            (3, 128, Rc4) => Ok(Self::R3Rc4_128),
            (4, 128, AesCbc) => Ok(Self::R4Aes128),
            (5, 256, AesCbc) => Ok(Self::R5Aes256),
            (6, 256, AesCbc) => Ok(Self::R6Aes256),
            _ => Err(PDFSecurityError::UnsupportedRevision {
                revision,
                key_length: key_length_bits,
            }),
        }
    }

    /// The /R value
    pub fn revision(&self) -> u8 {
        match self {
            Self::R2Rc4_40 => 2,
            Self::R3Rc4_128 => 3,
            Self::R4Aes128 => 4,
            Self::R5Aes256 => 5,
            Self::R6Aes256 => 6,
        }
    }

    /// The /V value
    pub fn version(&self) -> u8 {
        match self {
            Self::R2Rc4_40 => 1,
            Self::R3Rc4_128 => 2,
            Self::R4Aes128 => 4,
            Self::R5Aes256 | Self::R6Aes256 => 5,
        }
    }

    pub fn key_length_bits(&self) -> u16 {
        match self {
            Self::R2Rc4_40 => 40,
            Self::R3Rc4_128 | Self::R4Aes128 => 128,
            Self::R5Aes256 | Self::R6Aes256 => 256,
        }
    }

    pub fn key_length_bytes(&self) -> usize {
        usize::from(self.key_length_bits() / 8)
    }

    pub fn cipher(&self) -> CipherAlgorithm {
        match self {
            Self::R2Rc4_40 | Self::R3Rc4_128 => CipherAlgorithm::Rc4,
            _ => CipherAlgorithm::AesCbc,
        }
    }

    pub fn is_aes(&self) -> bool {
        self.cipher() == CipherAlgorithm::AesCbc
    }

    /// R5 and R6: random file key wrapped under password-derived keys
    pub fn is_aes_256(&self) -> bool {
        matches!(self, Self::R5Aes256 | Self::R6Aes256)
    }

    /// Maximum password length in bytes.
    ///
    /// Every revision accepts up to 127 bytes; R2 to R4 then hash only the first 32.
    pub fn max_password_len(&self) -> usize {
        MAX_PASSWORD_LEN
    }

    /// Lowest header version whose readers know this revision
    pub fn minimum_pdf_version(&self) -> (u8, u8) {
        match self {
            Self::R2Rc4_40 => (1, 1),
            Self::R3Rc4_128 => (1, 4),
            Self::R4Aes128 => (1, 6),
            Self::R5Aes256 => (1, 7),
            Self::R6Aes256 => (2, 0),
        }
    }
}

impl fmt::Display for SecurityRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "R{} {}-{}",
            self.revision(),
            self.cipher(),
            self.key_length_bits()
        )
    }
}

/// Caller-supplied settings for one encryption pass
#[derive(Clone)]
pub struct EncryptionParameters {
    pub revision: u8,
    pub key_length_bits: u16,
    pub cipher: CipherAlgorithm,
    pub permissions: Permissions,
    pub user_password: Vec<u8>,
    /// `None` (or empty) means a random owner password is generated
    pub owner_password: Option<Vec<u8>>,
    pub encrypt_metadata: bool,
}

impl EncryptionParameters {
    fn preset(revision: SecurityRevision) -> Self {
        Self {
            revision: revision.revision(),
            key_length_bits: revision.key_length_bits(),
            cipher: revision.cipher(),
            permissions: Permissions::default(),
            user_password: Vec::new(),
            owner_password: None,
            encrypt_metadata: true,
        }
    }

    /// Revision 2, RC4 40-bit
    pub fn rc4_40() -> Self {
        Self::preset(SecurityRevision::R2Rc4_40)
    }

    /// Revision 3, RC4 128-bit
    pub fn rc4_128() -> Self {
        Self::preset(SecurityRevision::R3Rc4_128)
    }

    /// Revision 4, AES-128
    pub fn aes_128() -> Self {
        Self::preset(SecurityRevision::R4Aes128)
    }

    /// Revision 6, AES-256
    pub fn aes_256() -> Self {
        Self::preset(SecurityRevision::R6Aes256)
    }

    /// Revision 5, AES-256 (deprecated, kept for compatibility with older readers)
    pub fn aes_256_r5() -> Self {
        Self::preset(SecurityRevision::R5Aes256)
    }

    /// Strongest revision a reader of the given PDF version understands
    pub fn for_pdf_version(major: u8, minor: u8) -> Self {
        match (major, minor) {
            (0, _) | (1, 0..=3) => Self::rc4_40(),
            (1, 4) | (1, 5) => Self::rc4_128(),
            (1, _) => Self::aes_128(),
            _ => Self::aes_256(),
        }
    }

    pub fn user_password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.user_password = password.as_ref().to_vec();
        self
    }

    pub fn owner_password(mut self, password: impl AsRef<[u8]>) -> Self {
        self.owner_password = Some(password.as_ref().to_vec());
        self
    }

    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    pub fn encrypt_metadata(mut self, encrypt: bool) -> Self {
        self.encrypt_metadata = encrypt;
        self
    }

    /// Check the parameter combination and password lengths, resolving the revision
    pub fn validate(&self) -> PDFSecurityResult<SecurityRevision> {
        let revision =
            SecurityRevision::from_parts(self.revision, self.key_length_bits, self.cipher)?;

        check_password_length(revision, &self.user_password)?;
        if let Some(owner) = &self.owner_password {
            check_password_length(revision, owner)?;
        }

        Ok(revision)
    }
}

impl fmt::Debug for EncryptionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionParameters")
            .field("revision", &self.revision)
            .field("key_length_bits", &self.key_length_bits)
            .field("cipher", &self.cipher)
            .field("permissions", &self.permissions)
            .field("user_password_len", &self.user_password.len())
            .field(
                "owner_password_len",
                &self.owner_password.as_ref().map(Vec::len),
            )
            .field("encrypt_metadata", &self.encrypt_metadata)
            .finish()
    }
}

impl Drop for EncryptionParameters {
    fn drop(&mut self) {
        self.user_password.zeroize();
        self.owner_password.zeroize();
    }
}

/// The document's file encryption key; wiped on drop and never printed
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct FileEncryptionKey(Vec<u8>);

impl FileEncryptionKey {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for FileEncryptionKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl Eq for FileEncryptionKey {}

impl fmt::Debug for FileEncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileEncryptionKey(<{} bytes redacted>)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2, 40, CipherAlgorithm::Rc4, SecurityRevision::R2Rc4_40)]
    #[case(3, 128, CipherAlgorithm::Rc4, SecurityRevision::R3Rc4_128)]
    #[case(4, 128, CipherAlgorithm::AesCbc, SecurityRevision::R4Aes128)]
    #[case(5, 256, CipherAlgorithm::AesCbc, SecurityRevision::R5Aes256)]
    #[case(6, 256, CipherAlgorithm::AesCbc, SecurityRevision::R6Aes256)]
    fn test_supported_combinations(
        #[case] revision: u8,
        #[case] bits: u16,
        #[case] cipher: CipherAlgorithm,
        #[case] expected: SecurityRevision,
    ) {
        assert_eq!(
            SecurityRevision::from_parts(revision, bits, cipher).unwrap(),
            expected
        );
    }

    #[rstest]
    #[case(2, 128, CipherAlgorithm::Rc4)]
    #[case(3, 40, CipherAlgorithm::Rc4)]
    #[case(4, 128, CipherAlgorithm::Rc4)]
    #[case(4, 256, CipherAlgorithm::AesCbc)]
    #[case(6, 128, CipherAlgorithm::AesCbc)]
    #[case(1, 40, CipherAlgorithm::Rc4)]
    #[case(7, 256, CipherAlgorithm::AesCbc)]
    fn test_unsupported_combinations(
        #[case] revision: u8,
        #[case] bits: u16,
        #[case] cipher: CipherAlgorithm,
    ) {
        assert!(matches!(
            SecurityRevision::from_parts(revision, bits, cipher),
            Err(PDFSecurityError::UnsupportedRevision { .. })
        ));
    }

    #[test]
    fn test_version_numbers() {
        assert_eq!(SecurityRevision::R2Rc4_40.version(), 1);
        assert_eq!(SecurityRevision::R3Rc4_128.version(), 2);
        assert_eq!(SecurityRevision::R4Aes128.version(), 4);
        assert_eq!(SecurityRevision::R6Aes256.version(), 5);
        assert_eq!(SecurityRevision::R6Aes256.to_string(), "R6 AES-CBC-256");
    }

    #[test]
    fn test_for_pdf_version() {
        assert_eq!(EncryptionParameters::for_pdf_version(1, 3).revision, 2);
        assert_eq!(EncryptionParameters::for_pdf_version(1, 4).revision, 3);
        assert_eq!(EncryptionParameters::for_pdf_version(1, 5).revision, 3);
        assert_eq!(EncryptionParameters::for_pdf_version(1, 6).revision, 4);
        assert_eq!(EncryptionParameters::for_pdf_version(1, 7).revision, 4);
        assert_eq!(EncryptionParameters::for_pdf_version(2, 0).revision, 6);
    }

    #[test]
    fn test_validate_rejects_long_passwords() {
        let params = EncryptionParameters::aes_128().user_password([b'x'; 128]);
        assert!(matches!(
            params.validate(),
            Err(PDFSecurityError::PasswordTooLong {
                length: 128,
                limit: 127,
                revision: 4
            })
        ));

        let params = EncryptionParameters::rc4_40().user_password([b'x'; 40]);
        assert_eq!(params.validate().unwrap(), SecurityRevision::R2Rc4_40);

        let params = EncryptionParameters::aes_256().owner_password([b'x'; 128]);
        assert!(matches!(
            params.validate(),
            Err(PDFSecurityError::PasswordTooLong { limit: 127, .. })
        ));

        let params = EncryptionParameters::aes_256().user_password([b'x'; 127]);
        assert_eq!(params.validate().unwrap(), SecurityRevision::R6Aes256);
    }

    #[test]
    fn test_parameters_debug_hides_passwords() {
        let params = EncryptionParameters::rc4_128()
            .user_password("hunter2")
            .owner_password("sekrit");
        let rendered = format!("{:?}", params);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("sekrit"));
        assert!(rendered.contains("user_password_len: 7"));
    }

    #[test]
    fn test_file_key_debug_is_redacted() {
        let key = FileEncryptionKey::new(vec![0xAA; 16]);
        assert_eq!(format!("{:?}", key), "FileEncryptionKey(<16 bytes redacted>)");
        assert_eq!(key, FileEncryptionKey::new(vec![0xAA; 16]));
        assert_ne!(key, FileEncryptionKey::new(vec![0xAB; 16]));
    }
}
