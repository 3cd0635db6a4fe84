//! Standard Security Handler (ISO 32000 password-based encryption)

use log::debug;
use zeroize::Zeroizing;

use super::EncryptionDictionary;
use crate::crypto::RandomSource;
use crate::error::PDFSecurityResult;
use crate::security::{
    authenticate_legacy, authenticate_modern, compute_legacy_file_key,
    compute_legacy_owner_value, compute_legacy_user_value, compute_modern_owner_values,
    compute_modern_user_values, compute_perms_value, EncryptionParameters, FileEncryptionKey,
    ObjectEncryptor, PasswordKind, SecurityRevision,
};

/// Length of a generated owner password
const RANDOM_OWNER_PASSWORD_LEN: usize = 32;

/// Standard security handler for password-based encryption.
///
/// Holds the /Encrypt entries together with the file key they protect. Built either
/// from fresh [`EncryptionParameters`] or by authenticating against an existing
/// dictionary.
pub struct StandardSecurityHandler {
    dictionary: EncryptionDictionary,
    file_key: FileEncryptionKey,
    password_kind: Option<PasswordKind>,
}

impl StandardSecurityHandler {
    /// Derive the file key and every password validation entry for a new encryption.
    ///
    /// An absent or empty owner password is replaced by random bytes, so the
    /// document can then only be opened with the user password.
    pub fn new(
        params: &EncryptionParameters,
        document_id: &[u8],
        rng: &mut dyn RandomSource,
    ) -> PDFSecurityResult<Self> {
        let revision = params.validate()?;
        let p = params.permissions.encode(revision);
        let encrypt_metadata = params.encrypt_metadata || revision.revision() < 4;

        let owner_password = match params.owner_password.as_deref() {
            Some(password) if !password.is_empty() => Zeroizing::new(password.to_vec()),
            _ => {
                debug!("No owner password supplied, generating one");
                let mut random = Zeroizing::new(vec![0u8; RANDOM_OWNER_PASSWORD_LEN]);
                rng.fill(&mut random)?;
                random
            }
        };
        let user_password = &params.user_password;

        let (dictionary, file_key) = if revision.is_aes_256() {
            let mut file_key = Zeroizing::new(vec![0u8; revision.key_length_bytes()]);
            rng.fill(&mut file_key)?;

            let (u, ue) = compute_modern_user_values(revision, &file_key, user_password, rng)?;
            let (o, oe) =
                compute_modern_owner_values(revision, &file_key, &owner_password, &u, rng)?;
            let perms = compute_perms_value(&file_key, p, encrypt_metadata, rng)?;

            let dictionary = EncryptionDictionary {
                revision,
                o,
                u,
                oe: Some(oe),
                ue: Some(ue),
                perms: Some(perms),
                p,
                encrypt_metadata,
            };
            (dictionary, file_key)
        } else {
            let o = compute_legacy_owner_value(revision, &owner_password, user_password)?;
            let file_key = compute_legacy_file_key(
                revision,
                user_password,
                &o,
                p,
                document_id,
                encrypt_metadata,
            );
            let u = compute_legacy_user_value(revision, &file_key, document_id)?;

            let dictionary = EncryptionDictionary {
                revision,
                o,
                u,
                oe: None,
                ue: None,
                perms: None,
                p,
                encrypt_metadata,
            };
            (dictionary, file_key)
        };

        debug!(
            "Created standard security handler: {}, P={}, user password {} bytes",
            revision,
            p,
            user_password.len()
        );

        Ok(Self {
            dictionary,
            file_key: FileEncryptionKey::new(file_key.to_vec()),
            password_kind: None,
        })
    }

    /// Authenticate `password` against an existing dictionary, recovering the file key
    pub fn authenticate(
        dictionary: EncryptionDictionary,
        document_id: &[u8],
        password: &[u8],
    ) -> PDFSecurityResult<Self> {
        debug!(
            "Attempting password authentication for {}",
            dictionary.revision
        );

        let (file_key, kind) = if dictionary.revision.is_aes_256() {
            authenticate_modern(&dictionary, password)?
        } else {
            authenticate_legacy(&dictionary, document_id, password)?
        };

        Ok(Self {
            dictionary,
            file_key,
            password_kind: Some(kind),
        })
    }

    pub fn revision(&self) -> SecurityRevision {
        self.dictionary.revision
    }

    pub fn dictionary(&self) -> &EncryptionDictionary {
        &self.dictionary
    }

    pub fn file_key(&self) -> &FileEncryptionKey {
        &self.file_key
    }

    /// The password that opened the handler; `None` for a freshly created one
    pub fn password_kind(&self) -> Option<PasswordKind> {
        self.password_kind
    }

    /// Encryptor for the document's objects under this handler's file key
    pub fn object_encryptor(&self) -> ObjectEncryptor {
        ObjectEncryptor::new(
            self.revision(),
            self.file_key.clone(),
            self.dictionary.encrypt_metadata,
        )
    }
}
