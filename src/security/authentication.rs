//! Password validation entries (/O, /U, /OE, /UE, /Perms) and password authentication

use log::{debug, trace};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::key_derivation::{compute_hardened_hash, compute_owner_rc4_key, pad_password, PADDING};
use super::{check_password_length, compute_legacy_file_key, FileEncryptionKey, SecurityRevision};
use crate::crypto::{
    aes256_cbc_decrypt_no_padding, aes256_cbc_encrypt_no_padding, aes256_ecb_decrypt_block,
    aes256_ecb_encrypt_block, md5_digest, rc4_apply, RandomSource,
};
use crate::error::{PDFSecurityError, PDFSecurityResult};
use crate::handlers::EncryptionDictionary;

const SALT_LEN: usize = 8;
const HASH_LEN: usize = 32;
/// Marker stored in bytes 9-11 of the decrypted /Perms block
const PERMS_MARKER: &[u8; 3] = b"adb";

/// Which of the two passwords matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordKind {
    User,
    Owner,
}

fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    bool::from(a.ct_eq(b))
}

/// RC4 with `key ^ round` for each round, in the order given
fn rc4_rounds(
    key: &[u8],
    data: &mut [u8],
    rounds: impl Iterator<Item = u8>,
) -> PDFSecurityResult<()> {
    let mut round_key = Zeroizing::new(vec![0u8; key.len()]);
    for round in rounds {
        for (dst, src) in round_key.iter_mut().zip(key) {
            *dst = src ^ round;
        }
        rc4_apply(&round_key, data)?;
    }
    Ok(())
}

/// Algorithm 3: the /O entry for revisions 2 to 4
pub(crate) fn compute_legacy_owner_value(
    revision: SecurityRevision,
    owner_password: &[u8],
    user_password: &[u8],
) -> PDFSecurityResult<Vec<u8>> {
    let key = compute_owner_rc4_key(revision, owner_password);
    let mut value = pad_password(user_password).to_vec();

    if revision == SecurityRevision::R2Rc4_40 {
        rc4_apply(&key, &mut value)?;
    } else {
        rc4_rounds(&key, &mut value, 0..=19)?;
    }
    Ok(value)
}

/// Algorithms 4 and 5: the /U entry for revisions 2 to 4.
///
/// R3 and R4 produce 16 meaningful bytes; the remaining 16 are zero.
pub(crate) fn compute_legacy_user_value(
    revision: SecurityRevision,
    file_key: &[u8],
    document_id: &[u8],
) -> PDFSecurityResult<Vec<u8>> {
    if revision == SecurityRevision::R2Rc4_40 {
        let mut value = PADDING.to_vec();
        rc4_apply(file_key, &mut value)?;
        return Ok(value);
    }

    let mut value = md5_digest(&[&PADDING, document_id]).to_vec();
    rc4_rounds(file_key, &mut value, 0..=19)?;
    value.resize(32, 0);
    Ok(value)
}

/// Algorithms 8 and 9 shared part: `hash || validation salt || key salt` and the wrapped key
fn compute_modern_values(
    revision: SecurityRevision,
    file_key: &[u8],
    password: &[u8],
    user_value: Option<&[u8]>,
    rng: &mut dyn RandomSource,
) -> PDFSecurityResult<(Vec<u8>, Vec<u8>)> {
    let mut salts = [0u8; 2 * SALT_LEN];
    rng.fill(&mut salts)?;
    let (validation_salt, key_salt) = salts.split_at(SALT_LEN);

    let hash = compute_hardened_hash(revision, password, validation_salt, user_value)?;
    let mut value = Vec::with_capacity(HASH_LEN + 2 * SALT_LEN);
    value.extend_from_slice(&hash[..]);
    value.extend_from_slice(validation_salt);
    value.extend_from_slice(key_salt);

    let wrapping_key = compute_hardened_hash(revision, password, key_salt, user_value)?;
    let wrapped = aes256_cbc_encrypt_no_padding(&wrapping_key[..], file_key)?;

    Ok((value, wrapped))
}

/// Algorithm 8: /U and /UE for revisions 5 and 6
pub(crate) fn compute_modern_user_values(
    revision: SecurityRevision,
    file_key: &[u8],
    user_password: &[u8],
    rng: &mut dyn RandomSource,
) -> PDFSecurityResult<(Vec<u8>, Vec<u8>)> {
    compute_modern_values(revision, file_key, user_password, None, rng)
}

/// Algorithm 9: /O and /OE for revisions 5 and 6, bound to the 48-byte /U
pub(crate) fn compute_modern_owner_values(
    revision: SecurityRevision,
    file_key: &[u8],
    owner_password: &[u8],
    user_value: &[u8],
    rng: &mut dyn RandomSource,
) -> PDFSecurityResult<(Vec<u8>, Vec<u8>)> {
    compute_modern_values(revision, file_key, owner_password, Some(user_value), rng)
}

/// Algorithm 10: the /Perms entry
pub(crate) fn compute_perms_value(
    file_key: &[u8],
    permissions: i32,
    encrypt_metadata: bool,
    rng: &mut dyn RandomSource,
) -> PDFSecurityResult<Vec<u8>> {
    let mut block = Zeroizing::new([0u8; 16]);
    block[..4].copy_from_slice(&permissions.to_le_bytes());
    block[4..8].copy_from_slice(&[0xFF; 4]);
    block[8] = if encrypt_metadata { b'T' } else { b'F' };
    block[9..12].copy_from_slice(PERMS_MARKER);
    rng.fill(&mut block[12..])?;

    Ok(aes256_ecb_encrypt_block(file_key, &block)?.to_vec())
}

/// Decrypt /Perms and check it against /P and /EncryptMetadata
pub(crate) fn verify_perms_value(
    file_key: &[u8],
    perms: &[u8],
    permissions: i32,
    encrypt_metadata: bool,
) -> PDFSecurityResult<()> {
    let mut block = [0u8; 16];
    if perms.len() < block.len() {
        return Err(PDFSecurityError::invalid_dict_value(
            "Perms",
            format!("expected 16 bytes, found {}", perms.len()),
        ));
    }
    block.copy_from_slice(&perms[..16]);
    let plain = Zeroizing::new(aes256_ecb_decrypt_block(file_key, &block)?);

    if &plain[9..12] != PERMS_MARKER {
        return Err(PDFSecurityError::invalid_dict_value(
            "Perms",
            "marker mismatch after decryption",
        ));
    }

    let stored = i32::from_le_bytes([plain[0], plain[1], plain[2], plain[3]]);
    if stored != permissions {
        return Err(PDFSecurityError::invalid_dict_value(
            "Perms",
            format!("permissions {} do not match /P {}", stored, permissions),
        ));
    }

    if (plain[8] == b'T') != encrypt_metadata {
        return Err(PDFSecurityError::invalid_dict_value(
            "Perms",
            "EncryptMetadata flag does not match",
        ));
    }
    Ok(())
}

/// Algorithm 6: derive the file key from a candidate user password and check it against /U
fn check_legacy_user_password(
    dictionary: &EncryptionDictionary,
    document_id: &[u8],
    password: &[u8],
) -> PDFSecurityResult<Option<Zeroizing<Vec<u8>>>> {
    let revision = dictionary.revision;
    let key = compute_legacy_file_key(
        revision,
        password,
        &dictionary.o,
        dictionary.p,
        document_id,
        dictionary.encrypt_metadata,
    );
    let expected = compute_legacy_user_value(revision, &key, document_id)?;

    let compared = if revision == SecurityRevision::R2Rc4_40 { 32 } else { 16 };
    if dictionary.u.len() < compared {
        return Err(PDFSecurityError::invalid_dict_value(
            "U",
            format!("expected at least {} bytes", compared),
        ));
    }
    if ct_eq(&expected[..compared], &dictionary.u[..compared]) {
        Ok(Some(key))
    } else {
        Ok(None)
    }
}

/// Authenticate against a revision 2-4 dictionary.
///
/// The user password is tried first. Otherwise the candidate is treated as the owner
/// password: it decrypts /O back to the padded user password, which is then checked as
/// a user password (Algorithm 7).
pub(crate) fn authenticate_legacy(
    dictionary: &EncryptionDictionary,
    document_id: &[u8],
    password: &[u8],
) -> PDFSecurityResult<(FileEncryptionKey, PasswordKind)> {
    let revision = dictionary.revision;
    check_password_length(revision, password)?;

    if let Some(key) = check_legacy_user_password(dictionary, document_id, password)? {
        debug!("User password accepted for {}", revision);
        return Ok((FileEncryptionKey::new(key.to_vec()), PasswordKind::User));
    }

    let owner_key = compute_owner_rc4_key(revision, password);
    let mut user_password = Zeroizing::new(dictionary.o.clone());
    if revision == SecurityRevision::R2Rc4_40 {
        rc4_apply(&owner_key, &mut user_password)?;
    } else {
        rc4_rounds(&owner_key, &mut user_password, (0..=19).rev())?;
    }

    if let Some(key) = check_legacy_user_password(dictionary, document_id, &user_password)? {
        debug!("Owner password accepted for {}", revision);
        return Ok((FileEncryptionKey::new(key.to_vec()), PasswordKind::Owner));
    }

    trace!("Password rejected for {}", revision);
    Err(PDFSecurityError::InvalidPassword)
}

/// Authenticate against a revision 5-6 dictionary and unwrap the file key (Algorithm 2.A)
pub(crate) fn authenticate_modern(
    dictionary: &EncryptionDictionary,
    password: &[u8],
) -> PDFSecurityResult<(FileEncryptionKey, PasswordKind)> {
    let revision = dictionary.revision;
    check_password_length(revision, password)?;

    let u = &dictionary.u;
    let o = &dictionary.o;
    if u.len() < 48 || o.len() < 48 {
        return Err(PDFSecurityError::invalid_dict_value(
            if u.len() < 48 { "U" } else { "O" },
            "expected 48 bytes",
        ));
    }
    let u = &u[..48];

    let user_hash = compute_hardened_hash(revision, password, &u[32..40], None)?;
    let (kind, wrapping_key, wrapped, entry) = if ct_eq(&user_hash[..], &u[..32]) {
        let key = compute_hardened_hash(revision, password, &u[40..48], None)?;
        (PasswordKind::User, key, &dictionary.ue, "UE")
    } else {
        let owner_hash = compute_hardened_hash(revision, password, &o[32..40], Some(u))?;
        if !ct_eq(&owner_hash[..], &o[..32]) {
            trace!("Password rejected for {}", revision);
            return Err(PDFSecurityError::InvalidPassword);
        }
        let key = compute_hardened_hash(revision, password, &o[40..48], Some(u))?;
        (PasswordKind::Owner, key, &dictionary.oe, "OE")
    };

    let wrapped = wrapped
        .as_deref()
        .ok_or_else(|| PDFSecurityError::missing_entry(entry))?;
    if wrapped.len() != 32 {
        return Err(PDFSecurityError::invalid_dict_value(
            entry,
            format!("expected 32 bytes, found {}", wrapped.len()),
        ));
    }
    let file_key =
        FileEncryptionKey::new(aes256_cbc_decrypt_no_padding(&wrapping_key[..], wrapped)?);

    match &dictionary.perms {
        Some(perms) => verify_perms_value(
            file_key.as_bytes(),
            perms,
            dictionary.p,
            dictionary.encrypt_metadata,
        )?,
        None => debug!("No /Perms entry to check for {}", revision),
    }

    debug!("{:?} password accepted for {}", kind, revision);
    Ok((file_key, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    const DOCUMENT_ID: &[u8; 16] =
        b"\x5a\x1b\x33\x90\x07\xee\x21\xc4\x88\x19\x00\x7f\x3d\x62\xab\x10";

    fn legacy_dictionary(
        revision: SecurityRevision,
        user: &[u8],
        owner: &[u8],
        p: i32,
    ) -> PDFSecurityResult<(EncryptionDictionary, Zeroizing<Vec<u8>>)> {
        let o = compute_legacy_owner_value(revision, owner, user)?;
        let key = compute_legacy_file_key(revision, user, &o, p, DOCUMENT_ID, true);
        let u = compute_legacy_user_value(revision, &key, DOCUMENT_ID)?;
        let dictionary = EncryptionDictionary {
            revision,
            o,
            u,
            oe: None,
            ue: None,
            perms: None,
            p,
            encrypt_metadata: true,
        };
        Ok((dictionary, key))
    }

    fn modern_dictionary(
        revision: SecurityRevision,
        user: &[u8],
        owner: &[u8],
        seed: u64,
    ) -> PDFSecurityResult<(EncryptionDictionary, Vec<u8>)> {
        let mut rng = StdRng::seed_from_u64(seed);
        let file_key = vec![0x3Cu8; 32];
        let (u, ue) = compute_modern_user_values(revision, &file_key, user, &mut rng)?;
        let (o, oe) = compute_modern_owner_values(revision, &file_key, owner, &u, &mut rng)?;
        let perms = compute_perms_value(&file_key, -1836, true, &mut rng)?;
        let dictionary = EncryptionDictionary {
            revision,
            o,
            u,
            oe: Some(oe),
            ue: Some(ue),
            perms: Some(perms),
            p: -1836,
            encrypt_metadata: true,
        };
        Ok((dictionary, file_key))
    }

    #[test_log::test]
    fn test_value_lengths() -> PDFSecurityResult<()> {
        let (dictionary, _) = legacy_dictionary(SecurityRevision::R3Rc4_128, b"u", b"o", -4)?;
        assert_eq!(dictionary.o.len(), 32);
        assert_eq!(dictionary.u.len(), 32);
        assert_eq!(&dictionary.u[16..], &[0u8; 16]);

        let (dictionary, _) = modern_dictionary(SecurityRevision::R6Aes256, b"u", b"o", 1)?;
        assert_eq!(dictionary.u.len(), 48);
        assert_eq!(dictionary.o.len(), 48);
        assert_eq!(dictionary.ue.as_ref().map(Vec::len), Some(32));
        assert_eq!(dictionary.perms.as_ref().map(Vec::len), Some(16));
        Ok(())
    }

    #[test_log::test]
    fn test_r2_user_value_is_encrypted_padding() -> PDFSecurityResult<()> {
        let key = [0x01, 0x02, 0x03, 0x04, 0x05];
        let mut expected = PADDING.to_vec();
        rc4_apply(&key, &mut expected)?;
        assert_eq!(
            compute_legacy_user_value(SecurityRevision::R2Rc4_40, &key, DOCUMENT_ID)?,
            expected
        );
        Ok(())
    }

    #[rstest]
    #[case(SecurityRevision::R2Rc4_40)]
    #[case(SecurityRevision::R3Rc4_128)]
    #[case(SecurityRevision::R4Aes128)]
    fn test_legacy_user_and_owner(#[case] revision: SecurityRevision) -> PDFSecurityResult<()> {
        let (dictionary, key) = legacy_dictionary(revision, b"user", b"owner", -4)?;

        let (user_key, kind) = authenticate_legacy(&dictionary, DOCUMENT_ID, b"user")?;
        assert_eq!(kind, PasswordKind::User);
        assert_eq!(user_key.as_bytes(), &key[..]);

        let (owner_key, kind) = authenticate_legacy(&dictionary, DOCUMENT_ID, b"owner")?;
        assert_eq!(kind, PasswordKind::Owner);
        assert_eq!(owner_key, user_key);

        assert!(matches!(
            authenticate_legacy(&dictionary, DOCUMENT_ID, b"wrong"),
            Err(PDFSecurityError::InvalidPassword)
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_legacy_identity_binding() -> PDFSecurityResult<()> {
        let (dictionary, _) =
            legacy_dictionary(SecurityRevision::R3Rc4_128, b"user", b"owner", -4)?;
        assert!(matches!(
            authenticate_legacy(&dictionary, b"another document", b"user"),
            Err(PDFSecurityError::InvalidPassword)
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_legacy_password_too_long() -> PDFSecurityResult<()> {
        let (dictionary, _) = legacy_dictionary(SecurityRevision::R4Aes128, b"", b"owner", -4)?;
        assert!(matches!(
            authenticate_legacy(&dictionary, DOCUMENT_ID, &[b'a'; 128]),
            Err(PDFSecurityError::PasswordTooLong { limit: 127, .. })
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_legacy_long_passwords_hash_first_32_bytes() -> PDFSecurityResult<()> {
        let user = [b'u'; 40];
        let owner = [b'o'; 50];
        let (dictionary, file_key) =
            legacy_dictionary(SecurityRevision::R4Aes128, &user, &owner, -4)?;

        let (key, kind) = authenticate_legacy(&dictionary, DOCUMENT_ID, &user)?;
        assert_eq!(kind, PasswordKind::User);
        assert_eq!(key.as_bytes(), &file_key[..]);

        // anything sharing the first 32 bytes is the same password
        let (key, kind) = authenticate_legacy(&dictionary, DOCUMENT_ID, &user[..32])?;
        assert_eq!(kind, PasswordKind::User);
        assert_eq!(key.as_bytes(), &file_key[..]);

        let (key, kind) = authenticate_legacy(&dictionary, DOCUMENT_ID, &owner)?;
        assert_eq!(kind, PasswordKind::Owner);
        assert_eq!(key.as_bytes(), &file_key[..]);
        Ok(())
    }

    #[rstest]
    #[case(SecurityRevision::R5Aes256)]
    #[case(SecurityRevision::R6Aes256)]
    fn test_modern_user_and_owner(#[case] revision: SecurityRevision) -> PDFSecurityResult<()> {
        let (dictionary, file_key) = modern_dictionary(revision, b"user", b"owner", 2)?;

        let (user_key, kind) = authenticate_modern(&dictionary, b"user")?;
        assert_eq!(kind, PasswordKind::User);
        assert_eq!(user_key.as_bytes(), &file_key[..]);

        let (owner_key, kind) = authenticate_modern(&dictionary, b"owner")?;
        assert_eq!(kind, PasswordKind::Owner);
        assert_eq!(owner_key, user_key);

        assert!(matches!(
            authenticate_modern(&dictionary, b"User"),
            Err(PDFSecurityError::InvalidPassword)
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_modern_empty_user_password() -> PDFSecurityResult<()> {
        let (dictionary, file_key) =
            modern_dictionary(SecurityRevision::R6Aes256, b"", b"owner", 3)?;
        let (key, kind) = authenticate_modern(&dictionary, b"")?;
        assert_eq!(kind, PasswordKind::User);
        assert_eq!(key.as_bytes(), &file_key[..]);
        Ok(())
    }

    #[test_log::test]
    fn test_owner_hash_is_bound_to_user_value() -> PDFSecurityResult<()> {
        let (mut dictionary, _) =
            modern_dictionary(SecurityRevision::R6Aes256, b"user", b"owner", 4)?;
        dictionary.u[0] ^= 0x01;
        assert!(matches!(
            authenticate_modern(&dictionary, b"owner"),
            Err(PDFSecurityError::InvalidPassword)
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_tampered_perms_detected() -> PDFSecurityResult<()> {
        let (mut dictionary, _) =
            modern_dictionary(SecurityRevision::R6Aes256, b"user", b"owner", 5)?;
        dictionary.p = -4;
        assert!(matches!(
            authenticate_modern(&dictionary, b"user"),
            Err(PDFSecurityError::InvalidDictionaryValue { key, .. }) if key == "Perms"
        ));
        Ok(())
    }

    #[test_log::test]
    fn test_perms_layout() -> PDFSecurityResult<()> {
        let key = [0x11u8; 32];
        let mut rng = StdRng::seed_from_u64(6);
        let perms = compute_perms_value(&key, -3904, false, &mut rng)?;

        let mut block = [0u8; 16];
        block.copy_from_slice(&perms);
        let plain = aes256_ecb_decrypt_block(&key, &block)?;
        assert_eq!(&plain[..8], &[0xC0, 0xF0, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(plain[8], b'F');
        assert_eq!(&plain[9..12], b"adb");

        verify_perms_value(&key, &perms, -3904, false)?;
        assert!(verify_perms_value(&key, &perms, -3904, true).is_err());
        Ok(())
    }

    #[test_log::test]
    fn test_salts_come_from_the_random_source() -> PDFSecurityResult<()> {
        let (a, _) = modern_dictionary(SecurityRevision::R6Aes256, b"pw", b"pw", 7)?;
        let (b, _) = modern_dictionary(SecurityRevision::R6Aes256, b"pw", b"pw", 7)?;
        let (c, _) = modern_dictionary(SecurityRevision::R6Aes256, b"pw", b"pw", 8)?;
        assert_eq!(a, b);
        assert_ne!(a.u, c.u);
        Ok(())
    }
}
