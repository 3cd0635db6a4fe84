use zeroize::{Zeroize, Zeroizing};

use super::SecurityRevision;
use crate::crypto::{aes128_cbc_encrypt_no_padding, md5_digest, sha256_digest};
use crate::error::{PDFSecurityError, PDFSecurityResult};
use sha2::{Digest, Sha256, Sha384, Sha512};

// Password padding string from ISO 32000, Algorithm 2 step a
pub(crate) const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41,
    0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80,
    0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Marker hashed into the file key when metadata stays in the clear (R4)
const UNENCRYPTED_METADATA_MARKER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Reject passwords longer than the revision allows
pub(crate) fn check_password_length(
    revision: SecurityRevision,
    password: &[u8],
) -> PDFSecurityResult<()> {
    let limit = revision.max_password_len();
    if password.len() > limit {
        return Err(PDFSecurityError::PasswordTooLong {
            length: password.len(),
            limit,
            revision: revision.revision(),
        });
    }
    Ok(())
}

/// Truncate or pad `password` to exactly 32 bytes with the standard padding string
pub(crate) fn pad_password(password: &[u8]) -> Zeroizing<[u8; 32]> {
    let len = password.len().min(32);
    let mut padded = Zeroizing::new([0u8; 32]);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// Algorithm 2: file encryption key for revisions 2 to 4
pub(crate) fn compute_legacy_file_key(
    revision: SecurityRevision,
    password: &[u8],
    o_value: &[u8],
    permissions: i32,
    document_id: &[u8],
    encrypt_metadata: bool,
) -> Zeroizing<Vec<u8>> {
    let key_len = revision.key_length_bytes();
    let padded = pad_password(password);
    let p_bytes = permissions.to_le_bytes();

    let metadata_marker: &[u8] = if revision.revision() >= 4 && !encrypt_metadata {
        &UNENCRYPTED_METADATA_MARKER
    } else {
        &[]
    };

    let mut hash = md5_digest(&[&padded[..], o_value, &p_bytes, document_id, metadata_marker]);

    if revision.revision() >= 3 {
        for _ in 0..50 {
            hash = md5_digest(&[&hash[..key_len]]);
        }
    }

    Zeroizing::new(hash[..key_len].to_vec())
}

/// Algorithm 3 steps a-d: RC4 key protecting the /O entry
pub(crate) fn compute_owner_rc4_key(
    revision: SecurityRevision,
    owner_password: &[u8],
) -> Zeroizing<Vec<u8>> {
    let key_len = revision.key_length_bytes();
    let padded = pad_password(owner_password);
    let mut hash = md5_digest(&[&padded[..]]);

    if revision.revision() >= 3 {
        for _ in 0..50 {
            hash = md5_digest(&[&hash]);
        }
    }

    Zeroizing::new(hash[..key_len].to_vec())
}

/// Algorithm 2.B: hash used by the AES-256 revisions.
///
/// R5 is a single SHA-256 over `password || salt || user_key`. R6 runs the hardening
/// loop: AES-128-CBC over 64 repetitions of `password || K || user_key`, then SHA-256,
/// SHA-384 or SHA-512 picked by the first 16 bytes of the output modulo 3, for at least
/// 64 rounds and until the last output byte is at most `round - 32`.
pub(crate) fn compute_hardened_hash(
    revision: SecurityRevision,
    password: &[u8],
    salt: &[u8],
    user_key: Option<&[u8]>,
) -> PDFSecurityResult<Zeroizing<[u8; 32]>> {
    let user_key = user_key.unwrap_or(&[]);
    let mut k = Zeroizing::new(sha256_digest(&[password, salt, user_key]).to_vec());

    if revision == SecurityRevision::R6Aes256 {
        let mut k1 = Zeroizing::new(Vec::with_capacity(
            64 * (password.len() + 64 + user_key.len()),
        ));
        let mut round: usize = 0;

        loop {
            k1.clear();
            for _ in 0..64 {
                k1.extend_from_slice(password);
                k1.extend_from_slice(&k);
                k1.extend_from_slice(user_key);
            }

            let mut iv = [0u8; 16];
            iv.copy_from_slice(&k[16..32]);
            let e = Zeroizing::new(aes128_cbc_encrypt_no_padding(&k[..16], &iv, &k1)?);

            let selector: u32 = e[..16].iter().map(|&b| u32::from(b)).sum::<u32>() % 3;
            let next = match selector {
                0 => Sha256::digest(&e[..]).to_vec(),
                1 => Sha384::digest(&e[..]).to_vec(),
                _ => Sha512::digest(&e[..]).to_vec(),
            };
            k.zeroize();
            *k = next;

            let last = usize::from(e[e.len() - 1]);
            round += 1;
            if round >= 64 && last + 32 <= round {
                break;
            }
        }
    }

    let mut out = Zeroizing::new([0u8; 32]);
    out.copy_from_slice(&k[..32]);
    Ok(out)
}
