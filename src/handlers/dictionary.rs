//! The /Encrypt dictionary of the standard security handler

use crate::error::{PDFSecurityError, PDFSecurityResult};
use crate::pdf::{Dictionary, Object};
use crate::security::{CipherAlgorithm, Permissions, SecurityRevision};

/// Name of the single crypt filter written for revisions 4 and later
pub const STANDARD_CRYPT_FILTER: &str = "StdCF";

/// Entries of a standard security handler /Encrypt dictionary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionDictionary {
    pub revision: SecurityRevision,
    /// /O: owner password validation entry
    pub o: Vec<u8>,
    /// /U: user password validation entry
    pub u: Vec<u8>,
    /// /OE: file key wrapped under the owner password (R5/R6)
    pub oe: Option<Vec<u8>>,
    /// /UE: file key wrapped under the user password (R5/R6)
    pub ue: Option<Vec<u8>>,
    /// /Perms: encrypted copy of the permissions (R5/R6)
    pub perms: Option<Vec<u8>>,
    /// /P: signed permission bitmask
    pub p: i32,
    pub encrypt_metadata: bool,
}

impl EncryptionDictionary {
    /// Decoded view of /P
    pub fn permissions(&self) -> Permissions {
        Permissions::decode(self.p, self.revision)
    }

    /// Build the PDF dictionary
    pub fn to_dict(&self) -> Dictionary {
        let revision = self.revision;
        let mut dict = Dictionary::new();

        dict.set("Filter", Object::name("Standard"));
        dict.set("V", i64::from(revision.version()));
        dict.set("R", i64::from(revision.revision()));
        dict.set("O", Object::string(self.o.clone()));
        dict.set("U", Object::string(self.u.clone()));
        dict.set("P", self.p);

        if !revision.is_aes_256() {
            dict.set("Length", i64::from(revision.key_length_bits()));
        }

        if revision.is_aes() {
            let method = if revision.is_aes_256() { "AESV3" } else { "AESV2" };

            let mut crypt_filter = Dictionary::new();
            crypt_filter.set("Type", Object::name("CryptFilter"));
            crypt_filter.set("CFM", Object::name(method));
            crypt_filter.set("AuthEvent", Object::name("DocOpen"));
            crypt_filter.set("Length", revision.key_length_bytes() as i64);

            let mut filters = Dictionary::new();
            filters.set(STANDARD_CRYPT_FILTER, crypt_filter);

            dict.set("CF", filters);
            dict.set("StmF", Object::name(STANDARD_CRYPT_FILTER));
            dict.set("StrF", Object::name(STANDARD_CRYPT_FILTER));

            if !self.encrypt_metadata {
                dict.set("EncryptMetadata", false);
            }
        }

        for (key, value) in [("OE", &self.oe), ("UE", &self.ue), ("Perms", &self.perms)] {
            if let Some(bytes) = value {
                dict.set(key, Object::string(bytes.clone()));
            }
        }

        dict
    }

    /// Read the entries back from a PDF dictionary
    pub fn from_dict(dict: &Dictionary) -> PDFSecurityResult<Self> {
        match dict.get_name("Filter") {
            Some("Standard") => {}
            Some(other) => {
                return Err(PDFSecurityError::invalid_dict_value(
                    "Filter",
                    format!("unsupported security handler {}", other),
                ))
            }
            None => return Err(PDFSecurityError::missing_entry("Filter")),
        }

        let revision_number = required_integer(dict, "R")?;
        let version = required_integer(dict, "V")?;
        let revision_number = u8::try_from(revision_number).map_err(|_| {
            PDFSecurityError::invalid_dict_value("R", format!("out of range: {}", revision_number))
        })?;

        let (key_length_bits, cipher) = match version {
            1 => (40, CipherAlgorithm::Rc4),
            2 => (legacy_key_length(dict)?, CipherAlgorithm::Rc4),
            4 | 5 => crypt_filter_method(dict, revision_number)?,
            other => {
                return Err(PDFSecurityError::invalid_dict_value(
                    "V",
                    format!("unsupported algorithm version {}", other),
                ))
            }
        };

        let revision = SecurityRevision::from_parts(revision_number, key_length_bits, cipher)?;
        if i64::from(revision.version()) != version {
            return Err(PDFSecurityError::invalid_dict_value(
                "V",
                format!("version {} does not match {}", version, revision),
            ));
        }

        let hash_len = if revision.is_aes_256() { 48 } else { 32 };
        let o = required_string(dict, "O", hash_len)?;
        let u = required_string(dict, "U", hash_len)?;

        let (oe, ue, perms) = if revision.is_aes_256() {
            (
                Some(required_string(dict, "OE", 32)?),
                Some(required_string(dict, "UE", 32)?),
                dict.get_string("Perms").map(<[u8]>::to_vec),
            )
        } else {
            (None, None, None)
        };

        Ok(Self {
            revision,
            o,
            u,
            oe,
            ue,
            perms,
            p: permission_value(dict)?,
            encrypt_metadata: dict.get_bool("EncryptMetadata").unwrap_or(true),
        })
    }
}

fn required_integer(dict: &Dictionary, key: &str) -> PDFSecurityResult<i64> {
    match dict.get(key) {
        Some(Object::Integer(n)) => Ok(*n),
        Some(other) => Err(PDFSecurityError::invalid_dict_value(
            key,
            format!("expected an integer, found {}", other.type_name()),
        )),
        None => Err(PDFSecurityError::missing_entry(key)),
    }
}

/// String entry of at least `min_len` bytes, truncated to `min_len`
fn required_string(dict: &Dictionary, key: &str, min_len: usize) -> PDFSecurityResult<Vec<u8>> {
    let bytes = dict
        .get_string(key)
        .ok_or_else(|| PDFSecurityError::missing_entry(key))?;

    if bytes.len() < min_len {
        return Err(PDFSecurityError::invalid_dict_value(
            key,
            format!("expected {} bytes, found {}", min_len, bytes.len()),
        ));
    }
    Ok(bytes[..min_len].to_vec())
}

/// /P, accepting writers that store it as an unsigned 32-bit value
fn permission_value(dict: &Dictionary) -> PDFSecurityResult<i32> {
    let p = required_integer(dict, "P")?;
    i32::try_from(p)
        .or_else(|_| u32::try_from(p).map(|unsigned| unsigned as i32))
        .map_err(|_| PDFSecurityError::invalid_dict_value("P", format!("out of range: {}", p)))
}

/// /Length for V2, in bits; absent means 40
fn legacy_key_length(dict: &Dictionary) -> PDFSecurityResult<u16> {
    match dict.get("Length") {
        None => Ok(40),
        Some(_) => {
            let bits = required_integer(dict, "Length")?;
            u16::try_from(bits).map_err(|_| {
                PDFSecurityError::invalid_dict_value("Length", format!("out of range: {}", bits))
            })
        }
    }
}

/// Key length and cipher named by the /StdCF crypt filter of a V4/V5 dictionary
fn crypt_filter_method(
    dict: &Dictionary,
    revision: u8,
) -> PDFSecurityResult<(u16, CipherAlgorithm)> {
    let filter_name = dict.get_name("StmF").unwrap_or(STANDARD_CRYPT_FILTER);
    let method = dict
        .get_dict("CF")
        .and_then(|filters| filters.get_dict(filter_name))
        .and_then(|filter| filter.get_name("CFM"))
        .ok_or_else(|| PDFSecurityError::missing_entry(format!("CF/{}/CFM", filter_name)))?;

    match method {
        "AESV2" => Ok((128, CipherAlgorithm::AesCbc)),
        "AESV3" => Ok((256, CipherAlgorithm::AesCbc)),
        "V2" => Ok((128, CipherAlgorithm::Rc4)),
        other => Err(PDFSecurityError::invalid_dict_value(
            "CFM",
            format!("unsupported crypt filter method {} for R{}", other, revision),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn sample(revision: SecurityRevision) -> EncryptionDictionary {
        let modern = revision.is_aes_256();
        let hash_len = if modern { 48 } else { 32 };
        EncryptionDictionary {
            revision,
            o: vec![0x0A; hash_len],
            u: vec![0x0B; hash_len],
            oe: modern.then(|| vec![0x0C; 32]),
            ue: modern.then(|| vec![0x0D; 32]),
            perms: modern.then(|| vec![0x0E; 16]),
            p: -1836,
            encrypt_metadata: true,
        }
    }

    #[test]
    fn test_rc4_dictionary_has_no_crypt_filters() {
        let dict = sample(SecurityRevision::R3Rc4_128).to_dict();
        assert_eq!(dict.get_name("Filter"), Some("Standard"));
        assert_eq!(dict.get_integer("V"), Some(2));
        assert_eq!(dict.get_integer("R"), Some(3));
        assert_eq!(dict.get_integer("Length"), Some(128));
        assert_eq!(dict.get_integer("P"), Some(-1836));
        assert!(!dict.contains_key("CF"));
        assert!(!dict.contains_key("StmF"));
        assert!(!dict.contains_key("OE"));
    }

    #[test]
    fn test_aes_128_crypt_filter() {
        let dict = sample(SecurityRevision::R4Aes128).to_dict();
        let std_cf = dict.get_dict("CF").and_then(|cf| cf.get_dict("StdCF")).unwrap();

        assert_eq!(dict.get_integer("V"), Some(4));
        assert_eq!(dict.get_integer("Length"), Some(128));
        assert_eq!(std_cf.get_name("CFM"), Some("AESV2"));
        assert_eq!(std_cf.get_name("AuthEvent"), Some("DocOpen"));
        assert_eq!(std_cf.get_integer("Length"), Some(16));
        assert_eq!(dict.get_name("StmF"), Some("StdCF"));
        assert_eq!(dict.get_name("StrF"), Some("StdCF"));
        assert!(!dict.contains_key("EncryptMetadata"));
    }

    #[test]
    fn test_aes_256_entries() {
        let dict = sample(SecurityRevision::R6Aes256).to_dict();
        let std_cf = dict.get_dict("CF").and_then(|cf| cf.get_dict("StdCF")).unwrap();

        assert_eq!(dict.get_integer("V"), Some(5));
        assert_eq!(dict.get_integer("R"), Some(6));
        assert!(!dict.contains_key("Length"));
        assert_eq!(std_cf.get_name("CFM"), Some("AESV3"));
        assert_eq!(std_cf.get_integer("Length"), Some(32));
        assert_eq!(dict.get_string("OE").map(<[u8]>::len), Some(32));
        assert_eq!(dict.get_string("Perms").map(<[u8]>::len), Some(16));
    }

    #[test]
    fn test_unencrypted_metadata_flag() {
        let mut entries = sample(SecurityRevision::R4Aes128);
        entries.encrypt_metadata = false;
        assert_eq!(entries.to_dict().get_bool("EncryptMetadata"), Some(false));
    }

    #[rstest]
    #[case(SecurityRevision::R2Rc4_40)]
    #[case(SecurityRevision::R3Rc4_128)]
    #[case(SecurityRevision::R4Aes128)]
    #[case(SecurityRevision::R5Aes256)]
    #[case(SecurityRevision::R6Aes256)]
    fn test_dictionary_is_read_back(#[case] revision: SecurityRevision) -> PDFSecurityResult<()> {
        let entries = sample(revision);
        assert_eq!(EncryptionDictionary::from_dict(&entries.to_dict())?, entries);
        Ok(())
    }

    #[test]
    fn test_unsigned_permission_value() -> PDFSecurityResult<()> {
        let mut dict = sample(SecurityRevision::R3Rc4_128).to_dict();
        dict.set("P", 0xFFFF_F8D4u32 as i64);
        assert_eq!(EncryptionDictionary::from_dict(&dict)?.p, -1836);
        Ok(())
    }

    #[test]
    fn test_missing_and_invalid_entries() {
        let mut dict = sample(SecurityRevision::R3Rc4_128).to_dict();
        dict.remove("U");
        assert!(matches!(
            EncryptionDictionary::from_dict(&dict),
            Err(PDFSecurityError::MissingDictionaryEntry(key)) if key == "U"
        ));

        let mut dict = sample(SecurityRevision::R3Rc4_128).to_dict();
        dict.set("O", Object::string(vec![0u8; 10]));
        assert!(matches!(
            EncryptionDictionary::from_dict(&dict),
            Err(PDFSecurityError::InvalidDictionaryValue { key, .. }) if key == "O"
        ));

        let mut dict = sample(SecurityRevision::R3Rc4_128).to_dict();
        dict.set("Filter", Object::name("Adobe.PubSec"));
        assert!(matches!(
            EncryptionDictionary::from_dict(&dict),
            Err(PDFSecurityError::InvalidDictionaryValue { key, .. }) if key == "Filter"
        ));
    }

    #[test]
    fn test_rc4_crypt_filter_is_unsupported() {
        let mut dict = sample(SecurityRevision::R4Aes128).to_dict();
        let mut std_cf = Dictionary::new();
        std_cf.set("CFM", Object::name("V2"));
        let mut filters = Dictionary::new();
        filters.set("StdCF", std_cf);
        dict.set("CF", filters);

        assert!(matches!(
            EncryptionDictionary::from_dict(&dict),
            Err(PDFSecurityError::UnsupportedRevision { revision: 4, key_length: 128 })
        ));
    }
}
