//! Permission flags and their /P encoding

use bitflags::bitflags;

use super::SecurityRevision;

bitflags! {
    /// Raw user-access bits of the /P entry (bit 1 is the least significant)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PermissionBits: u32 {
        /// Bit 3: print (at reduced quality in R3+ unless bit 12 is also set)
        const PRINT = 1 << 2;
        /// Bit 4: modify contents
        const MODIFY = 1 << 3;
        /// Bit 5: copy or extract text and graphics
        const COPY = 1 << 4;
        /// Bit 6: add or modify annotations
        const ANNOTATE = 1 << 5;
        /// Bit 9: fill existing form fields (R3+)
        const FILL_FORMS = 1 << 8;
        /// Bit 10: extract for accessibility (R3+)
        const EXTRACT_FOR_ACCESSIBILITY = 1 << 9;
        /// Bit 11: insert, rotate and delete pages (R3+)
        const ASSEMBLE = 1 << 10;
        /// Bit 12: faithful high-resolution printing (R3+)
        const PRINT_HIGH_RES = 1 << 11;
    }
}

/// Bits 7-32 are reserved in R2, bits 7-8 and 13-32 in R3+; all are stored as 1
const R2_RESERVED: u32 = 0xFFFF_FFC0;
const R3_RESERVED: u32 = 0xFFFF_F0C0;

impl PermissionBits {
    /// Bits the caller controls under `revision`
    pub fn settable(revision: SecurityRevision) -> Self {
        if revision == SecurityRevision::R2Rc4_40 {
            Self::PRINT | Self::MODIFY | Self::COPY | Self::ANNOTATE
        } else {
            Self::all()
        }
    }

    fn reserved(revision: SecurityRevision) -> u32 {
        if revision == SecurityRevision::R2Rc4_40 {
            R2_RESERVED
        } else {
            R3_RESERVED
        }
    }
}

/// Printing allowance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrintPermission {
    #[default]
    None,
    LowResolution,
    HighResolution,
}

/// What a user who opened the document with the user password may do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissions {
    pub printing: PrintPermission,
    pub modifying: bool,
    pub copying: bool,
    pub annotating: bool,
    pub filling_forms: bool,
    pub content_accessibility: bool,
    pub document_assembly: bool,
}

impl Permissions {
    /// Everything denied
    pub fn none() -> Self {
        Self::default()
    }

    /// Everything allowed
    pub fn all() -> Self {
        Self {
            printing: PrintPermission::HighResolution,
            modifying: true,
            copying: true,
            annotating: true,
            filling_forms: true,
            content_accessibility: true,
            document_assembly: true,
        }
    }

    /// User-access bits for these permissions, without the reserved bits
    pub fn bits(&self) -> PermissionBits {
        let mut bits = PermissionBits::empty();

        match self.printing {
            PrintPermission::None => {}
            PrintPermission::LowResolution => bits |= PermissionBits::PRINT,
            PrintPermission::HighResolution => {
                bits |= PermissionBits::PRINT | PermissionBits::PRINT_HIGH_RES
            }
        }
        bits.set(PermissionBits::MODIFY, self.modifying);
        bits.set(PermissionBits::COPY, self.copying);
        bits.set(PermissionBits::ANNOTATE, self.annotating);
        bits.set(PermissionBits::FILL_FORMS, self.filling_forms);
        bits.set(
            PermissionBits::EXTRACT_FOR_ACCESSIBILITY,
            self.content_accessibility,
        );
        bits.set(PermissionBits::ASSEMBLE, self.document_assembly);

        bits
    }

    /// Encode as the signed 32-bit /P value for `revision`.
    ///
    /// Flags the revision cannot express are dropped and every reserved bit is set,
    /// which makes the result negative.
    pub fn encode(&self, revision: SecurityRevision) -> i32 {
        let user_bits = self.bits() & PermissionBits::settable(revision);
        (user_bits.bits() | PermissionBits::reserved(revision)) as i32
    }

    /// Decode a /P value, ignoring reserved bits.
    ///
    /// R2 has no print quality distinction, so its print bit decodes as high resolution.
    pub fn decode(p: i32, revision: SecurityRevision) -> Self {
        let bits =
            PermissionBits::from_bits_truncate(p as u32) & PermissionBits::settable(revision);

        let printing = if !bits.contains(PermissionBits::PRINT) {
            PrintPermission::None
        } else if revision == SecurityRevision::R2Rc4_40
            || bits.contains(PermissionBits::PRINT_HIGH_RES)
        {
            PrintPermission::HighResolution
        } else {
            PrintPermission::LowResolution
        };

        Self {
            printing,
            modifying: bits.contains(PermissionBits::MODIFY),
            copying: bits.contains(PermissionBits::COPY),
            annotating: bits.contains(PermissionBits::ANNOTATE),
            filling_forms: bits.contains(PermissionBits::FILL_FORMS),
            content_accessibility: bits.contains(PermissionBits::EXTRACT_FOR_ACCESSIBILITY),
            document_assembly: bits.contains(PermissionBits::ASSEMBLE),
        }
    }

    /// Whether [`Permissions::decode`] of [`Permissions::encode`] gives these permissions back
    pub fn is_representable(&self, revision: SecurityRevision) -> bool {
        if revision != SecurityRevision::R2Rc4_40 {
            return true;
        }
        self.printing != PrintPermission::LowResolution
            && !self.filling_forms
            && !self.content_accessibility
            && !self.document_assembly
    }
}
