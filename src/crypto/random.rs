//! Random-byte capability used for owner passwords, salts, IVs and document IDs

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::PDFSecurityResult;

/// Source of cryptographically secure random bytes.
///
/// Implemented for every `RngCore + CryptoRng`, so only generators that declare
/// themselves cryptographically secure can be plugged in. Tests use a seeded
/// `StdRng` to make salts and IVs reproducible.
pub trait RandomSource: Send {
    /// Fill `dest` entirely, or fail with [`PDFSecurityError::InsecureRandomSource`]
    fn fill(&mut self, dest: &mut [u8]) -> PDFSecurityResult<()>;
}

impl<R> RandomSource for R
where
    R: RngCore + CryptoRng + Send,
{
    fn fill(&mut self, dest: &mut [u8]) -> PDFSecurityResult<()> {
        self.try_fill_bytes(dest)?;
        Ok(())
    }
}

/// Operating system CSPRNG, the production default
pub type OsRandom = OsRng;

/// Check that `rng` can actually produce bytes
pub(crate) fn check_source(rng: &mut dyn RandomSource) -> PDFSecurityResult<()> {
    let mut scratch = [0u8; 16];
    rng.fill(&mut scratch)
}
