//! Walks a document's indirect objects and encrypts or decrypts their strings and streams

use log::{debug, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{FileEncryptionKey, SecurityRevision};
use crate::crypto::{PDFCryptoEngine, RandomSource};
use crate::error::{PDFSecurityError, PDFSecurityResult};
use crate::pdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Seed length of the per-object generator
const OBJECT_SEED_LEN: usize = 32;

enum Transform<'a> {
    Encrypt(&'a mut dyn RandomSource),
    Decrypt,
}

/// Applies the file key to every string and stream of a document.
///
/// Each object gets its own key (Algorithm 1). For AES, each object also gets its own
/// random generator, seeded from the caller's source in object order, so objects can be
/// processed independently and still produce reproducible output for a seeded source.
pub struct ObjectEncryptor {
    engine: PDFCryptoEngine,
    encrypt_metadata: bool,
}

impl ObjectEncryptor {
    pub(crate) fn new(
        revision: SecurityRevision,
        file_key: FileEncryptionKey,
        encrypt_metadata: bool,
    ) -> Self {
        Self {
            engine: PDFCryptoEngine::new(revision, file_key),
            encrypt_metadata,
        }
    }

    pub fn revision(&self) -> SecurityRevision {
        self.engine.revision()
    }

    /// Encrypt every eligible object in place, returning how many were processed
    pub fn encrypt_document(
        &self,
        document: &mut Document,
        rng: &mut dyn RandomSource,
    ) -> PDFSecurityResult<usize> {
        let encryption_ref = document.encryption_reference();
        let mut work = Vec::with_capacity(document.len());

        for (&id, object) in document.objects_mut() {
            if self.is_exempt(id, object, encryption_ref) {
                continue;
            }
            let mut seed = [0u8; OBJECT_SEED_LEN];
            rng.fill(&mut seed)?;
            work.push((id, object, seed));
        }

        let count = work.len();
        debug!("Encrypting {} objects with {}", count, self.revision());

        for_each_object(work, |id, object, seed| {
            let mut object_rng = StdRng::from_seed(seed);
            self.transform(id, object, &mut Transform::Encrypt(&mut object_rng))
        })?;

        Ok(count)
    }

    /// Decrypt every eligible object in place, returning how many were processed
    pub fn decrypt_document(&self, document: &mut Document) -> PDFSecurityResult<usize> {
        let encryption_ref = document.encryption_reference();
        let work: Vec<_> = document
            .objects_mut()
            .filter(|(id, object)| !self.is_exempt(**id, object, encryption_ref))
            .map(|(id, object)| (*id, object, ()))
            .collect();

        let count = work.len();
        debug!("Decrypting {} objects with {}", count, self.revision());

        for_each_object(work, |id, object, ()| self.decrypt_object(id, object))?;

        Ok(count)
    }

    /// Encrypt the strings and stream payloads of a single object
    pub fn encrypt_object(
        &self,
        id: ObjectId,
        object: &mut Object,
        rng: &mut dyn RandomSource,
    ) -> PDFSecurityResult<()> {
        self.transform(id, object, &mut Transform::Encrypt(rng))
    }

    /// Decrypt the strings and stream payloads of a single object
    pub fn decrypt_object(&self, id: ObjectId, object: &mut Object) -> PDFSecurityResult<()> {
        self.transform(id, object, &mut Transform::Decrypt)
            .map_err(|err| match err {
                PDFSecurityError::MalformedCiphertext(message) => {
                    PDFSecurityError::malformed_ciphertext(format!(
                        "object {} {}: {}",
                        id.0, id.1, message
                    ))
                }
                other => other,
            })
    }

    /// Objects left untouched as a whole: the /Encrypt dictionary and xref streams
    fn is_exempt(&self, id: ObjectId, object: &Object, encryption_ref: Option<ObjectId>) -> bool {
        if encryption_ref == Some(id) {
            trace!("Skipping encryption dictionary {} {}", id.0, id.1);
            return true;
        }
        if let Object::Stream(stream) = object {
            if stream.is_xref() {
                trace!("Skipping cross-reference stream {} {}", id.0, id.1);
                return true;
            }
        }
        false
    }

    fn encrypts_stream_content(&self, id: ObjectId, stream: &Stream) -> bool {
        if stream.has_crypt_filter() {
            warn!(
                "Stream {} {} selects its own crypt filter, payload left unchanged",
                id.0, id.1
            );
            return false;
        }
        if stream.is_metadata() && !self.encrypt_metadata {
            trace!("Leaving metadata stream {} {} in the clear", id.0, id.1);
            return false;
        }
        true
    }

    fn transform(
        &self,
        id: ObjectId,
        object: &mut Object,
        transform: &mut Transform<'_>,
    ) -> PDFSecurityResult<()> {
        match object {
            Object::String(bytes) => *bytes = self.apply(id, bytes, transform)?,
            Object::Array(items) => {
                for item in items.iter_mut() {
                    self.transform(id, item, transform)?;
                }
            }
            Object::Dictionary(dict) => self.transform_dictionary(id, dict, transform)?,
            Object::Stream(stream) => {
                self.transform_dictionary(id, &mut stream.dict, transform)?;
                if self.encrypts_stream_content(id, stream) {
                    stream.content = self.apply(id, &stream.content, transform)?;
                }
            }
            Object::Null
            | Object::Boolean(_)
            | Object::Integer(_)
            | Object::Real(_)
            | Object::Name(_)
            | Object::Reference(_) => {}
        }
        Ok(())
    }

    fn transform_dictionary(
        &self,
        id: ObjectId,
        dict: &mut Dictionary,
        transform: &mut Transform<'_>,
    ) -> PDFSecurityResult<()> {
        for value in dict.values_mut() {
            self.transform(id, value, transform)?;
        }
        Ok(())
    }

    fn apply(
        &self,
        id: ObjectId,
        bytes: &[u8],
        transform: &mut Transform<'_>,
    ) -> PDFSecurityResult<Vec<u8>> {
        match transform {
            Transform::Encrypt(rng) => self.engine.encrypt_bytes(id, bytes, &mut **rng),
            Transform::Decrypt => self.engine.decrypt_bytes(id, bytes),
        }
    }
}

#[cfg(feature = "parallel")]
fn for_each_object<T, F>(work: Vec<(ObjectId, &mut Object, T)>, f: F) -> PDFSecurityResult<()>
where
    T: Send,
    F: Fn(ObjectId, &mut Object, T) -> PDFSecurityResult<()> + Send + Sync,
{
    use rayon::prelude::*;

    work.into_par_iter()
        .try_for_each(|(id, object, extra)| f(id, object, extra))
}

#[cfg(not(feature = "parallel"))]
fn for_each_object<T, F>(work: Vec<(ObjectId, &mut Object, T)>, f: F) -> PDFSecurityResult<()>
where
    T: Send,
    F: Fn(ObjectId, &mut Object, T) -> PDFSecurityResult<()> + Send + Sync,
{
    work.into_iter()
        .try_for_each(|(id, object, extra)| f(id, object, extra))
}
