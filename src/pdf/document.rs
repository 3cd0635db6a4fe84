//! In-memory document: indirect objects addressed by (number, generation) plus the trailer

use std::collections::btree_map::{self, BTreeMap};

use log::debug;

use super::{Dictionary, Object, ObjectId};
use crate::crypto::RandomSource;
use crate::error::{PDFSecurityError, PDFSecurityResult};

/// Length of a generated /ID element
const DOCUMENT_ID_LEN: usize = 16;

/// PDF document object graph
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Header version as (major, minor)
    pub version: (u8, u8),
    /// Trailer dictionary (/Root, /Info, /ID, /Encrypt)
    pub trailer: Dictionary,
    objects: BTreeMap<ObjectId, Object>,
    max_id: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty PDF 1.7 document
    pub fn new() -> Self {
        Self::with_version(1, 7)
    }

    pub fn with_version(major: u8, minor: u8) -> Self {
        Self {
            version: (major, minor),
            trailer: Dictionary::new(),
            objects: BTreeMap::new(),
            max_id: 0,
        }
    }

    /// Add an object under the next free object number, generation 0
    pub fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.max_id += 1;
        let id = (self.max_id, 0);
        self.objects.insert(id, object.into());
        id
    }

    /// Insert or replace the object at `id`
    pub fn set_object(&mut self, id: ObjectId, object: impl Into<Object>) {
        self.max_id = self.max_id.max(id.0);
        self.objects.insert(id, object.into());
    }

    pub fn get_object(&self, id: ObjectId) -> PDFSecurityResult<&Object> {
        self.objects
            .get(&id)
            .ok_or(PDFSecurityError::ObjectNotFound(id.0, id.1))
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> PDFSecurityResult<&mut Object> {
        self.objects
            .get_mut(&id)
            .ok_or(PDFSecurityError::ObjectNotFound(id.0, id.1))
    }

    /// Remove the object at `id`; the next free number drops back when it was the highest
    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        let removed = self.objects.remove(&id);
        if removed.is_some() && id.0 == self.max_id {
            self.max_id = self.objects.keys().next_back().map_or(0, |&(number, _)| number);
        }
        removed
    }

    /// Follow `object` if it is a reference, otherwise return it
    pub fn dereference<'a>(&'a self, object: &'a Object) -> PDFSecurityResult<&'a Object> {
        match object {
            Object::Reference(id) => self.get_object(*id),
            other => Ok(other),
        }
    }

    pub fn objects(&self) -> btree_map::Iter<'_, ObjectId, Object> {
        self.objects.iter()
    }

    pub fn objects_mut(&mut self) -> btree_map::IterMut<'_, ObjectId, Object> {
        self.objects.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Highest object number in use
    pub fn max_id(&self) -> u32 {
        self.max_id
    }

    /// First element of the trailer's /ID array
    pub fn identity(&self) -> PDFSecurityResult<&[u8]> {
        self.trailer
            .get_array("ID")
            .and_then(|ids| ids.first())
            .and_then(Object::as_string)
            .ok_or(PDFSecurityError::MissingDocumentId)
    }

    /// Return the document identity, generating one if the trailer has no /ID
    pub fn ensure_identity(&mut self, rng: &mut dyn RandomSource) -> PDFSecurityResult<Vec<u8>> {
        if let Ok(id) = self.identity() {
            return Ok(id.to_vec());
        }

        let mut id = vec![0u8; DOCUMENT_ID_LEN];
        rng.fill(&mut id)?;
        debug!("Generated {}-byte document identifier", id.len());
        self.trailer.set(
            "ID",
            vec![Object::String(id.clone()), Object::String(id.clone())],
        );
        Ok(id)
    }

    /// Object id the trailer's /Encrypt entry points to
    pub fn encryption_reference(&self) -> Option<ObjectId> {
        self.trailer.get_reference("Encrypt")
    }

    /// Whether the trailer carries an /Encrypt entry, direct or indirect
    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    /// The /Encrypt dictionary, resolving the trailer reference if needed
    pub fn encryption_dictionary(&self) -> PDFSecurityResult<&Dictionary> {
        let entry = self
            .trailer
            .get("Encrypt")
            .ok_or(PDFSecurityError::NotEncrypted)?;

        self.dereference(entry)?.as_dict().ok_or_else(|| {
            PDFSecurityError::invalid_dict_value("Encrypt", "expected a dictionary")
        })
    }
}
