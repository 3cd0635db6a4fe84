//! PDF dictionary implementation

use std::collections::btree_map::{self, BTreeMap};

use super::{Object, ObjectId};

/// PDF dictionary object.
///
/// Keys are stored without the leading slash and iterate in sorted order, which keeps
/// serialized output stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: BTreeMap<String, Object>,
}

impl Dictionary {
    /// Create new dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Get value by key
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries.get_mut(key)
    }

    /// Get integer value
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Object::as_integer)
    }

    /// Get name value
    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Object::as_name)
    }

    /// Get string value as raw bytes
    pub fn get_string(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_string)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Object::as_bool)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(Object::as_dict)
    }

    pub fn get_array(&self, key: &str) -> Option<&[Object]> {
        self.get(key).and_then(Object::as_array)
    }

    /// Get reference value
    pub fn get_reference(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(Object::as_reference)
    }

    /// Whether /Type names `type_name`
    pub fn has_type(&self, type_name: &str) -> bool {
        self.get_name("Type") == Some(type_name)
    }

    /// Set value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Object>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.entries.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Object> {
        self.entries.iter()
    }

    pub fn values_mut(&mut self) -> btree_map::ValuesMut<'_, String, Object> {
        self.entries.values_mut()
    }
}

impl<K: Into<String>, V: Into<Object>> FromIterator<(K, V)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in iter {
            dict.set(key, value);
        }
        dict
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a Object);
    type IntoIter = btree_map::Iter<'a, String, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
