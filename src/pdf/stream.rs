//! PDF stream object implementation

use super::{Dictionary, Object};

/// PDF stream object.
///
/// `content` is the raw payload exactly as stored in the file, after any /Filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Stream dictionary
    pub dict: Dictionary,
    /// Raw stream data
    pub content: Vec<u8>,
}

impl Stream {
    /// Create new stream object; /Length is set from the payload
    pub fn new(mut dict: Dictionary, content: Vec<u8>) -> Self {
        dict.set("Length", content.len() as i64);
        Self { dict, content }
    }

    /// Names in the /Filter entry, in application order
    pub fn filters(&self) -> Vec<&str> {
        match self.dict.get("Filter") {
            Some(Object::Name(name)) => vec![name.as_str()],
            Some(Object::Array(items)) => items.iter().filter_map(Object::as_name).collect(),
            _ => Vec::new(),
        }
    }

    /// Whether the stream selects its own crypt filter through /Filter /Crypt
    pub fn has_crypt_filter(&self) -> bool {
        self.filters().contains(&"Crypt")
    }

    /// Cross-reference stream (/Type /XRef)
    pub fn is_xref(&self) -> bool {
        self.dict.has_type("XRef")
    }

    /// Metadata stream (/Type /Metadata)
    pub fn is_metadata(&self) -> bool {
        self.dict.has_type("Metadata")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_set() {
        let stream = Stream::new(Dictionary::new(), b"BT ET".to_vec());
        assert_eq!(stream.dict.get_integer("Length"), Some(5));
    }

    #[test]
    fn test_filter_chain() {
        let mut dict = Dictionary::new();
        dict.set(
            "Filter",
            vec![Object::name("Crypt"), Object::name("FlateDecode")],
        );
        let stream = Stream::new(dict, Vec::new());
        assert_eq!(stream.filters(), ["Crypt", "FlateDecode"]);
        assert!(stream.has_crypt_filter());

        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("FlateDecode"));
        assert!(!Stream::new(dict, Vec::new()).has_crypt_filter());
    }

    #[test]
    fn test_stream_types() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Metadata"));
        let stream = Stream::new(dict, Vec::new());
        assert!(stream.is_metadata());
        assert!(!stream.is_xref());
    }
}
