//! In-memory PDF object graph consumed and produced by the security handler

mod dict;
mod document;
mod object;
mod stream;
mod writer;

pub use dict::Dictionary;
pub use document::Document;
pub use object::{Object, ObjectId};
pub use stream::Stream;
