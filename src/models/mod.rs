//! Data models shared by extraction, storage and the HTTP surface.

mod document;

pub use document::{
    extension_of, AppliedSelector, DocumentReference, ExtractionOutcome, ExtractionSelector,
    DEFAULT_CONTENT_TYPE,
};
