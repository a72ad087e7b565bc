pub mod document;
pub mod error;

pub use document::{Document, DocumentMetadata};
pub use error::{Result, StoreError};
