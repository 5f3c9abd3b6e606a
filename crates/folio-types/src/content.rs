use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Content attached to a document: opaque bytes plus media-type metadata.
///
/// Cloning is cheap; versions created by checkout share the same buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentStream {
    pub mime_type: String,
    pub file_name: Option<String>,
    pub data: Bytes,
}

impl ContentStream {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: mime_type.into(),
            file_name: None,
            data: data.into(),
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Length in bytes.
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
