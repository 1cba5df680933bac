//! Upload service: turns local binary resources into remote references.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// A binary resource to upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ExternalResource {
    pub bytes: Vec<u8>,
    /// Format hint such as `png` or `mp4`.
    pub format: Option<String>,
    pub file_name: Option<String>,
}

impl ExternalResource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            format: None,
            file_name: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for ExternalResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalResource")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("format", &self.format)
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Where an uploaded resource ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Reference usable as the `file` field of an image or video segment.
    pub file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// External upload collaborator.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload(&self, resource: &ExternalResource) -> Result<RemoteFile, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_bytes() {
        let resource = ExternalResource::new(vec![1u8; 2048]).with_format("png");
        let text = format!("{resource:?}");
        assert!(text.contains("<2048 bytes>"));
        assert!(text.contains("png"));
        assert_eq!(resource.len(), 2048);
        assert!(!resource.is_empty());
    }
}
