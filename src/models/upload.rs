//! Uploaded file model

/// A file part as received from a multipart body, before validation
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    /// Client-supplied file name
    pub filename: Option<String>,
    /// Client-declared MIME type
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}
