use std::path::PathBuf;

/// Where the media payload comes from.
///
/// Byte buffers arrive from an inbound message and are staged to a scoped
/// temporary file for upload; a directory source is scanned for the first
/// file with a recognized media extension.
#[derive(Debug, Clone)]
pub enum MediaSource {
    Bytes(Vec<u8>),
    Directory(PathBuf),
}

/// The payload to publish. Owned by the caller, read-only to the engine.
#[derive(Debug, Clone)]
pub struct Post {
    pub media: MediaSource,
    pub caption: String,
    pub tags: Vec<String>,
}

impl Post {
    pub fn new(media: MediaSource, caption: impl Into<String>) -> Self {
        Self {
            media,
            caption: caption.into(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Tags joined for typing into a single input field.
    pub fn tag_line(&self) -> String {
        self.tags.join(" ")
    }
}
