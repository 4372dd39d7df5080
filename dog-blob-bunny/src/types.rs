use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::time::Duration;

use crate::BlobResult;

/// Stream of bytes for blob content
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk stream
pub fn stream_from_bytes<B: Into<Bytes>>(data: B) -> ByteStream {
    let data = data.into();
    Box::pin(futures_util::stream::once(async move { Ok(data) }))
}

/// Drain a stream into one contiguous buffer
pub async fn collect_stream(mut stream: ByteStream) -> BlobResult<Bytes> {
    let mut data = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        data.extend_from_slice(&chunk?);
    }
    Ok(data.freeze())
}

/// Byte range for partial content requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>, // None means "to end of file"
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn from_start(start: u64) -> Self {
        Self { start, end: None }
    }
}

/// How the browser should present a downloaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispositionType {
    #[default]
    Inline,
    Attachment,
}

impl DispositionType {
    /// Parse a disposition; anything other than `attachment` falls back to `inline`
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("attachment") {
            Self::Attachment
        } else {
            Self::Inline
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

/// Optional metadata attached to an upload.
///
/// None of these fields change the key; they only shape the backend request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub checksum: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub disposition: Option<DispositionType>,
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checksum<S: Into<String>>(mut self, checksum: S) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_disposition(mut self, disposition: DispositionType) -> Self {
        self.disposition = Some(disposition);
        self
    }
}

/// Parameters for URL generation. Bunny ignores all of them for private URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    pub expires_in: Duration,
    pub filename: Option<String>,
    pub disposition: DispositionType,
    pub content_type: Option<String>,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            expires_in: Duration::from_secs(5 * 60),
            filename: None,
            disposition: DispositionType::Inline,
            content_type: None,
        }
    }
}

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_disposition(mut self, disposition: DispositionType) -> Self {
        self.disposition = disposition;
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
