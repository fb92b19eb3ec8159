use std::io::{self, Write};
use std::sync::Arc;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;

/// Request body that can be re-serialized for every physical attempt.
///
/// The engine never buffers content itself; a retry or redirect simply calls
/// `write_to` again, so implementations must produce the same bytes on every
/// call.
pub trait HttpContent: Send + Sync {
    /// Declared media type, if any.
    fn media_type(&self) -> Option<&str>;

    /// Declared length in bytes, or `None` when it is not known up front.
    fn length(&self) -> Option<u64>;

    /// Serialize the content into `out`.
    fn write_to(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Buffered content backed by [`Bytes`].
#[derive(Clone, Debug)]
pub struct BytesContent {
    media_type: Option<String>,
    body: Bytes,
}

impl BytesContent {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            media_type: None,
            body: body.into(),
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

impl HttpContent for BytesContent {
    fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    fn length(&self) -> Option<u64> {
        Some(self.body.len() as u64)
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&self.body)
    }
}

/// Gzip-compresses the wrapped content while it streams out.
pub(crate) struct GzipContent {
    inner: Arc<dyn HttpContent>,
}

impl GzipContent {
    pub(crate) fn new(inner: Arc<dyn HttpContent>) -> Self {
        Self { inner }
    }
}

impl HttpContent for GzipContent {
    fn media_type(&self) -> Option<&str> {
        self.inner.media_type()
    }

    fn length(&self) -> Option<u64> {
        // compressed size is unknown until the stream is written
        None
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut encoder = GzEncoder::new(&mut *out, Compression::default());
        self.inner.write_to(&mut encoder)?;
        encoder.finish()?;
        Ok(())
    }
}

/// Logs the first `limit` serialized bytes of the wrapped content.
pub(crate) struct LoggingContent {
    inner: Arc<dyn HttpContent>,
    limit: usize,
}

impl LoggingContent {
    pub(crate) fn new(inner: Arc<dyn HttpContent>, limit: usize) -> Self {
        Self { inner, limit }
    }
}

struct TeeWriter<'a> {
    out: &'a mut dyn Write,
    captured: Vec<u8>,
    limit: usize,
    total: u64,
}

impl Write for TeeWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.out.write(buf)?;
        self.total += written as u64;
        if self.captured.len() < self.limit {
            let take = (self.limit - self.captured.len()).min(written);
            self.captured.extend_from_slice(&buf[..take]);
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl HttpContent for LoggingContent {
    fn media_type(&self) -> Option<&str> {
        self.inner.media_type()
    }

    fn length(&self) -> Option<u64> {
        self.inner.length()
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        let mut tee = TeeWriter {
            out,
            captured: Vec::new(),
            limit: self.limit,
            total: 0,
        };
        self.inner.write_to(&mut tee)?;
        tracing::debug!(
            total_bytes = tee.total,
            "request content: {}",
            String::from_utf8_lossy(&tee.captured)
        );
        Ok(())
    }
}
