//! Request body stream.
//!
//! The server parses only the request head; the body stays on the socket and
//! is exposed through [`RequestBody`], which reads at most the declared
//! `Content-Length` bytes from its source. A body can be piped into a
//! downstream writer, detached again, or drained so that the connection can be
//! closed without leaving unread data behind.

use async_std::io::{self, Read, ReadExt, Write, WriteExt};

/// Chunk size used when pumping or draining a body.
pub const CHUNK_SIZE: usize = 8192;

type BodySource = Box<dyn Read + Unpin + Send>;
type BodySink = Box<dyn Write + Unpin + Send>;

/// Outcome of a single drain step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainProgress {
    /// Some bytes were discarded, more are expected.
    Pending(usize),
    Finished,
}

pub struct RequestBody {
    source: Option<BodySource>,
    remaining: u64,
    received: u64,
    pipe: Option<BodySink>,
}

impl RequestBody {
    /// A body with nothing to read.
    pub fn empty() -> Self {
        Self {
            source: None,
            remaining: 0,
            received: 0,
            pipe: None,
        }
    }

    /// A body of `length` bytes to be read from `source`.
    pub fn new<R>(source: R, length: u64) -> Self
    where
        R: Read + Unpin + Send + 'static,
    {
        if length == 0 {
            return Self::empty();
        }

        Self {
            source: Some(Box::new(source)),
            remaining: length,
            received: 0,
            pipe: None,
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let length = bytes.len() as u64;
        Self::new(io::Cursor::new(bytes), length)
    }

    /// True once the declared length has been read, or the source ended or failed.
    pub fn is_finished(&self) -> bool {
        self.source.is_none()
    }

    /// Bytes still expected from the source.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Bytes read from the source so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// Attaches a downstream consumer; [`pump`](Self::pump) forwards chunks into it.
    pub fn pipe<W>(&mut self, dest: W)
    where
        W: Write + Unpin + Send + 'static,
    {
        self.pipe = Some(Box::new(dest));
    }

    pub fn is_piped(&self) -> bool {
        self.pipe.is_some()
    }

    /// Detaches the downstream consumer, if any. Never fails.
    pub fn unpipe(&mut self) -> bool {
        self.pipe.take().is_some()
    }

    /// Reads the next chunk of the body into `buf`.
    ///
    /// Returns `Ok(0)` once the body is finished. A source that ends before
    /// the declared length yields `UnexpectedEof`; the body is then finished.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };

        let limit = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let result = loop {
            match source.read(&mut buf[..limit]).await {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => break other,
            }
        };

        let n = match result {
            Ok(n) => n,
            Err(e) => {
                self.finish();
                return Err(e);
            }
        };

        if n == 0 && limit > 0 {
            self.finish();
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("request body ended {} bytes early", self.remaining),
            ));
        }

        self.remaining -= n as u64;
        self.received += n as u64;
        if self.remaining == 0 {
            self.finish();
        }
        Ok(n)
    }

    /// Reads one chunk and forwards it to the pipe destination.
    ///
    /// Without a destination the chunk is discarded.
    pub async fn pump(&mut self) -> io::Result<usize> {
        let mut buf = vec![0; CHUNK_SIZE];
        let n = self.read_chunk(&mut buf).await?;
        if let Some(dest) = self.pipe.as_mut() {
            dest.write_all(&buf[..n]).await?;
            if self.source.is_none() {
                dest.flush().await?;
            }
        }
        Ok(n)
    }

    /// Discards one chunk of the body.
    pub async fn drain_chunk(&mut self) -> io::Result<DrainProgress> {
        if self.is_finished() {
            return Ok(DrainProgress::Finished);
        }

        let mut buf = vec![0; CHUNK_SIZE];
        let n = self.read_chunk(&mut buf).await?;
        if self.is_finished() {
            Ok(DrainProgress::Finished)
        } else {
            Ok(DrainProgress::Pending(n))
        }
    }

    /// Discards the rest of the body, returning how many bytes were dropped.
    pub async fn drain(&mut self) -> io::Result<u64> {
        let before = self.received;
        while let DrainProgress::Pending(_) = self.drain_chunk().await? {}
        Ok(self.received - before)
    }

    fn finish(&mut self) {
        self.source = None;
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBody")
            .field("finished", &self.is_finished())
            .field("remaining", &self.remaining)
            .field("received", &self.received)
            .field("piped", &self.is_piped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[async_std::test]
    async fn empty_body_is_finished() {
        let mut body = RequestBody::from_bytes(Vec::new());
        assert!(body.is_finished());
        assert_eq!(body.drain_chunk().await.unwrap(), DrainProgress::Finished);
    }

    #[async_std::test]
    async fn drain_reads_only_declared_length() {
        let mut body = RequestBody::new(io::Cursor::new(b"hello world".to_vec()), 5);
        assert_eq!(body.drain().await.unwrap(), 5);
        assert!(body.is_finished());
        assert_eq!(body.remaining(), 0);
    }

    #[async_std::test]
    async fn drain_spans_several_chunks() {
        let mut body = RequestBody::from_bytes(vec![b'x'; CHUNK_SIZE * 3 + 7]);
        assert_eq!(body.drain_chunk().await.unwrap(), DrainProgress::Pending(CHUNK_SIZE));
        assert_eq!(body.drain().await.unwrap(), (CHUNK_SIZE * 2 + 7) as u64);
        assert!(body.is_finished());
    }

    #[async_std::test]
    async fn early_eof_finishes_with_error() {
        let mut body = RequestBody::new(io::Cursor::new(b"abc".to_vec()), 10);
        let err = body.drain().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(body.is_finished());
        assert_eq!(body.received(), 3);
    }

    #[async_std::test]
    async fn pump_forwards_into_pipe() {
        let mut body = RequestBody::from_bytes(b"payload".to_vec());
        body.pipe(Vec::new());
        assert!(body.is_piped());
        assert_eq!(body.pump().await.unwrap(), 7);
        assert!(body.is_finished());
    }

    #[test]
    fn unpipe_without_destination_is_harmless() {
        let mut body = RequestBody::empty();
        assert!(!body.unpipe());
        body.pipe(Vec::new());
        assert!(body.unpipe());
        assert!(!body.is_piped());
    }
}
