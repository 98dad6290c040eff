//! Stream wrapper that replays already-consumed bytes.
//!
//! The inbound orchestrator has to read a connection's opening bytes before
//! it knows who should own the connection. When those bytes belong to a
//! later stage (frame data that arrived with the handshake, or a non-Reflex
//! prelude bound for a fallback back-end), this wrapper serves them first
//! and then reads from the raw stream. Writes pass straight through.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A stream with a replayed prefix.
pub struct PeekedStream<S> {
    prefix: Vec<u8>,
    pos: usize,
    inner: S,
}

impl<S> PeekedStream<S> {
    /// Wrap `inner`, serving `prefix` before any reads from it.
    pub fn new(prefix: Vec<u8>, inner: S) -> Self {
        Self {
            prefix,
            pos: 0,
            inner,
        }
    }

    /// Bytes of the prefix not yet handed to a reader.
    pub fn remaining_prefix(&self) -> &[u8] {
        &self.prefix[self.pos..]
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for PeekedStream<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        if this.pos < this.prefix.len() {
            let n = buf.remaining().min(this.prefix.len() - this.pos);
            buf.put_slice(&this.prefix[this.pos..this.pos + n]);
            this.pos += n;
            return Poll::Ready(Ok(()));
        }

        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for PeekedStream<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_prefix_then_stream() {
        let inner: &[u8] = b" world";
        let mut stream = PeekedStream::new(b"hello".to_vec(), inner);

        let mut out = String::new();
        stream.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn test_small_reads_drain_prefix() {
        let inner: &[u8] = b"cd";
        let mut stream = PeekedStream::new(b"ab".to_vec(), inner);

        let mut byte = [0u8; 1];
        for expected in *b"abcd" {
            stream.read_exact(&mut byte).await.unwrap();
            assert_eq!(byte[0], expected);
        }
    }

    #[tokio::test]
    async fn test_empty_prefix_passthrough() {
        let inner: &[u8] = b"data";
        let mut stream = PeekedStream::new(Vec::new(), inner);

        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"data");
    }

    #[tokio::test]
    async fn test_writes_bypass_prefix() {
        let (a, mut b) = tokio::io::duplex(64);
        let mut stream = PeekedStream::new(b"prefix".to_vec(), a);

        stream.write_all(b"sent").await.unwrap();
        stream.flush().await.unwrap();

        let mut received = [0u8; 4];
        b.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"sent");

        // Prefix untouched by the write path.
        assert_eq!(stream.remaining_prefix(), b"prefix");
    }
}
