// ABOUTME: Line framing for SSMI over any async byte stream
// ABOUTME: Splits inbound bytes on carriage returns and writes terminated lines with buffering

use crate::client::error::{SsmiError, SsmiResult};
use bytes::{Buf, BytesMut};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

/// Line terminator on the wire
pub const TERMINATOR: u8 = b'\r';

/// Longest line the reader buffers before giving up on the peer
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Reading half of an SSMI connection.
///
/// Lines are terminated by a carriage return. Gateways commonly follow it
/// with a line feed, so a leading `\n` on the next line is discarded, and
/// blank lines are skipped entirely.
#[derive(Debug)]
pub struct LineReader<R> {
    stream: R,

    // Bytes received but not yet returned as a line.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            stream,
            // SSMI lines are short; 4KB covers many of them per read.
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read one line, without its terminator.
    ///
    /// Returns `None` when the peer closes the stream between lines. A close
    /// in the middle of a line is an error.
    ///
    /// Cancel safe: partially received data stays buffered, so this can sit
    /// in a `select!` branch.
    pub async fn read_line(&mut self) -> SsmiResult<Option<String>> {
        loop {
            if let Some(line) = self.parse_line()? {
                return Ok(Some(line));
            }

            // `0` indicates "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.iter().all(|b| b.is_ascii_whitespace()) {
                    return Ok(None);
                }
                return Err(SsmiError::Connection(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )));
            }
        }
    }

    /// Take the next complete, non-blank line out of the buffer
    fn parse_line(&mut self) -> SsmiResult<Option<String>> {
        while let Some(end) = self.buffer.iter().position(|b| *b == TERMINATOR) {
            let mut raw = self.buffer.split_to(end + 1);
            raw.truncate(end);
            while raw.first() == Some(&b'\n') {
                raw.advance(1);
            }
            if raw.is_empty() {
                continue;
            }

            let line = String::from_utf8(raw.to_vec()).map_err(|err| {
                SsmiError::Connection(io::Error::new(io::ErrorKind::InvalidData, err))
            })?;
            return Ok(Some(line));
        }

        if self.buffer.len() > MAX_LINE_LENGTH {
            return Err(SsmiError::LineTooLong(MAX_LINE_LENGTH));
        }
        Ok(None)
    }
}

/// Writing half of an SSMI connection
#[derive(Debug)]
pub struct LineWriter<W: AsyncWrite> {
    // Buffered so a line and its terminator go out in one write.
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream: BufWriter::new(stream),
        }
    }

    /// Write `line` followed by the terminator and flush
    pub async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_u8(TERMINATOR).await?;
        self.stream.flush().await
    }

    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}
