//! Live-view frame decoder
//!
//! Every packet on the stream is an 8-byte common header, a 128-byte
//! payload header, then `payload_size + padding_size` bytes of payload.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

pub const COMMON_HEADER_LEN: usize = 8;
pub const PAYLOAD_HEADER_LEN: usize = 128;
pub const HEADER_LEN: usize = COMMON_HEADER_LEN + PAYLOAD_HEADER_LEN;

/// Payload type marker for JPEG images
pub const PAYLOAD_TYPE_JPEG: u8 = 0x01;

/// Parsed packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub payload_type: u8,
    pub sequence: u16,
    pub payload_size: usize,
    pub padding_size: usize,
}

impl FrameHeader {
    pub fn parse(buf: &[u8; HEADER_LEN]) -> Self {
        let size_at = COMMON_HEADER_LEN + 4;
        let payload_size = (usize::from(buf[size_at]) << 16)
            | (usize::from(buf[size_at + 1]) << 8)
            | usize::from(buf[size_at + 2]);

        Self {
            payload_type: buf[1],
            sequence: u16::from_be_bytes([buf[2], buf[3]]),
            payload_size,
            padding_size: usize::from(buf[size_at + 3]),
        }
    }

    pub fn is_jpeg(&self) -> bool {
        self.payload_type == PAYLOAD_TYPE_JPEG
    }

    /// Bytes following the header that belong to this packet
    pub fn body_len(&self) -> usize {
        self.payload_size + self.padding_size
    }
}

/// One JPEG payload, padding stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub sequence: u16,
    pub data: Vec<u8>,
}

/// Pulls JPEG frames out of a live-view byte stream
pub struct FrameDecoder<R> {
    reader: R,
    header: [u8; HEADER_LEN],
    /// Completed header+payload cycles, JPEG or not
    progress: Arc<AtomicU64>,
}

impl<R: AsyncRead + Unpin> FrameDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self::with_progress(reader, Arc::new(AtomicU64::new(0)))
    }

    /// Share the cycle counter with a supervisor
    pub fn with_progress(reader: R, progress: Arc<AtomicU64>) -> Self {
        Self {
            reader,
            header: [0u8; HEADER_LEN],
            progress,
        }
    }

    pub fn progress(&self) -> u64 {
        self.progress.load(Ordering::Relaxed)
    }

    /// Next JPEG frame; non-image packets are drained and skipped
    ///
    /// `Ok(None)` means the stream ended cleanly on a packet boundary.
    pub async fn next_image(&mut self) -> Result<Option<DecodedImage>> {
        loop {
            let Some(header) = self.read_header().await? else {
                return Ok(None);
            };

            let mut body = vec![0u8; header.body_len()];
            self.reader.read_exact(&mut body).await.map_err(|e| {
                Error::Protocol(format!(
                    "truncated payload (expected {} bytes): {}",
                    header.body_len(),
                    e
                ))
            })?;

            self.progress.fetch_add(1, Ordering::Relaxed);

            if !header.is_jpeg() {
                tracing::trace!(
                    payload_type = header.payload_type,
                    size = header.body_len(),
                    "Skipping non-image packet"
                );
                continue;
            }

            body.truncate(header.payload_size);
            return Ok(Some(DecodedImage {
                sequence: header.sequence,
                data: body,
            }));
        }
    }

    async fn read_header(&mut self) -> Result<Option<FrameHeader>> {
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = self.reader.read(&mut self.header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(Error::Protocol(format!(
                    "truncated header ({} of {} bytes)",
                    filled, HEADER_LEN
                )));
            }
            filled += n;
        }

        Ok(Some(FrameHeader::parse(&self.header)))
    }
}
