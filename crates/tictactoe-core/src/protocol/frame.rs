//! Length-prefixed framing for text messages over a byte stream.
//!
//! Wire format: `[4-byte big-endian length][UTF-8 payload]`.
//!
//! TCP is a stream, not a sequence of messages, so every protocol line is
//! wrapped in a frame.  The `update` body spans several lines, which rules out
//! newline delimiting.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use thiserror::Error;
use tracing::trace;

/// Maximum allowed frame payload (64 KiB).  A board update is well under 100 bytes.
pub const MAX_FRAME_SIZE: u32 = 64 * 1024;

/// Errors raised while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed the stream (clean EOF at or inside a frame).
    #[error("connection closed by peer")]
    Closed,

    #[error("empty frame")]
    Empty,

    #[error("frame too large: {0} bytes (max {max})", max = MAX_FRAME_SIZE)]
    TooLarge(usize),

    #[error("frame payload is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("I/O error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            FrameError::Closed
        } else {
            FrameError::Io(e)
        }
    }
}

/// Reads one frame and returns its payload as a string.
///
/// # Errors
///
/// [`FrameError::Closed`] on EOF, [`FrameError::Empty`] / [`FrameError::TooLarge`]
/// for a bad length prefix, [`FrameError::Utf8`] for a non-text payload.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String, FrameError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf);
    if len == 0 {
        return Err(FrameError::Empty);
    }
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(len as usize));
    }

    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;
    trace!(len, "frame read");

    Ok(String::from_utf8(payload)?)
}

/// Writes `text` as one frame and flushes the writer.
///
/// # Errors
///
/// [`FrameError::Empty`] / [`FrameError::TooLarge`] if `text` cannot be framed,
/// [`FrameError::Io`] (or [`FrameError::Closed`]) if the write fails.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    text: &str,
) -> Result<(), FrameError> {
    let payload = text.as_bytes();
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }
    if payload.len() > MAX_FRAME_SIZE as usize {
        return Err(FrameError::TooLarge(payload.len()));
    }

    writer
        .write_all(&(payload.len() as u32).to_be_bytes())
        .await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_multiline_payload_survives_framing() {
        // Arrange
        let text = "server/ update  X │   │   \n───┼───┼───\n   │   │   ";
        let mut buf = Vec::new();

        // Act
        write_frame(&mut buf, text).await.unwrap();
        let mut cursor = Cursor::new(buf);
        let decoded = read_frame(&mut cursor).await.unwrap();

        // Assert
        assert_eq!(decoded, text);
    }

    #[tokio::test]
    async fn test_consecutive_frames_are_read_in_order() {
        let mut buf = Vec::new();
        write_frame(&mut buf, "server/ turn alice").await.unwrap();
        write_frame(&mut buf, "server/ draw").await.unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), "server/ turn alice");
        assert_eq!(read_frame(&mut cursor).await.unwrap(), "server/ draw");
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(FrameError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_empty_frame_rejected() {
        let mut cursor = Cursor::new(vec![0, 0, 0, 0]);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(FrameError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let len = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let mut cursor = Cursor::new(len.to_vec());
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(FrameError::TooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_payload_reports_closed() {
        let mut bytes = 10u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(b"abc");
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(FrameError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let mut bytes = 2u32.to_be_bytes().to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        let mut cursor = Cursor::new(bytes);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(FrameError::Utf8(_))
        ));
    }

    #[tokio::test]
    async fn test_write_refuses_empty_text() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_frame(&mut buf, "").await,
            Err(FrameError::Empty)
        ));
        assert!(buf.is_empty());
    }
}
