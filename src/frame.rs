use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Byte terminating every frame on the wire. Never appears inside a payload.
pub const DELIMITER: u8 = 0x00;

/// Accumulates bytes from a socket and yields complete NUL-delimited frames.
///
/// Frames may be split across any number of reads, or several may arrive in
/// one read; a partial frame stays buffered until its delimiter shows up.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Returns the next complete frame, consuming it and its delimiter.
    /// `None` means no delimiter is buffered yet; call again after `extend`.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let idx = self.buf.iter().position(|&b| b == DELIMITER)?;
        let frame = self.buf[..idx].to_vec();
        self.buf.drain(..=idx);
        Some(frame)
    }
}

/// Total bytes-to-text conversion: undecodable sequences are replaced, never
/// fatal. Surrounding whitespace is trimmed.
pub fn frame_text(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame).trim().to_string()
}

pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    let mut frame = Vec::new();
    let bytes = reader.read_until(DELIMITER, &mut frame).await?;
    if bytes == 0 {
        return Ok(None);
    }
    match frame.last() {
        Some(&DELIMITER) => {
            frame.pop();
            Ok(Some(frame))
        }
        // EOF cut the stream mid-frame; the partial tail is discarded.
        _ => Ok(None),
    }
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload).await?;
    writer.write_all(&[DELIMITER]).await?;
    writer.flush().await?;
    Ok(())
}
