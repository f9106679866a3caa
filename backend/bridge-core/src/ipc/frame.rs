//! Length-prefixed framing over a duplex byte stream.
//!
//! Every frame is a 4-byte little-endian signed length followed by exactly that
//! many payload bytes:
//!
//! ```text
//! +----------------+---------------------------+
//! | len: i32 (LE)  | payload: [u8; len]        |
//! +----------------+---------------------------+
//! ```
//!
//! The codec never hands back a short frame. If the peer goes away before the
//! length or the payload is complete, the read fails with
//! [`IpcError::UnexpectedEndOfStream`].

use crate::error::ipc::IpcError;

use common::ErrorLocation;

use std::panic::Location;

use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Size of the length prefix in bytes.
pub const FRAME_HEADER_LEN: usize = 4;

/// Write one frame and flush it.
///
/// # Errors
///
/// - [`IpcError::Frame`] if the payload does not fit an `i32` length
/// - [`IpcError::Io`] if the stream rejects the write
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), IpcError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let len = i32::try_from(payload.len()).map_err(|_| IpcError::Frame {
        message: format!("Payload of {} bytes exceeds the frame limit", payload.len()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;

    trace!("Wrote frame of {len} bytes");
    Ok(())
}

/// Read one frame with no size policy.
///
/// # Errors
///
/// - [`IpcError::UnexpectedEndOfStream`] if the stream ends mid-frame
/// - [`IpcError::Frame`] if the length prefix is negative
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, IpcError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    read_frame_limited(reader, None).await
}

/// Read one frame, rejecting lengths above `max_len` before allocating.
///
/// # Errors
///
/// Same as [`read_frame`], plus [`IpcError::Frame`] when the announced length is
/// above `max_len`.
pub async fn read_frame_limited<R>(
    reader: &mut R,
    max_len: Option<usize>,
) -> Result<Vec<u8>, IpcError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    read_exactly(reader, &mut header, "frame length").await?;

    let announced = i32::from_le_bytes(header);
    let len = usize::try_from(announced).map_err(|_| IpcError::Frame {
        message: format!("Invalid frame length: {announced}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    if let Some(max_len) = max_len.filter(|max_len| len > *max_len) {
        return Err(IpcError::Frame {
            message: format!("Frame of {len} bytes exceeds the {max_len} byte limit"),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mut payload = vec![0u8; len];
    read_exactly(reader, &mut payload, "frame payload").await?;

    trace!("Read frame of {len} bytes");
    Ok(payload)
}

/// Fill `buf` completely, treating a zero-byte read as a closed stream.
async fn read_exactly<R>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<(), IpcError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let location = ErrorLocation::from(Location::caller());
    let mut filled = 0;

    while filled < buf.len() {
        let read = reader.read(&mut buf[filled..]).await?;
        if read == 0 {
            return Err(IpcError::UnexpectedEndOfStream {
                message: format!(
                    "Stream closed after {filled} of {} bytes of {what}",
                    buf.len()
                ),
                location,
            });
        }
        filled += read;
    }

    Ok(())
}
