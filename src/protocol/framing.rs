//! Stream framing: pull one complete frame off a byte stream.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::protocol::codec::{Header, HEADER_LEN};
use crate::protocol::error::FramingError;

/// Failure while reading a frame from a stream.
#[derive(Debug, Error)]
pub enum FrameReadError {
    #[error(transparent)]
    Framing(#[from] FramingError),

    #[error("transport error: {0}")]
    Io(#[from] io::Error),
}

/// Read exactly one frame.
///
/// Returns `Ok(None)` when the stream ends cleanly on a frame boundary.
/// Partial reads are accumulated, so a frame split across several transport
/// records is still delivered whole.
pub async fn read_frame<R>(reader: &mut R, max_frame_bytes: u32) -> Result<Option<Vec<u8>>, FrameReadError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    let got = fill(reader, &mut header).await?;
    if got == 0 {
        return Ok(None);
    }
    if got < HEADER_LEN {
        return Err(FramingError::Truncated {
            expected: HEADER_LEN,
            received: got,
        }
        .into());
    }

    let declared = Header::parse(&header)?.length;
    if (declared as usize) < HEADER_LEN || declared > max_frame_bytes {
        return Err(FramingError::LengthOutOfBounds {
            declared,
            max: max_frame_bytes,
        }
        .into());
    }

    let mut frame = vec![0u8; declared as usize];
    frame[..HEADER_LEN].copy_from_slice(&header);
    let body_len = frame.len() - HEADER_LEN;
    let got = fill(reader, &mut frame[HEADER_LEN..]).await?;
    if got < body_len {
        return Err(FramingError::Truncated {
            expected: declared as usize,
            received: HEADER_LEN + got,
        }
        .into());
    }

    Ok(Some(frame))
}

/// Read until `buf` is full or the stream ends. Returns bytes read.
async fn fill<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec::encode;
    use crate::protocol::packet::{Class, Packet};
    use tokio::io::AsyncWriteExt;

    fn sample() -> Vec<u8> {
        let packet = Packet::builder(Class::FSYS, 0xC000_0001).txn("Hello").build();
        encode(&packet, 0).unwrap()
    }

    #[tokio::test]
    async fn reads_back_to_back_frames() {
        let one = sample();
        let mut both = one.clone();
        both.extend_from_slice(&one);

        let mut src: &[u8] = &both;
        assert_eq!(read_frame(&mut src, 1024).await.unwrap(), Some(one.clone()));
        assert_eq!(read_frame(&mut src, 1024).await.unwrap(), Some(one));
        assert_eq!(read_frame(&mut src, 1024).await.unwrap(), None);
    }

    #[tokio::test]
    async fn reassembles_split_writes() {
        let bytes = sample();
        let (mut client, mut server) = tokio::io::duplex(64);

        let expected = bytes.clone();
        let writer = tokio::spawn(async move {
            for chunk in bytes.chunks(5) {
                client.write_all(chunk).await.unwrap();
                tokio::task::yield_now().await;
            }
        });

        let frame = read_frame(&mut server, 1024).await.unwrap();
        assert_eq!(frame, Some(expected));
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn eof_inside_frame_is_truncation() {
        let bytes = sample();
        let mut src: &[u8] = &bytes[..bytes.len() - 3];
        let err = read_frame(&mut src, 1024).await.unwrap_err();
        assert!(matches!(err, FrameReadError::Framing(FramingError::Truncated { .. })));

        let mut src: &[u8] = &bytes[..5];
        let err = read_frame(&mut src, 1024).await.unwrap_err();
        assert!(matches!(
            err,
            FrameReadError::Framing(FramingError::Truncated { expected: 12, received: 5 })
        ));
    }

    #[tokio::test]
    async fn rejects_declared_length_outside_bounds() {
        let mut header = b"fsys".to_vec();
        header.extend_from_slice(&1u32.to_be_bytes());
        header.extend_from_slice(&8u32.to_be_bytes());
        let mut src: &[u8] = &header;
        let err = read_frame(&mut src, 1024).await.unwrap_err();
        assert!(matches!(
            err,
            FrameReadError::Framing(FramingError::LengthOutOfBounds { declared: 8, .. })
        ));

        let bytes = sample();
        let mut src: &[u8] = &bytes;
        let err = read_frame(&mut src, 16).await.unwrap_err();
        assert!(matches!(
            err,
            FrameReadError::Framing(FramingError::LengthOutOfBounds { max: 16, .. })
        ));
    }
}
