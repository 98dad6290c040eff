//! Frame relay loops.
//!
//! The two halves of a running session: decrypt inbound frames into a byte
//! sink, and wrap outbound bytes into frames. Each loop owns one codec and
//! one direction; the orchestrators race them under `tokio::select!` so
//! either direction ending tears down the other at its next await point.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::codec::{Frame, FrameDecoder, FrameEncoder, FrameType, MAX_FRAME_PAYLOAD};
use crate::error::Result;
use crate::morphing::{write_morphed, MorphingConfig};

/// Decrypt frames from `reader` and forward DATA payloads into `sink`.
///
/// CLOSE ends the loop cleanly; PADDING and TIMING are discarded; an
/// unknown frame type surfaces as an error from the decoder and closes the
/// session.
pub async fn frames_to_sink<R, W>(
    decoder: &mut FrameDecoder,
    reader: &mut R,
    sink: &mut W,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = decoder.read(reader).await?;
        match frame.frame_type {
            FrameType::Data => {
                if !frame.payload.is_empty() {
                    sink.write_all(&frame.payload).await?;
                }
            }
            FrameType::Close => {
                trace!("close frame received");
                return Ok(());
            }
            FrameType::Padding | FrameType::Timing => {
                trace!(frame_type = ?frame.frame_type, "control frame discarded");
            }
        }
    }
}

/// Read byte chunks from `source` and write them as DATA frames.
///
/// Chunks are capped at the frame payload limit; EOF on the source sends a
/// CLOSE frame and ends the loop. With morphing enabled, every frame goes
/// through the profile's size and delay shaping.
pub async fn source_to_frames<R, W>(
    encoder: &mut FrameEncoder,
    source: &mut R,
    writer: &mut W,
    morphing: &MorphingConfig,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; MAX_FRAME_PAYLOAD];

    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            encoder.write(writer, &Frame::close()).await?;
            return Ok(());
        }

        let frame = Frame::data(buf[..n].to_vec());
        if morphing.enabled {
            write_morphed(writer, encoder, &frame, morphing.profile).await?;
        } else {
            encoder.write(writer, &frame).await?;
        }
    }
}
