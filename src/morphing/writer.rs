//! Morphing frame writer.
//!
//! Reshapes one outgoing frame into a sequence of wire frames whose sizes
//! and spacing follow a traffic profile. Frames that exceed the sampled
//! target split; the remainder is only written after the head frame has
//! been flushed and its delay observed, so the receiver sees payload bytes
//! in order. Frames under the target are followed by a PADDING frame of
//! cover bytes, which the receive side discards; application bytes
//! delivered with morphing on are exactly those delivered with it off.

use tokio::io::AsyncWrite;
use tokio::time::sleep;

use crate::codec::{Frame, FrameEncoder};
use crate::error::Result;
use crate::morphing::profile::{pad, TrafficProfile};

/// Write a frame shaped to the given profile.
///
/// Each emitted wire frame is followed by a delay sampled from the
/// profile's delay distribution.
pub async fn write_morphed<W>(
    writer: &mut W,
    encoder: &mut FrameEncoder,
    frame: &Frame,
    profile: &TrafficProfile,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut remaining: &[u8] = &frame.payload;

    loop {
        let target = profile.sample_size();

        if remaining.len() > target {
            // Head chunk at exactly the sampled size; the rest goes out in
            // later iterations, preserving order.
            let head = Frame {
                frame_type: frame.frame_type,
                payload: pad(remaining, target),
            };
            encoder.write(writer, &head).await?;
            sleep(profile.sample_delay()).await;
            remaining = &remaining[target..];
            continue;
        }

        // Final chunk: exact payload, then cover bytes up to the target so
        // the observed size still matches the profile.
        let tail = Frame {
            frame_type: frame.frame_type,
            payload: remaining.to_vec(),
        };
        encoder.write(writer, &tail).await?;

        if remaining.len() < target {
            let cover = Frame::padding(pad(&[], target - remaining.len()));
            encoder.write(writer, &cover).await?;
        }

        sleep(profile.sample_delay()).await;
        return Ok(());
    }
}
