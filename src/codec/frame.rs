//! Authenticated frame encoding and decoding.
//!
//! Every post-handshake byte travels inside a frame:
//!
//! ```text
//! length_be16(2) | ChaCha20-Poly1305(session_key, nonce, [type(1) | payload])
//! ```
//!
//! The nonce is the encoder's private 64-bit counter, little-endian, in the
//! first 8 bytes of the 12-byte nonce. Encoder and decoder each start at
//! zero and increment before every seal/open, so the two sides of one
//! direction walk the same counter sequence. A frame replayed after the
//! decoder has advanced authenticates against the wrong nonce and is
//! rejected; this property holds only while a single decoder serves the
//! direction, so sessions must never construct a second one.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::crypto::{Aead, AeadKey, Nonce};
use crate::error::{Error, Result};

/// Maximum frame payload size in bytes (16 KiB).
///
/// Enforced at the encoder; callers chunk larger buffers upstream.
pub const MAX_FRAME_PAYLOAD: usize = 16384;

/// Frame type byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Application data
    Data = 0x01,
    /// Cover traffic; discarded by the receiver
    Padding = 0x02,
    /// Timing control; discarded by the receiver
    Timing = 0x03,
    /// Graceful end of stream
    Close = 0x04,
}

impl FrameType {
    /// Parse a frame type byte.
    ///
    /// Unknown values are an error rather than a silent skip, so protocol
    /// drift surfaces as a closed connection.
    pub fn from_u8(v: u8) -> Result<Self> {
        match v {
            0x01 => Ok(Self::Data),
            0x02 => Ok(Self::Padding),
            0x03 => Ok(Self::Timing),
            0x04 => Ok(Self::Close),
            other => Err(Error::UnknownFrameType(other)),
        }
    }

    /// The wire byte for this type.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// A decrypted protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type
    pub frame_type: FrameType,
    /// Frame payload, owned independently of any decoder state
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a DATA frame.
    pub fn data(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            frame_type: FrameType::Data,
            payload: payload.into(),
        }
    }

    /// Create a PADDING frame carrying cover bytes.
    pub fn padding(payload: Vec<u8>) -> Self {
        Self {
            frame_type: FrameType::Padding,
            payload,
        }
    }

    /// Create an empty CLOSE frame.
    pub fn close() -> Self {
        Self {
            frame_type: FrameType::Close,
            payload: Vec::new(),
        }
    }
}

/// Encrypting frame encoder for one direction of one session.
///
/// Owns the AEAD state and the strictly increasing counter; not shared
/// between directions.
pub struct FrameEncoder {
    aead: Aead,
    counter: u64,
}

impl FrameEncoder {
    /// Create an encoder bound to a session key. The counter starts at zero.
    pub fn new(session_key: &AeadKey) -> Self {
        Self {
            aead: Aead::new(session_key),
            counter: 0,
        }
    }

    /// Encode and encrypt a frame into its wire envelope.
    pub fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>> {
        if frame.payload.len() > MAX_FRAME_PAYLOAD {
            return Err(Error::frame(format!(
                "payload of {} bytes exceeds maximum of {}",
                frame.payload.len(),
                MAX_FRAME_PAYLOAD
            )));
        }

        self.counter += 1;
        let nonce = Nonce::from_counter(self.counter);

        let mut plaintext = Vec::with_capacity(1 + frame.payload.len());
        plaintext.push(frame.frame_type.as_u8());
        plaintext.extend_from_slice(&frame.payload);

        let ciphertext = self.aead.seal(&nonce, &plaintext, b"")?;

        let mut out = BytesMut::with_capacity(2 + ciphertext.len());
        out.put_u16(ciphertext.len() as u16);
        out.put_slice(&ciphertext);
        Ok(out.to_vec())
    }

    /// Encode a frame and write it to a byte sink.
    pub async fn write<W>(&mut self, writer: &mut W, frame: &Frame) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let data = self.encode(frame)?;
        writer.write_all(&data).await?;
        Ok(())
    }
}

/// Decrypting frame decoder for one direction of one session.
///
/// Mirrors the encoder's counter. Replay resistance is a property of this
/// decoder's state: a fresh decoder sharing only the key would accept a
/// replayed first frame, so exactly one decoder serves a direction for the
/// whole session.
pub struct FrameDecoder {
    aead: Aead,
    counter: u64,
}

impl FrameDecoder {
    /// Create a decoder bound to a session key. The counter starts at zero.
    pub fn new(session_key: &AeadKey) -> Self {
        Self {
            aead: Aead::new(session_key),
            counter: 0,
        }
    }

    /// Decrypt and decode a frame from its complete wire envelope.
    ///
    /// The returned payload is copied out of the decryption buffer, so it
    /// stays valid after the decoder processes further frames.
    pub fn decode(&mut self, data: &[u8]) -> Result<Frame> {
        if data.len() < 2 {
            return Err(Error::frame("frame too short"));
        }

        let length = u16::from_be_bytes([data[0], data[1]]) as usize;
        if data.len() < 2 + length {
            return Err(Error::frame("incomplete frame"));
        }
        let ciphertext = &data[2..2 + length];

        self.counter += 1;
        let nonce = Nonce::from_counter(self.counter);

        let plaintext = self.aead.open(&nonce, ciphertext, b"")?;
        if plaintext.is_empty() {
            return Err(Error::frame("empty frame plaintext"));
        }

        Ok(Frame {
            frame_type: FrameType::from_u8(plaintext[0])?,
            payload: plaintext[1..].to_vec(),
        })
    }

    /// Read one frame from a byte source.
    ///
    /// Reads the 2-byte length, then exactly that many ciphertext bytes. A
    /// zero-length frame is a protocol error (the type byte plus tag make
    /// the minimum envelope 17 bytes).
    pub async fn read<R>(&mut self, reader: &mut R) -> Result<Frame>
    where
        R: AsyncRead + Unpin,
    {
        let mut length_buf = [0u8; 2];
        reader.read_exact(&mut length_buf).await?;

        let length = u16::from_be_bytes(length_buf) as usize;
        if length == 0 {
            return Err(Error::frame("zero-length frame"));
        }

        let mut data = vec![0u8; 2 + length];
        data[0..2].copy_from_slice(&length_buf);
        reader.read_exact(&mut data[2..]).await?;

        self.decode(&data)
    }
}
