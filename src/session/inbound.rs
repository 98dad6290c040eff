//! Inbound session orchestrator.
//!
//! State machine for a freshly accepted connection:
//!
//! 1. Peek the prelude under the handshake deadline.
//! 2. No Reflex magic: hand everything to the fallback demultiplexer.
//! 3. Decode the 76-byte client handshake; reject stale timestamps.
//! 4. Unknown user: fallback again, so a probe replaying captured bytes
//!    sees exactly what a random web client sees.
//! 5. Ephemeral key agreement, server handshake out, deadline cleared.
//! 6. First frame must be DATA and open with the request header; trailing
//!    bytes are the first chunk of user data.
//! 7. Dispatch and relay both directions until either ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::codec::{
    unix_now, validate_timestamp, ClientHandshake, FrameDecoder, FrameEncoder, FrameType,
    ServerHandshake, CLIENT_HANDSHAKE_SIZE, REFLEX_MAGIC, SERVER_HANDSHAKE_SIZE,
};
use crate::crypto::{EphemeralSecret, PublicKey, SessionKeys, SESSION_INFO};
use crate::error::{Error, Result};
use crate::fallback::{classify, forward, FallbackTable};
use crate::morphing::MorphingConfig;
use crate::session::peeked::PeekedStream;
use crate::session::relay::{frames_to_sink, source_to_frames};
use crate::session::request::RequestHeader;
use crate::session::Dispatcher;
use crate::validator::Validator;

/// Largest prelude the classifier looks at.
const PEEK_SIZE: usize = 1024;

/// How an inbound connection was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A full Reflex session ran to completion
    Session,
    /// The connection was spliced to a fallback back-end
    Fallback,
}

/// Inbound connection handler.
pub struct Inbound {
    validator: Arc<Validator>,
    fallbacks: FallbackTable,
    dispatcher: Arc<dyn Dispatcher>,
    handshake_timeout: Duration,
    morphing_enabled: bool,
}

impl Inbound {
    /// Create a handler with the default handshake deadline.
    pub fn new(
        validator: Arc<Validator>,
        fallbacks: FallbackTable,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            validator,
            fallbacks,
            dispatcher,
            handshake_timeout: Duration::from_millis(crate::HANDSHAKE_TIMEOUT_MS),
            morphing_enabled: true,
        }
    }

    /// Override the handshake deadline.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Enable or disable traffic morphing on the response path.
    pub fn with_morphing(mut self, enabled: bool) -> Self {
        self.morphing_enabled = enabled;
        self
    }

    /// Drive one accepted connection to completion.
    pub async fn handle<S>(&self, mut stream: S) -> Result<InboundOutcome>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        // Phase 1: everything up to and including the server handshake runs
        // under the handshake deadline.
        let deadline = self.handshake_timeout;
        let handshake = timeout(deadline, self.run_handshake(&mut stream))
            .await
            .map_err(|_| Error::Timeout(deadline.as_millis() as u64))?;

        match handshake? {
            HandshakePhase::Fallback { prelude } => {
                self.run_fallback(stream, prelude).await?;
                Ok(InboundOutcome::Fallback)
            }
            HandshakePhase::Session {
                leftover,
                keys,
                user_policy,
            } => {
                // Deadline is now cleared; post-handshake pacing belongs to
                // the platform's idle policy.
                let stream = PeekedStream::new(leftover, stream);
                self.run_session(stream, keys, &user_policy).await?;
                Ok(InboundOutcome::Session)
            }
        }
    }

    async fn run_handshake<S>(&self, stream: &mut S) -> Result<HandshakePhase>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let prelude = read_prelude(stream).await?;

        if prelude.len() < 4 {
            return Ok(HandshakePhase::Fallback { prelude });
        }
        let magic = u32::from_be_bytes([prelude[0], prelude[1], prelude[2], prelude[3]]);
        if magic != REFLEX_MAGIC {
            return Ok(HandshakePhase::Fallback { prelude });
        }

        // Top the prelude up to the full handshake record.
        let mut prelude = prelude;
        if prelude.len() < CLIENT_HANDSHAKE_SIZE {
            let have = prelude.len();
            prelude.resize(CLIENT_HANDSHAKE_SIZE, 0);
            stream.read_exact(&mut prelude[have..]).await?;
        }

        let client_hs = ClientHandshake::decode(&prelude[..CLIENT_HANDSHAKE_SIZE])?;

        if !validate_timestamp(client_hs.timestamp) {
            return Err(Error::TimestampSkew);
        }

        let user = match self.validator.get(&client_hs.user_id) {
            Ok(user) => user,
            Err(_) => {
                // Unknown user: indistinguishable from non-Reflex traffic.
                debug!("unknown user id, routing to fallback");
                return Ok(HandshakePhase::Fallback { prelude });
            }
        };

        let server_secret = EphemeralSecret::random();
        let server_public = PublicKey::from(&server_secret);
        let shared = server_secret.diffie_hellman(&PublicKey::from_bytes(client_hs.public_key));
        let keys = SessionKeys::derive(&shared, SESSION_INFO)?;

        let server_hs = ServerHandshake {
            public_key: server_public.to_bytes(),
            timestamp: unix_now(),
        };
        debug_assert_eq!(server_hs.encode().len(), SERVER_HANDSHAKE_SIZE);
        stream.write_all(&server_hs.encode()).await?;
        stream.flush().await?;

        info!(user = %user.email, "handshake completed");

        Ok(HandshakePhase::Session {
            leftover: prelude[CLIENT_HANDSHAKE_SIZE..].to_vec(),
            keys,
            user_policy: user.policy.clone(),
        })
    }

    async fn run_session<S>(
        &self,
        stream: PeekedStream<S>,
        keys: SessionKeys,
        user_policy: &str,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let mut encoder = FrameEncoder::new(&keys.aead_key());
        let mut decoder = FrameDecoder::new(&keys.aead_key());

        let (mut client_reader, mut client_writer) = tokio::io::split(stream);

        // First frame carries the request header.
        let first = decoder.read(&mut client_reader).await?;
        if first.frame_type != FrameType::Data {
            return Err(Error::request("expected data frame"));
        }
        let (request, header_len) = RequestHeader::decode(&first.payload)?;
        debug!(destination = %request.destination, command = ?request.command, "session request");

        let mut link = self.dispatcher.dispatch(&request.destination).await?;

        // Bytes that rode along in the first frame are the start of the
        // upstream data.
        if first.payload.len() > header_len {
            link.writer.write_all(&first.payload[header_len..]).await?;
        }

        let morphing = MorphingConfig::from_policy(self.morphing_enabled, user_policy);

        // Either direction finishing cancels the other at its next await.
        let result = tokio::select! {
            upstream = frames_to_sink(&mut decoder, &mut client_reader, &mut link.writer) => upstream,
            downstream = source_to_frames(&mut encoder, &mut link.reader, &mut client_writer, &morphing) => downstream,
        };

        match result {
            Ok(()) => Ok(()),
            // A peer dropping the connection is a normal end of session.
            Err(Error::Network(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn run_fallback<S>(&self, stream: S, prelude: Vec<u8>) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let sniff = classify(&prelude);
        debug!(protocol = ?sniff.protocol, name = %sniff.name, alpn = %sniff.alpn,
            path = %sniff.path, "fallback classification");

        let Some(entry) = self.fallbacks.lookup(&sniff.name, &sniff.alpn, &sniff.path) else {
            warn!("no fallback configured, closing connection");
            return Err(Error::NoFallback);
        };

        forward(stream, &prelude, &entry.dest).await
    }
}

enum HandshakePhase {
    Session {
        leftover: Vec<u8>,
        keys: SessionKeys,
        user_policy: String,
    },
    Fallback {
        prelude: Vec<u8>,
    },
}

/// Read the opening bytes of a connection: a single read of up to 1 KiB.
///
/// Enough to classify the protocol; the Reflex path tops the buffer up to
/// the full handshake afterwards. An immediately closed connection yields
/// an empty prelude, which classifies as unknown.
async fn read_prelude<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; PEEK_SIZE];
    let mut filled = 0;

    // Loop only while we cannot yet tell magic from non-magic.
    while filled < 4 {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    buf.truncate(filled);
    Ok(buf)
}
