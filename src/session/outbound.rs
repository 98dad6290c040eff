//! Outbound session orchestrator.
//!
//! Mirrors the inbound machine from the client's side: send the 76-byte
//! client handshake, read the 40-byte server response, derive the session
//! key, send the request header as the first DATA frame, then relay the
//! local byte stream through the tunnel in both directions.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::debug;

use crate::codec::{
    unix_now, ClientHandshake, Frame, FrameDecoder, FrameEncoder, ServerHandshake,
    SERVER_HANDSHAKE_SIZE,
};
use crate::crypto::{EphemeralSecret, PublicKey, SecureRandom, SessionKeys, SESSION_INFO};
use crate::error::{Error, Result};
use crate::morphing::MorphingConfig;
use crate::session::relay::{frames_to_sink, source_to_frames};
use crate::session::request::{Command, Destination, RequestHeader};
use crate::validator::User;

/// Outbound connection handler for one user account.
pub struct Outbound {
    user_id: [u8; 16],
    policy: String,
    handshake_timeout: Duration,
    morphing_enabled: bool,
}

impl Outbound {
    /// Create a handler sending as the given user.
    pub fn new(user: &User) -> Self {
        Self {
            user_id: user.id,
            policy: user.policy.clone(),
            handshake_timeout: Duration::from_millis(crate::HANDSHAKE_TIMEOUT_MS),
            morphing_enabled: true,
        }
    }

    /// Override the handshake deadline.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Enable or disable traffic morphing on the request path.
    pub fn with_morphing(mut self, enabled: bool) -> Self {
        self.morphing_enabled = enabled;
        self
    }

    /// Tunnel `local` to `destination` through the Reflex server reached
    /// over `server`.
    ///
    /// Returns when either direction ends; the other direction is cancelled
    /// at its next await point.
    pub async fn run<S, L>(
        &self,
        mut server: S,
        command: Command,
        destination: &Destination,
        local: L,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Send + Unpin,
        L: AsyncRead + AsyncWrite + Send + Unpin,
    {
        let deadline = self.handshake_timeout;
        let keys = timeout(deadline, self.run_handshake(&mut server))
            .await
            .map_err(|_| Error::Timeout(deadline.as_millis() as u64))??;

        let mut encoder = FrameEncoder::new(&keys.aead_key());
        let mut decoder = FrameDecoder::new(&keys.aead_key());

        // Request header travels as the first DATA frame.
        let request = RequestHeader {
            command,
            destination: destination.clone(),
        };
        encoder.write(&mut server, &Frame::data(request.encode())).await?;
        debug!(destination = %destination, "request sent");

        let (mut server_reader, mut server_writer) = tokio::io::split(server);
        let (mut local_reader, mut local_writer) = tokio::io::split(local);
        let morphing = MorphingConfig::from_policy(self.morphing_enabled, &self.policy);

        let result = tokio::select! {
            upstream = source_to_frames(&mut encoder, &mut local_reader, &mut server_writer, &morphing) => upstream,
            downstream = frames_to_sink(&mut decoder, &mut server_reader, &mut local_writer) => downstream,
        };

        match result {
            Ok(()) => Ok(()),
            Err(Error::Network(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn run_handshake<S>(&self, server: &mut S) -> Result<SessionKeys>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let secret = EphemeralSecret::random();
        let client_hs = ClientHandshake {
            public_key: PublicKey::from(&secret).to_bytes(),
            user_id: self.user_id,
            timestamp: unix_now(),
            nonce: SecureRandom::bytes(),
        };
        server.write_all(&client_hs.encode()).await?;
        server.flush().await?;

        let mut response = [0u8; SERVER_HANDSHAKE_SIZE];
        server.read_exact(&mut response).await?;
        let server_hs = ServerHandshake::decode(&response)?;

        let shared = secret.diffie_hellman(&PublicKey::from_bytes(server_hs.public_key));
        SessionKeys::derive(&shared, SESSION_INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::fallback::FallbackTable;
    use crate::session::test_support::EchoDispatcher;
    use crate::session::Inbound;
    use crate::validator::Validator;

    fn test_user() -> User {
        User::new(
            "b831381d-6324-4d53-ad4f-8cda48b30811",
            "alice@example.com",
            "",
            0,
        )
        .unwrap()
    }

    fn inbound_with_echo() -> Inbound {
        let validator = Arc::new(Validator::new());
        validator.add(test_user());
        Inbound::new(validator, FallbackTable::new([]), Arc::new(EchoDispatcher))
    }

    async fn end_to_end(client_morphing: bool, server_morphing: bool, payload: &[u8]) -> Vec<u8> {
        let inbound = inbound_with_echo().with_morphing(server_morphing);

        let (client_side, server_side) = tokio::io::duplex(64 * 1024);
        let server_task = tokio::spawn(async move { inbound.handle(server_side).await });

        let (mut app, local) = tokio::io::duplex(64 * 1024);
        let mut user = test_user();
        user.policy = "zoom".into();
        let outbound = Outbound::new(&user).with_morphing(client_morphing);

        let destination = Destination::domain("echo.example.com", 7);
        let client_task = tokio::spawn(async move {
            outbound
                .run(client_side, Command::Tcp, &destination, local)
                .await
        });

        app.write_all(payload).await.unwrap();

        let mut echoed = vec![0u8; payload.len()];
        app.read_exact(&mut echoed).await.unwrap();

        // Closing the application side winds the whole session down.
        app.shutdown().await.unwrap();
        drop(app);
        client_task.await.unwrap().unwrap();
        server_task.await.unwrap().unwrap();

        echoed
    }

    #[tokio::test]
    async fn test_end_to_end_roundtrip() {
        let payload: Vec<u8> = (0..2048u32).map(|i| (i % 256) as u8).collect();
        let echoed = end_to_end(false, false, &payload).await;
        assert_eq!(echoed, payload);
    }

    #[tokio::test]
    async fn test_end_to_end_with_morphing_both_sides() {
        let payload: Vec<u8> = (0..2048u32).map(|i| (i * 3 % 256) as u8).collect();
        let echoed = end_to_end(true, true, &payload).await;
        assert_eq!(echoed, payload);
    }

    #[tokio::test]
    async fn test_morphing_toggle_is_transparent() {
        let payload = b"the same bytes either way".to_vec();
        let plain = end_to_end(false, false, &payload).await;
        let morphed = end_to_end(true, true, &payload).await;
        assert_eq!(plain, morphed);
    }

    #[tokio::test]
    async fn test_outbound_handshake_timeout() {
        let user = test_user();
        let outbound = Outbound::new(&user).with_handshake_timeout(Duration::from_millis(50));

        // A server that never answers.
        let (client_side, _server_side) = tokio::io::duplex(4096);
        let (_app, local) = tokio::io::duplex(4096);

        let err = outbound
            .run(
                client_side,
                Command::Tcp,
                &Destination::domain("x.example.com", 80),
                local,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_outbound_rejects_short_server_handshake() {
        let user = test_user();
        let outbound = Outbound::new(&user);

        let (client_side, mut server_side) = tokio::io::duplex(4096);
        let (_app, local) = tokio::io::duplex(4096);

        let server = tokio::spawn(async move {
            let mut hs = [0u8; 76];
            server_side.read_exact(&mut hs).await.unwrap();
            // Answer with garbage shorter than a server handshake, then close.
            server_side.write_all(&[0x00; 10]).await.unwrap();
            server_side.shutdown().await.unwrap();
            drop(server_side);
        });

        let err = outbound
            .run(
                client_side,
                Command::Tcp,
                &Destination::domain("x.example.com", 80),
                local,
            )
            .await
            .unwrap_err();
        // read_exact on a closed stream surfaces as an I/O error.
        assert!(matches!(err, Error::Network(_)));
        server.await.unwrap();
    }
}
