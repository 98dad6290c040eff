//! Fallback forwarding.
//!
//! Connects to the chosen back-end and splices the client connection to it.
//! The bytes already peeked off the client must reach the back-end before
//! anything read from the raw socket, so the caller hands them in
//! explicitly.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Result};

/// Resolve a configured destination string to a dialable address.
///
/// A bare port number becomes `127.0.0.1:<port>`; anything else is used
/// verbatim.
pub fn resolve_dest(dest: &str) -> String {
    if dest.parse::<u16>().is_ok() {
        format!("127.0.0.1:{dest}")
    } else {
        dest.to_string()
    }
}

/// Splice a client connection to a fallback destination.
///
/// `peeked` is delivered to the back-end first, then both directions copy
/// until either returns EOF or fails.
pub async fn forward<S>(client: S, peeked: &[u8], dest: &str) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let addr = resolve_dest(dest);
    let mut backend = TcpStream::connect(&addr)
        .await
        .map_err(Error::FallbackConnect)?;

    backend.write_all(peeked).await?;

    let mut client = client;
    let (tx, rx) = tokio::io::copy_bidirectional(&mut client, &mut backend).await?;
    debug!(dest = %addr, to_backend = tx, to_client = rx, "fallback connection finished");

    Ok(())
}
