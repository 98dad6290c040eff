//! Session orchestration.
//!
//! Ties the codecs, validator, morphing engine and fallback demultiplexer
//! into the per-connection state machines: the inbound side accepts a raw
//! connection and relays it to a dispatched link, the outbound side turns a
//! local byte stream into a Reflex session against a remote server.
//!
//! The host platform's routing layer sits behind the [`Dispatcher`] seam.
//! [`DirectDispatcher`] is the in-crate implementation that simply dials
//! the target over TCP.

mod inbound;
mod outbound;
mod peeked;
mod relay;
mod request;

pub use inbound::{Inbound, InboundOutcome};
pub use outbound::Outbound;
pub use peeked::PeekedStream;
pub use relay::{frames_to_sink, source_to_frames};
pub use request::{Address, Command, Destination, RequestHeader};

use std::future::Future;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::Result;

/// A logical link to a proxied target: one reader, one writer.
pub struct Link {
    /// Bytes flowing back from the target
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Bytes flowing toward the target
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
}

impl Link {
    /// Build a link from a connected stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }
}

/// Boxed future returned by [`Dispatcher::dispatch`].
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = Result<Link>> + Send + 'a>>;

/// The platform seam: opens a logical link to a target once the request
/// header has been parsed.
pub trait Dispatcher: Send + Sync {
    /// Open a link to `destination`.
    fn dispatch<'a>(&'a self, destination: &'a Destination) -> DispatchFuture<'a>;
}

/// Dispatcher that dials targets directly over TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectDispatcher;

impl Dispatcher for DirectDispatcher {
    fn dispatch<'a>(&'a self, destination: &'a Destination) -> DispatchFuture<'a> {
        Box::pin(async move {
            let stream = TcpStream::connect(destination.to_string()).await?;
            stream.set_nodelay(true)?;
            Ok(Link::from_stream(stream))
        })
    }
}
