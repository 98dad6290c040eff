//! Fallback demultiplexer.
//!
//! Connections whose opening bytes are not a Reflex handshake (and
//! connections presenting an unknown user ID) are handed to a configured
//! HTTP/TLS back-end so that an active probe sees only a benign web
//! endpoint. The demultiplexer classifies the peeked prelude, extracts
//! routing metadata (SNI/ALPN for TLS, Host/Path for HTTP), picks the most
//! specific fallback entry and splices the connection to it.

mod forward;
mod sniff;
mod table;

pub use forward::{forward, resolve_dest};
pub use sniff::{classify, extract_alpn, extract_http_host, extract_http_path, extract_sni,
    is_http_request, is_tls_client_hello, Protocol, SniffResult};
pub use table::{FallbackEntry, FallbackTable};
