//! Protocol classification over peeked bytes.
//!
//! Classifies a connection's prelude as Reflex, HTTP/1.x, TLS or unknown
//! without consuming it, and extracts the routing metadata the fallback
//! table keys on. All parsers here are best-effort: malformed input yields
//! empty metadata, never an error, because the connection still has to be
//! routed somewhere.

use crate::codec::REFLEX_MAGIC;

/// HTTP method prefixes, four bytes each, enough to recognise every
/// HTTP/1.x request line.
const HTTP_METHODS: [&[u8; 4]; 9] = [
    b"GET ", b"POST", b"PUT ", b"HEAD", b"DELE", b"OPTI", b"PATC", b"TRAC", b"CONN",
];

/// Protocol detected in a connection prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// A Reflex handshake; the session orchestrator handles it
    Reflex,
    /// An HTTP/1.x request
    Http,
    /// A TLS record, byte 0 = 0x16
    Tls,
    /// Anything else
    Unknown,
}

/// Classification result: protocol plus the fallback routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SniffResult {
    /// Detected protocol
    pub protocol: Protocol,
    /// SNI hostname (TLS) or Host header (HTTP); empty when absent
    pub name: String,
    /// Negotiated protocol: parsed ALPN, or "tls" / "http/1.1" defaults
    pub alpn: String,
    /// Request-line path (HTTP only)
    pub path: String,
}

impl SniffResult {
    fn unknown() -> Self {
        Self {
            protocol: Protocol::Unknown,
            name: String::new(),
            alpn: String::new(),
            path: String::new(),
        }
    }
}

/// Classify a peeked prelude and extract routing metadata.
pub fn classify(peeked: &[u8]) -> SniffResult {
    if peeked.len() >= 4 {
        let magic = u32::from_be_bytes([peeked[0], peeked[1], peeked[2], peeked[3]]);
        if magic == REFLEX_MAGIC {
            return SniffResult {
                protocol: Protocol::Reflex,
                name: String::new(),
                alpn: String::new(),
                path: String::new(),
            };
        }
    }

    if is_tls_client_hello(peeked) {
        let alpn = match extract_alpn(peeked) {
            Some(alpn) => alpn,
            None => "tls".to_string(),
        };
        return SniffResult {
            protocol: Protocol::Tls,
            name: extract_sni(peeked).unwrap_or_default(),
            alpn,
            path: String::new(),
        };
    }

    if is_http_request(peeked) {
        return SniffResult {
            protocol: Protocol::Http,
            name: extract_http_host(peeked).unwrap_or_default(),
            alpn: "http/1.1".to_string(),
            path: extract_http_path(peeked),
        };
    }

    SniffResult::unknown()
}

/// Check whether the data opens with an HTTP/1.x method token.
pub fn is_http_request(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    HTTP_METHODS.iter().any(|method| data.starts_with(*method))
}

/// Check whether the data looks like a TLS handshake record.
///
/// Byte 0 must be the handshake content type (0x16) and the record version
/// major byte at least 0x03 (TLS 1.0+).
pub fn is_tls_client_hello(data: &[u8]) -> bool {
    data.len() >= 5 && data[0] == 0x16 && data[1] >= 0x03
}

/// Extract the Host header from an HTTP request, case-insensitively.
pub fn extract_http_host(data: &[u8]) -> Option<String> {
    for line in data.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.len() > 5 && line[..5].eq_ignore_ascii_case(b"host:") {
            let host = String::from_utf8_lossy(&line[5..]).trim().to_string();
            if !host.is_empty() {
                return Some(host);
            }
        }
    }
    None
}

/// Extract the path from an HTTP request line ("METHOD /path HTTP/1.1").
pub fn extract_http_path(data: &[u8]) -> String {
    let line_end = data
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(data.len());
    let mut parts = data[..line_end].split(|&b| b == b' ');
    let _method = parts.next();
    match parts.next() {
        Some(path) if !path.is_empty() => String::from_utf8_lossy(path).to_string(),
        _ => "/".to_string(),
    }
}

/// Walk a ClientHello to the start of its extensions block.
///
/// Skips the record header (5), handshake header (4), legacy version (2),
/// random (32), then the variable session-id, cipher-suites and
/// compression-methods vectors. Returns (offset, end-of-extensions).
fn extensions_range(data: &[u8]) -> Option<(usize, usize)> {
    let mut pos = 43;

    let session_id_len = *data.get(pos)? as usize;
    pos += 1 + session_id_len;

    let cipher_suites_len =
        u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
    pos += 2 + cipher_suites_len;

    let compression_len = *data.get(pos)? as usize;
    pos += 1 + compression_len;

    let extensions_len = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
    pos += 2;

    Some((pos, pos + extensions_len))
}

/// Find a ClientHello extension by type; returns its body.
fn find_extension(data: &[u8], wanted: u16) -> Option<&[u8]> {
    let (mut pos, end) = extensions_range(data)?;

    while pos + 4 <= end && pos + 4 <= data.len() {
        let ext_type = u16::from_be_bytes([data[pos], data[pos + 1]]);
        let ext_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if pos + ext_len > data.len() {
            return None;
        }
        if ext_type == wanted {
            return Some(&data[pos..pos + ext_len]);
        }
        pos += ext_len;
    }

    None
}

/// Extract the SNI hostname from a TLS ClientHello (extension type 0).
pub fn extract_sni(data: &[u8]) -> Option<String> {
    let body = find_extension(data, 0)?;

    // server_name_list length (2), then entry type (1, 0x00 = host_name),
    // name length (2), name bytes.
    if body.len() < 5 || body[2] != 0x00 {
        return None;
    }
    let name_len = u16::from_be_bytes([body[3], body[4]]) as usize;
    let name = body.get(5..5 + name_len)?;

    Some(String::from_utf8_lossy(name).to_string())
}

/// Extract the first ALPN protocol from a TLS ClientHello (extension
/// type 16).
pub fn extract_alpn(data: &[u8]) -> Option<String> {
    let body = find_extension(data, 16)?;

    // protocol_name_list length (2), then entries of (len(1), name).
    if body.len() < 3 {
        return None;
    }
    let first_len = body[2] as usize;
    let name = body.get(3..3 + first_len)?;
    if name.is_empty() {
        return None;
    }

    Some(String::from_utf8_lossy(name).to_string())
}
