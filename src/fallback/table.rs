//! Fallback routing table.
//!
//! Entries are keyed on `(name, alpn, path)` where an empty string at any
//! level means "any". Lookup is a longest-match cascade: exact `name` before
//! the wildcard, then exact `alpn`, then exact `path`, left to right; the
//! first populated entry wins.

use std::collections::HashMap;

/// One configured fallback destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackEntry {
    /// SNI or Host to match; "" matches any
    pub name: String,
    /// ALPN to match; "" matches any
    pub alpn: String,
    /// HTTP path to match; "" matches any
    pub path: String,
    /// Destination: "host:port", or a bare port meaning 127.0.0.1
    pub dest: String,
    /// PROXY-protocol version to speak to the destination; 0 = off
    pub xver: u64,
}

/// Three-level nested map over fallback entries. Built once at startup,
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct FallbackTable {
    entries: HashMap<String, HashMap<String, HashMap<String, FallbackEntry>>>,
}

impl FallbackTable {
    /// Build a table from configured entries. Later duplicates of the same
    /// `(name, alpn, path)` key replace earlier ones.
    pub fn new(entries: impl IntoIterator<Item = FallbackEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            table
                .entries
                .entry(entry.name.clone())
                .or_default()
                .entry(entry.alpn.clone())
                .or_default()
                .insert(entry.path.clone(), entry);
        }
        table
    }

    /// Whether any entries are configured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the most specific entry for `(name, alpn, path)`.
    ///
    /// Tries exact `name` then `""`; within each, exact `alpn` then `""`;
    /// within each, exact `path` then `""`.
    pub fn find(&self, name: &str, alpn: &str, path: &str) -> Option<&FallbackEntry> {
        for name_key in [name, ""] {
            let Some(by_alpn) = self.entries.get(name_key) else {
                continue;
            };
            for alpn_key in [alpn, ""] {
                let Some(by_path) = by_alpn.get(alpn_key) else {
                    continue;
                };
                for path_key in [path, ""] {
                    if let Some(entry) = by_path.get(path_key) {
                        return Some(entry);
                    }
                }
            }
        }
        None
    }

    /// [`find`](Self::find), retrying the all-wildcard entry as a last
    /// resort.
    pub fn lookup(&self, name: &str, alpn: &str, path: &str) -> Option<&FallbackEntry> {
        self.find(name, alpn, path).or_else(|| self.find("", "", ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, alpn: &str, path: &str, dest: &str) -> FallbackEntry {
        FallbackEntry {
            name: name.into(),
            alpn: alpn.into(),
            path: path.into(),
            dest: dest.into(),
            xver: 0,
        }
    }

    fn sample_table() -> FallbackTable {
        FallbackTable::new([
            entry("", "", "", "80"),
            entry("", "h2", "", "8443"),
            entry("example.com", "", "", "8080"),
            entry("example.com", "h2", "", "8081"),
            entry("example.com", "h2", "/ws", "8082"),
            entry("", "", "/admin", "9000"),
        ])
    }

    #[test]
    fn test_exact_match_wins() {
        let table = sample_table();
        assert_eq!(table.find("example.com", "h2", "/ws").unwrap().dest, "8082");
    }

    #[test]
    fn test_path_falls_back_to_wildcard() {
        let table = sample_table();
        assert_eq!(table.find("example.com", "h2", "/other").unwrap().dest, "8081");
    }

    #[test]
    fn test_alpn_falls_back_to_wildcard() {
        let table = sample_table();
        assert_eq!(
            table.find("example.com", "http/1.1", "/x").unwrap().dest,
            "8080"
        );
    }

    #[test]
    fn test_name_falls_back_to_wildcard() {
        let table = sample_table();
        assert_eq!(table.find("other.com", "h2", "/x").unwrap().dest, "8443");
        assert_eq!(table.find("other.com", "http/1.1", "/x").unwrap().dest, "80");
    }

    #[test]
    fn test_specificity_prefers_name_over_alpn_and_path() {
        // Left-to-right preference: a name match with wildcard alpn beats
        // a wildcard name with exact alpn.
        let table = sample_table();
        assert_eq!(table.find("example.com", "h2", "/admin").unwrap().dest, "8081");

        // Wildcard-name path entry still reachable for other names.
        assert_eq!(table.find("other.com", "", "/admin").unwrap().dest, "9000");
    }

    #[test]
    fn test_no_match() {
        let table = FallbackTable::new([entry("only.example.com", "h2", "/x", "1000")]);
        assert!(table.find("nope.com", "http/1.1", "/").is_none());
        assert!(table.lookup("nope.com", "http/1.1", "/").is_none());
    }

    #[test]
    fn test_lookup_last_resort() {
        let table = sample_table();
        // Unknown-protocol connections present all-empty keys.
        assert_eq!(table.lookup("", "", "").unwrap().dest, "80");
    }

    #[test]
    fn test_empty_table() {
        let table = FallbackTable::new([]);
        assert!(table.is_empty());
        assert!(table.lookup("a", "b", "c").is_none());
    }

    #[test]
    fn test_duplicate_key_replaced() {
        let table = FallbackTable::new([
            entry("", "", "", "80"),
            entry("", "", "", "81"),
        ]);
        assert_eq!(table.find("", "", "").unwrap().dest, "81");
    }
}
