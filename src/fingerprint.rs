//! Deterministic URL fingerprinting.
//!
//! The fingerprint is the sole join key across the stage caches, the
//! bookmark record, and the error ledger. It must be stable across runs
//! and processes: SHA-256 over the normalized URL text, hex-encoded.

use sha2::{Digest, Sha256};
use url::Url;

/// Computes the fingerprint for a URL.
///
/// Normalization lowercases the scheme and host and drops a trailing
/// slash-only path, so trivially different spellings of the same address
/// collapse to one fingerprint. Input that does not parse as a URL is
/// hashed as trimmed text — the function is total.
pub fn fingerprint(url: &str) -> String {
    let normalized = normalize(url);
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    match Url::parse(trimmed) {
        // Url::parse already lowercases scheme and host.
        Ok(parsed) => {
            let mut s = parsed.to_string();
            if parsed.path() == "/" && parsed.query().is_none() && parsed.fragment().is_none() {
                s.truncate(s.len() - 1);
            }
            s
        }
        Err(_) => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let a = fingerprint("https://example.com/article");
        let b = fingerprint("https://example.com/article");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn host_case_is_normalized() {
        assert_eq!(
            fingerprint("https://Example.COM/article"),
            fingerprint("https://example.com/article")
        );
    }

    #[test]
    fn trailing_slash_on_bare_host_is_normalized() {
        assert_eq!(
            fingerprint("https://example.com/"),
            fingerprint("https://example.com")
        );
    }

    #[test]
    fn different_urls_differ() {
        assert_ne!(
            fingerprint("https://example.com/a"),
            fingerprint("https://example.com/b")
        );
    }

    #[test]
    fn non_url_text_still_hashes() {
        let fp = fingerprint("not a url at all");
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint("  not a url at all  "));
    }
}
