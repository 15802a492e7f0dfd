use sha2::{Digest, Sha256};

/// SHA-256 content hashing for embedding inputs. The engine never embeds
/// text itself; collaborators use this to derive the `input_hash` they hand
/// to `upsert_embedding` and to decide when re-embedding is due.
pub struct ContentHasher;

impl ContentHasher {
    pub fn hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex_encode(&hasher.finalize())
    }

    pub fn needs_reembed(old_hash: Option<&str>, new_content: &str) -> bool {
        let new_hash = Self::hash(new_content);
        match old_hash {
            Some(old) => old != new_hash,
            None => true,
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Collision-resistant id for detection runs and generated records: hash of
/// time, process, thread, and a process-local counter.
pub fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tid = std::thread::current().id();
    let input = format!("{}-{}-{:?}-{}", now, std::process::id(), tid, seq);
    let hash = blake3::hash(input.as_bytes());
    hash.to_hex()[..20].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(ContentHasher::hash("hello"), ContentHasher::hash("hello"));
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        let h = ContentHasher::hash("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_needs_reembed_none() {
        assert!(ContentHasher::needs_reembed(None, "content"));
    }

    #[test]
    fn test_needs_reembed_same() {
        let hash = ContentHasher::hash("content");
        assert!(!ContentHasher::needs_reembed(Some(&hash), "content"));
    }

    #[test]
    fn test_needs_reembed_different() {
        let hash = ContentHasher::hash("old");
        assert!(ContentHasher::needs_reembed(Some(&hash), "new"));
    }

    #[test]
    fn test_generate_id_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 20);
    }
}
