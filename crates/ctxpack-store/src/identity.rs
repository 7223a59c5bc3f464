//! Deterministic chunk identity and hashing

use sha2::{Digest, Sha256};
use uuid::{Uuid, uuid};

/// Namespace UUID for ctxpack chunk IDs (randomly generated once)
/// Ensures our UUIDs don't collide with other systems
const CTXPACK_NAMESPACE: Uuid = uuid!("6c1f2a84-3d9b-4e57-8a20-f4b1c6d0937e");

/// Content hash over the identity of a chunk
///
/// `sha256(filepath + ':' + line_start + ':' + line_end + ':' +
/// contextualized_text)`, lowercase hex. Stable across re-indexes of
/// unchanged content.
pub fn chunk_hash(
    filepath: &str,
    line_start: i32,
    line_end: i32,
    contextualized_text: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(filepath.as_bytes());
    hasher.update(b":");
    hasher.update(line_start.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(line_end.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(contextualized_text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generate a deterministic chunk ID
///
/// Stable for a given (resource, filepath, line range, hash) combination, so
/// re-indexing unchanged content keeps the same IDs. Returns a UUID v5.
pub fn chunk_id(resource_id: &Uuid, filepath: &str, line_start: i32, line_end: i32, hash: &str) -> Uuid {
    let data = format!("{resource_id}:{filepath}:{line_start}:{line_end}:{hash}");
    Uuid::new_v5(&CTXPACK_NAMESPACE, data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_hash_deterministic() {
        let h1 = chunk_hash("src/main.rs", 1, 10, "// src/main.rs\nfn main() {}");
        let h2 = chunk_hash("src/main.rs", 1, 10, "// src/main.rs\nfn main() {}");
        assert_eq!(h1, h2, "Same inputs should produce same hash");
        assert_eq!(h1.len(), 64, "sha256 hex is 64 chars");
    }

    #[test]
    fn test_chunk_hash_varies_with_range() {
        let h1 = chunk_hash("src/main.rs", 1, 10, "text");
        let h2 = chunk_hash("src/main.rs", 2, 10, "text");
        assert_ne!(h1, h2, "Different line range should change hash");
    }

    #[test]
    fn test_chunk_id_deterministic() {
        let resource = Uuid::nil();
        let hash = chunk_hash("src/lib.rs", 5, 20, "body");
        let id1 = chunk_id(&resource, "src/lib.rs", 5, 20, &hash);
        let id2 = chunk_id(&resource, "src/lib.rs", 5, 20, &hash);
        assert_eq!(id1, id2, "Same inputs should produce same chunk ID");
        assert_eq!(id1.get_version(), Some(uuid::Version::Sha1));
    }

    #[test]
    fn test_chunk_id_unique_per_resource() {
        let hash = chunk_hash("src/lib.rs", 5, 20, "body");
        let id1 = chunk_id(&Uuid::nil(), "src/lib.rs", 5, 20, &hash);
        let id2 = chunk_id(&Uuid::new_v4(), "src/lib.rs", 5, 20, &hash);
        assert_ne!(id1, id2, "Different resource should produce different ID");
    }
}
