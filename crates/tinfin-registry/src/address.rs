use sha2::{Digest, Sha256};

/// Utilities for content-addressable storage using SHA-256 hashing
pub struct ContentAddress;

impl ContentAddress {
    /// Generate SHA-256 hash of content, returns hash with "sha256:" prefix
    pub fn hash(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        let result = hasher.finalize();
        format!("sha256:{:x}", result)
    }

    /// Storage key for payload content
    /// Example: "blobs/sha256/abc123def456..."
    pub fn blob_key(hash: &str) -> String {
        format!("blobs/sha256/{}", Self::extract_hash_value(hash))
    }

    /// Storage key for the reference from a resource name to its digest
    /// Example: "refs/auth-3"
    pub fn ref_key(name: &str) -> String {
        format!("refs/{}", name)
    }

    /// Extract hash value from full hash string (removes "sha256:" prefix)
    pub fn extract_hash_value(hash: &str) -> &str {
        hash.strip_prefix("sha256:").unwrap_or(hash)
    }

    /// Validate that a hash string has the correct format
    pub fn is_valid_hash(hash: &str) -> bool {
        match hash.strip_prefix("sha256:") {
            Some(value) => value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }

    /// Verify content matches expected hash
    pub fn verify(content: &[u8], expected_hash: &str) -> bool {
        Self::hash(content) == expected_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_generation() {
        let hash = ContentAddress::hash(b"hello world");

        assert!(hash.starts_with("sha256:"));
        assert_eq!(hash.len(), 71);
        assert_eq!(hash, ContentAddress::hash(b"hello world"));
        assert_ne!(hash, ContentAddress::hash(b"hello"));
    }

    #[test]
    fn test_keys() {
        assert_eq!(
            ContentAddress::blob_key("sha256:abc123def456789"),
            "blobs/sha256/abc123def456789"
        );
        assert_eq!(ContentAddress::ref_key("auth-3"), "refs/auth-3");
    }

    #[test]
    fn test_hash_validation() {
        let valid_hash = "sha256:".to_string() + &"a".repeat(64);
        assert!(ContentAddress::is_valid_hash(&valid_hash));

        assert!(!ContentAddress::is_valid_hash(&"a".repeat(64)));
        assert!(!ContentAddress::is_valid_hash("sha256:abc123"));
        assert!(!ContentAddress::is_valid_hash(
            &("sha256:".to_string() + &"g".repeat(64))
        ));
    }

    #[test]
    fn test_verify_content() {
        let content = br#"{"name":"auth-3"}"#;
        let hash = ContentAddress::hash(content);

        assert!(ContentAddress::verify(content, &hash));
        assert!(!ContentAddress::verify(b"{}", &hash));
    }

    #[test]
    fn test_real_sha256_values() {
        assert_eq!(
            ContentAddress::hash(b"hello"),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
