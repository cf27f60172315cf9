use sha2::{Digest, Sha256};
use std::path::Path;

/// Lowercase hex SHA-256 of `content`.
pub fn sha256_hex(content: impl AsRef<[u8]>) -> String {
    let digest = Sha256::digest(content.as_ref());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Identity of a feature within a codebase: `sha256(feature + ":" + codebase_path)`.
pub fn feature_hash(feature: &str, codebase_path: &Path) -> String {
    sha256_hex(format!("{}:{}", feature, codebase_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_feature_hash_matches_joined_input() {
        let path = Path::new("/srv/shop");
        assert_eq!(feature_hash("checkout", path), sha256_hex("checkout:/srv/shop"));
        assert_ne!(
            feature_hash("checkout", path),
            feature_hash("checkout", Path::new("/srv/other"))
        );
    }
}
