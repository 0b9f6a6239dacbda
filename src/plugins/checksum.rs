//! Checksum gate for downloaded plugin binaries.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::types::sha1_of_file;

/// Length of a hex SHA-256 digest.
const SHA256_HEX_LEN: usize = 64;

/// Whether the file at `path` has the digest `expected_hex`.
///
/// The digest is SHA-1 unless `expected_hex` is 64 characters long, in which
/// case SHA-256 is used. The comparison is against lowercase hex and is case
/// sensitive. Read errors count as a mismatch.
pub fn matches(path: &Path, expected_hex: &str) -> bool {
    let actual = if expected_hex.len() == SHA256_HEX_LEN {
        sha256_of_file(path)
    } else {
        sha1_of_file(path)
    };

    match actual {
        Ok(digest) => digest == expected_hex,
        Err(_) => false,
    }
}

fn sha256_of_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn file_with(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("binary");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_sha1_matches() {
        let dir = TempDir::new().unwrap();
        let path = file_with(&dir, "foo");
        assert!(matches(&path, "0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33"));
    }

    #[test]
    fn test_other_digest_does_not_match() {
        let dir = TempDir::new().unwrap();
        let path = file_with(&dir, "foo");
        assert!(!matches(&path, "abcdef"));
        assert!(!matches(&path, ""));
        assert!(!matches(&path, "da39a3ee5e6b4b0d3255bfef95601890afd80709"));
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let path = file_with(&dir, "foo");
        assert!(!matches(&path, "0BEEC7B5EA3F0FDBC95D0DD47F3C5BC275DA8A33"));
    }

    #[test]
    fn test_sha256_matches() {
        let dir = TempDir::new().unwrap();
        let path = file_with(&dir, "foo");
        assert!(matches(
            &path,
            "2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae"
        ));
    }

    #[test]
    fn test_missing_file_is_false() {
        let dir = TempDir::new().unwrap();
        assert!(!matches(
            &dir.path().join("nope"),
            "0beec7b5ea3f0fdbc95d0dd47f3c5bc275da8a33"
        ));
    }
}
