//! Name hashing and group assignment.
//!
//! A machine's group is `prefix + last hex digit of digest(name)`, which
//! spreads machines over sixteen groups without keeping an assignment table.

use adshard_common::config::HashAlgorithm;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Uppercase hex digest of a machine name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameDigest {
    hex: String,
}

impl NameDigest {
    /// Hashes the UTF-8 bytes of `name`.
    pub fn compute(algorithm: HashAlgorithm, name: &str) -> Self {
        let hex: String = match algorithm {
            HashAlgorithm::Sha256 => hex::encode_upper(Sha256::digest(name.as_bytes())),
            HashAlgorithm::Sha384 => hex::encode_upper(Sha384::digest(name.as_bytes())),
            HashAlgorithm::Sha512 => hex::encode_upper(Sha512::digest(name.as_bytes())),
        };
        Self { hex }
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Last hex digit, one of `0-9A-F`.
    pub fn suffix(&self) -> char {
        // SHA-2 output is never empty
        char::from(self.hex.as_bytes()[self.hex.len() - 1])
    }

    pub fn group_for(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.suffix())
    }
}

/// Every group name a prefix can produce, in suffix order.
pub fn all_groups(prefix: &str) -> Vec<String> {
    "0123456789ABCDEF".chars().map(|c| format!("{prefix}{c}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256_digest() {
        let digest = NameDigest::compute(HashAlgorithm::Sha256, "HOST01");
        assert_eq!(
            digest.as_str(),
            "8DC76CC86536A0AECE096ECA7D9995B58C0ED79FAE1B9AFD1EC13F02782DB83C"
        );
        assert_eq!(digest.suffix(), 'C');
        assert_eq!(digest.group_for("WECGroup"), "WECGroupC");
    }

    #[test]
    fn test_digest_lengths() {
        assert_eq!(NameDigest::compute(HashAlgorithm::Sha256, "HOST01").as_str().len(), 64);
        assert_eq!(NameDigest::compute(HashAlgorithm::Sha384, "HOST01").as_str().len(), 96);
        assert_eq!(NameDigest::compute(HashAlgorithm::Sha512, "HOST01").as_str().len(), 128);
    }

    #[test]
    fn test_algorithm_changes_assignment() {
        // SHA-384 of HOST01 ends in B, SHA-512 in E
        assert_eq!(NameDigest::compute(HashAlgorithm::Sha384, "HOST01").suffix(), 'B');
        assert_eq!(NameDigest::compute(HashAlgorithm::Sha512, "HOST01").suffix(), 'E');
    }

    #[test]
    fn test_deterministic_and_hex_suffix() {
        let names = ["HOST01", "HOST02", "WS-0001", "SRV-DB01", "dup", "ünïcødé", "a"];
        for algo in [HashAlgorithm::Sha256, HashAlgorithm::Sha384, HashAlgorithm::Sha512] {
            for name in names {
                let first = NameDigest::compute(algo, name);
                let second = NameDigest::compute(algo, name);
                assert_eq!(first, second);
                assert!(first.as_str().chars().all(|c| matches!(c, '0'..='9' | 'A'..='F')));
                assert!(matches!(first.suffix(), '0'..='9' | 'A'..='F'));
                assert_eq!(first.group_for("G"), format!("G{}", first.suffix()));
            }
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let upper = NameDigest::compute(HashAlgorithm::Sha256, "HOST01");
        let lower = NameDigest::compute(HashAlgorithm::Sha256, "host01");
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_all_groups() {
        let groups = all_groups("WECGroup");
        assert_eq!(groups.len(), 16);
        assert_eq!(groups[0], "WECGroup0");
        assert_eq!(groups[15], "WECGroupF");
    }
}
