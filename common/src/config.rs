//! Pass configuration.
//!
//! Built once by the CLI from its arguments and validated before the directory
//! is contacted. Everything downstream takes a `&Config`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported hash algorithm '{0}' (expected SHA256, SHA384 or SHA512)")]
    UnsupportedAlgorithm(String),
    #[error("group prefix must not be empty")]
    EmptyPrefix,
    #[error("at least one machine container is required")]
    NoMachineContainer,
    #[error("container location must not be empty")]
    EmptyContainer,
}

/// Digest used to shard machine names across groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    /// Accepts `SHA256`, `sha-256`, `Sha384`, ... Anything outside the SHA-2
    /// family is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_uppercase();

        match normalized.as_str() {
            "SHA256" => Ok(HashAlgorithm::Sha256),
            "SHA384" => Ok(HashAlgorithm::Sha384),
            "SHA512" => Ok(HashAlgorithm::Sha512),
            _ => Err(ConfigError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha384 => "SHA384",
            HashAlgorithm::Sha512 => "SHA512",
        };
        f.write_str(name)
    }
}

/// Search depth below a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchScope {
    /// Immediate children only.
    #[default]
    OneLevel,
    /// The whole subtree.
    Subtree,
}

impl SearchScope {
    pub fn from_recursive(recursive: bool) -> Self {
        if recursive { SearchScope::Subtree } else { SearchScope::OneLevel }
    }
}

/// What to do with machines that show up under more than one container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Pass every entry through, duplicates included.
    #[default]
    Keep,
    /// Keep the first entry seen for each name and drop the rest.
    FirstByName,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub machine_containers: Vec<String>,
    pub group_container: String,
    /// Groups are named `prefix + <hex digit>`.
    pub group_prefix: String,
    pub scope: SearchScope,
    pub algorithm: HashAlgorithm,
    pub duplicates: DuplicatePolicy,
    /// Compute assignments and report missing memberships without writing.
    pub dry_run: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.machine_containers.is_empty() {
            return Err(ConfigError::NoMachineContainer);
        }
        let mut containers = self.machine_containers.iter().chain([&self.group_container]);
        if containers.any(|c| c.trim().is_empty()) {
            return Err(ConfigError::EmptyContainer);
        }
        Ok(())
    }
}
