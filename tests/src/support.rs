use adshard_common::config::{Config, DuplicatePolicy, HashAlgorithm, SearchScope};
use adshard_core::hashing;
use adshard_core::memory::{GroupKind, InMemoryDirectory};

pub const GROUPS: &str = "OU=WEC,OU=Groups,DC=corp,DC=local";
pub const EAST: &str = "OU=East,OU=Computers,DC=corp,DC=local";
pub const WEST: &str = "OU=West,OU=Computers,DC=corp,DC=local";
pub const PREFIX: &str = "WECGroup";

pub fn config(containers: &[&str]) -> Config {
    Config {
        machine_containers: containers.iter().map(|c| c.to_string()).collect(),
        group_container: GROUPS.to_string(),
        group_prefix: PREFIX.to_string(),
        scope: SearchScope::OneLevel,
        algorithm: HashAlgorithm::Sha256,
        duplicates: DuplicatePolicy::Keep,
        dry_run: false,
    }
}

/// A directory holding all sixteen shard groups and nothing else.
pub fn directory() -> InMemoryDirectory {
    let dir = InMemoryDirectory::new();
    for group in hashing::all_groups(PREFIX) {
        dir.add_group(GROUPS, &group, GroupKind::Security);
    }
    dir.add_container(EAST);
    dir.add_container(WEST);
    dir
}
