//! # Machine Enumeration
//!
//! Stage 2 of a pass. Each container is queried on its own and the results are
//! appended in container order.

use std::collections::HashSet;

use adshard_common::config::{DuplicatePolicy, SearchScope};
use adshard_common::directory::{ComputerEntry, DirectoryService};
use tracing::{info, warn};

use crate::error::ShardError;

pub async fn enumerate(
    directory: &dyn DirectoryService,
    containers: &[String],
    scope: SearchScope,
    policy: DuplicatePolicy,
) -> Result<Vec<ComputerEntry>, ShardError> {
    let mut machines: Vec<ComputerEntry> = Vec::new();

    for container in containers {
        let found = directory
            .find_computers(container, scope)
            .await
            .map_err(|source| ShardError::Enumeration {
                container: container.clone(),
                source,
            })?;

        info!("Found {} computers under {container}", found.len());
        machines.extend(found);
    }

    Ok(apply_policy(machines, policy))
}

fn apply_policy(machines: Vec<ComputerEntry>, policy: DuplicatePolicy) -> Vec<ComputerEntry> {
    match policy {
        DuplicatePolicy::Keep => machines,
        DuplicatePolicy::FirstByName => {
            let mut seen: HashSet<String> = HashSet::new();
            machines
                .into_iter()
                .filter(|machine| {
                    let first = seen.insert(machine.name.to_ascii_lowercase());
                    if !first {
                        warn!("Skipping duplicate computer {} ({})", machine.name, machine.sid);
                    }
                    first
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;
    use adshard_common::directory::DirectoryError;

    const EAST: &str = "OU=East,DC=corp,DC=local";
    const WEST: &str = "OU=West,DC=corp,DC=local";

    fn containers() -> Vec<String> {
        vec![EAST.to_string(), WEST.to_string()]
    }

    fn names(machines: &[ComputerEntry]) -> Vec<&str> {
        machines.iter().map(|m| m.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_containers_are_concatenated_in_order() {
        let dir = InMemoryDirectory::new();
        dir.add_computer(WEST, "W1");
        dir.add_computer(EAST, "E1");
        dir.add_computer(EAST, "E2");

        let machines = enumerate(&dir, &containers(), SearchScope::OneLevel, DuplicatePolicy::Keep)
            .await
            .unwrap();

        assert_eq!(names(&machines), vec!["E1", "E2", "W1"]);
    }

    #[tokio::test]
    async fn test_duplicates_pass_through_by_default() {
        let dir = InMemoryDirectory::new();
        let east = dir.add_computer(EAST, "DUP");
        let west = dir.add_computer(WEST, "DUP");

        let machines = enumerate(&dir, &containers(), SearchScope::OneLevel, DuplicatePolicy::Keep)
            .await
            .unwrap();

        assert_eq!(names(&machines), vec!["DUP", "DUP"]);
        assert_eq!(machines[0].sid, east);
        assert_eq!(machines[1].sid, west);
    }

    #[tokio::test]
    async fn test_first_by_name_drops_later_duplicates() {
        let dir = InMemoryDirectory::new();
        let east = dir.add_computer(EAST, "DUP");
        dir.add_computer(WEST, "dup");
        dir.add_computer(WEST, "W1");

        let machines = enumerate(&dir, &containers(), SearchScope::OneLevel, DuplicatePolicy::FirstByName)
            .await
            .unwrap();

        assert_eq!(names(&machines), vec!["DUP", "W1"]);
        assert_eq!(machines[0].sid, east);
    }

    #[tokio::test]
    async fn test_subtree_scope_includes_nested_containers() {
        let dir = InMemoryDirectory::new();
        dir.add_computer(EAST, "E1");
        dir.add_computer(&format!("OU=Lab,{EAST}"), "LAB1");

        let shallow = enumerate(&dir, &[EAST.to_string()], SearchScope::OneLevel, DuplicatePolicy::Keep)
            .await
            .unwrap();
        let deep = enumerate(&dir, &[EAST.to_string()], SearchScope::Subtree, DuplicatePolicy::Keep)
            .await
            .unwrap();

        assert_eq!(names(&shallow), vec!["E1"]);
        assert_eq!(names(&deep), vec!["E1", "LAB1"]);
    }

    #[tokio::test]
    async fn test_missing_container_is_fatal() {
        let dir = InMemoryDirectory::new();
        dir.add_computer(EAST, "E1");

        let err = enumerate(&dir, &containers(), SearchScope::OneLevel, DuplicatePolicy::Keep)
            .await
            .unwrap_err();

        match err {
            ShardError::Enumeration { container, source } => {
                assert_eq!(container, WEST);
                assert!(matches!(source, DirectoryError::ContainerNotFound(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
