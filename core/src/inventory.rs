//! # Group Inventory
//!
//! Stage 1 of a pass. Reads every matching security group once and records its
//! transitive membership. The resulting index is the only membership source
//! the reconciler consults, so all decisions in a pass see the same snapshot.

use std::collections::{BTreeMap, BTreeSet};

use adshard_common::config::SearchScope;
use adshard_common::directory::{DirectoryError, DirectoryService};
use tracing::{debug, info, warn};

/// Group name to member names. Read-only once built.
///
/// Lookups ignore ASCII case on both group and member names, matching how
/// Active Directory compares names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMembershipIndex {
    groups: BTreeMap<String, IndexedGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexedGroup {
    name: String,
    members: BTreeSet<String>,
}

impl GroupMembershipIndex {
    fn insert(&mut self, name: String, members: BTreeSet<String>) {
        let members: BTreeSet<String> = members.iter().map(|m| m.to_ascii_lowercase()).collect();
        self.groups.insert(name.to_ascii_lowercase(), IndexedGroup { name, members });
    }

    /// `false` when the group is unknown.
    pub fn contains(&self, group: &str, member: &str) -> bool {
        self.groups
            .get(&group.to_ascii_lowercase())
            .is_some_and(|g| g.members.contains(&member.to_ascii_lowercase()))
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(&group.to_ascii_lowercase())
    }

    /// Group names as the directory spells them.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.values().map(|g| g.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FromIterator<(String, BTreeSet<String>)> for GroupMembershipIndex {
    fn from_iter<I: IntoIterator<Item = (String, BTreeSet<String>)>>(iter: I) -> Self {
        let mut index = GroupMembershipIndex::default();
        for (name, members) in iter {
            index.insert(name, members);
        }
        index
    }
}

/// Builds the snapshot for all security groups under `container` whose name
/// starts with `prefix`. Any directory error fails the whole build.
pub async fn build_index(
    directory: &dyn DirectoryService,
    container: &str,
    prefix: &str,
    scope: SearchScope,
) -> Result<GroupMembershipIndex, DirectoryError> {
    let groups = directory.find_security_groups(container, prefix, scope).await?;

    if groups.is_empty() {
        warn!("No security groups matching '{prefix}*' under {container}");
    }

    let mut index = GroupMembershipIndex::default();
    for group in groups {
        let members = directory.transitive_members(&group).await?;
        debug!(group = %group.name, members = members.len(), "Read group membership");
        index.insert(group.name, members.into_iter().map(|m| m.name).collect());
    }

    info!("Indexed {} groups matching '{prefix}*'", index.len());

    Ok(index)
}
