//! # In-Memory Directory
//!
//! A [`DirectoryService`] backed by plain collections. Containers are
//! distinguished names; an object lives directly in the container it was added
//! to, and a subtree search matches every container whose DN ends with the
//! searched one. Names compare without regard to ASCII case, as in Active
//! Directory.
//!
//! Faults can be injected to exercise the failure paths of a pass: the whole
//! directory can be made unreachable, adds for a given SID can be rejected, or
//! accepted and silently discarded.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use adshard_common::config::SearchScope;
use adshard_common::directory::{
    ComputerEntry, DirectoryError, DirectoryService, GroupEntry, MemberEntry, SecurityIdentifier,
};

const DOMAIN_SUB_AUTHORITIES: [u32; 4] = [21, 1004336348, 1177238915, 682003330];
const FIRST_RID: u32 = 1100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Security,
    Distribution,
}

#[derive(Debug, Clone)]
enum Member {
    Object(SecurityIdentifier),
    Group(String),
}

#[derive(Debug)]
struct StoredComputer {
    container: String,
    entry: ComputerEntry,
}

#[derive(Debug)]
struct StoredGroup {
    container: String,
    entry: GroupEntry,
    kind: GroupKind,
    members: Vec<Member>,
}

#[derive(Debug, Default)]
struct State {
    containers: BTreeSet<String>,
    computers: Vec<StoredComputer>,
    groups: Vec<StoredGroup>,
    next_rid: u32,
    unreachable: bool,
    rejected_adds: HashSet<SecurityIdentifier>,
    dropped_adds: HashSet<SecurityIdentifier>,
    add_requests: Vec<(String, SecurityIdentifier)>,
}

impl State {
    fn check_reachable(&self) -> Result<(), DirectoryError> {
        if self.unreachable {
            return Err(DirectoryError::Unreachable("in-memory directory is offline".into()));
        }
        Ok(())
    }

    fn check_container(&self, container: &str) -> Result<(), DirectoryError> {
        if self.containers.contains(&container.to_ascii_lowercase()) {
            Ok(())
        } else {
            Err(DirectoryError::ContainerNotFound(container.to_string()))
        }
    }

    fn group(&self, name: &str) -> Option<&StoredGroup> {
        self.groups.iter().find(|g| g.entry.name.eq_ignore_ascii_case(name))
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut StoredGroup> {
        self.groups.iter_mut().find(|g| g.entry.name.eq_ignore_ascii_case(name))
    }

    fn computer(&self, sid: &SecurityIdentifier) -> Option<&ComputerEntry> {
        self.computers.iter().map(|c| &c.entry).find(|c| &c.sid == sid)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_rid: FIRST_RID,
                ..State::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers an empty container.
    pub fn add_container(&self, container: &str) {
        self.lock().containers.insert(container.to_ascii_lowercase());
    }

    /// Adds a computer and returns the SID allocated for it.
    pub fn add_computer(&self, container: &str, name: &str) -> SecurityIdentifier {
        let mut state = self.lock();
        state.containers.insert(container.to_ascii_lowercase());

        let rid = state.next_rid;
        state.next_rid += 1;
        let sid = allocate_sid(rid);

        state.computers.push(StoredComputer {
            container: container.to_string(),
            entry: ComputerEntry::new(name, sid.clone()),
        });
        sid
    }

    pub fn add_group(&self, container: &str, name: &str, kind: GroupKind) -> GroupEntry {
        let mut state = self.lock();
        state.containers.insert(container.to_ascii_lowercase());

        let entry = GroupEntry::new(name, format!("CN={name},{container}"));
        state.groups.push(StoredGroup {
            container: container.to_string(),
            entry: entry.clone(),
            kind,
            members: Vec::new(),
        });
        entry
    }

    /// Direct membership of a computer. Unknown groups are ignored.
    pub fn add_group_member(&self, group: &str, sid: &SecurityIdentifier) {
        if let Some(g) = self.lock().group_mut(group) {
            g.members.push(Member::Object(sid.clone()));
        }
    }

    /// Makes `child` a member of `parent`.
    pub fn nest_group(&self, parent: &str, child: &str) {
        if let Some(g) = self.lock().group_mut(parent) {
            g.members.push(Member::Group(child.to_string()));
        }
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Every add of `sid` fails with an access error.
    pub fn reject_adds_for(&self, sid: &SecurityIdentifier) {
        self.lock().rejected_adds.insert(sid.clone());
    }

    /// Every add of `sid` reports success but changes nothing.
    pub fn drop_adds_for(&self, sid: &SecurityIdentifier) {
        self.lock().dropped_adds.insert(sid.clone());
    }

    /// `(group name, member)` for every add that reached the directory, in order.
    pub fn add_requests(&self) -> Vec<(String, SecurityIdentifier)> {
        self.lock().add_requests.clone()
    }
}

fn allocate_sid(rid: u32) -> SecurityIdentifier {
    let [a, b, c, d] = DOMAIN_SUB_AUTHORITIES;
    SecurityIdentifier::from_parts(5, [a, b, c, d, rid])
}

fn in_scope(object_container: &str, container: &str, scope: SearchScope) -> bool {
    let object = object_container.to_ascii_lowercase();
    let base = container.to_ascii_lowercase();
    match scope {
        SearchScope::OneLevel => object == base,
        SearchScope::Subtree => object == base || object.ends_with(&format!(",{base}")),
    }
}

#[async_trait]
impl DirectoryService for InMemoryDirectory {
    async fn find_security_groups(
        &self,
        container: &str,
        prefix: &str,
        scope: SearchScope,
    ) -> Result<Vec<GroupEntry>, DirectoryError> {
        let state = self.lock();
        state.check_reachable()?;
        state.check_container(container)?;

        let prefix = prefix.to_ascii_lowercase();
        Ok(state
            .groups
            .iter()
            .filter(|g| g.kind == GroupKind::Security)
            .filter(|g| in_scope(&g.container, container, scope))
            .filter(|g| g.entry.name.to_ascii_lowercase().starts_with(&prefix))
            .map(|g| g.entry.clone())
            .collect())
    }

    async fn transitive_members(&self, group: &GroupEntry) -> Result<Vec<MemberEntry>, DirectoryError> {
        let state = self.lock();
        state.check_reachable()?;

        let root = state
            .groups
            .iter()
            .find(|g| g.entry.dn.eq_ignore_ascii_case(&group.dn))
            .ok_or_else(|| DirectoryError::GroupNotFound(group.name.clone()))?;

        let mut members: Vec<MemberEntry> = Vec::new();
        let mut seen: HashSet<&SecurityIdentifier> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::from([root.entry.name.to_ascii_lowercase()]);
        let mut queue: VecDeque<&StoredGroup> = VecDeque::from([root]);

        while let Some(current) = queue.pop_front() {
            for member in &current.members {
                match member {
                    Member::Object(sid) => {
                        let Some(computer) = state.computer(sid) else {
                            continue;
                        };
                        if seen.insert(sid) {
                            members.push(MemberEntry::new(computer.name.clone(), sid.clone()));
                        }
                    }
                    Member::Group(child) => {
                        // nesting cycles are legal in AD
                        if !visited.insert(child.to_ascii_lowercase()) {
                            continue;
                        }
                        if let Some(nested) = state.group(child) {
                            queue.push_back(nested);
                        }
                    }
                }
            }
        }

        Ok(members)
    }

    async fn find_computers(
        &self,
        container: &str,
        scope: SearchScope,
    ) -> Result<Vec<ComputerEntry>, DirectoryError> {
        let state = self.lock();
        state.check_reachable()?;
        state.check_container(container)?;

        Ok(state
            .computers
            .iter()
            .filter(|c| in_scope(&c.container, container, scope))
            .map(|c| c.entry.clone())
            .collect())
    }

    async fn find_group(
        &self,
        container: &str,
        name: &str,
        scope: SearchScope,
    ) -> Result<GroupEntry, DirectoryError> {
        let state = self.lock();
        state.check_reachable()?;
        state.check_container(container)?;

        let mut matches = state
            .groups
            .iter()
            .filter(|g| g.kind == GroupKind::Security)
            .filter(|g| in_scope(&g.container, container, scope))
            .filter(|g| g.entry.name.eq_ignore_ascii_case(name));

        match (matches.next(), matches.next()) {
            (Some(group), None) => Ok(group.entry.clone()),
            (None, _) => Err(DirectoryError::GroupNotFound(name.to_string())),
            (Some(_), Some(_)) => Err(DirectoryError::AmbiguousGroup(name.to_string())),
        }
    }

    async fn add_member(&self, group: &GroupEntry, member: &SecurityIdentifier) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        state.check_reachable()?;

        if state.rejected_adds.contains(member) {
            return Err(DirectoryError::operation("add member", "insufficient access rights"));
        }

        let dropped = state.dropped_adds.contains(member);
        let target = state
            .groups
            .iter_mut()
            .find(|g| g.entry.dn.eq_ignore_ascii_case(&group.dn))
            .ok_or_else(|| DirectoryError::GroupNotFound(group.name.clone()))?;

        let target_name = target.entry.name.clone();
        let present = target
            .members
            .iter()
            .any(|m| matches!(m, Member::Object(sid) if sid == member));
        if !present && !dropped {
            target.members.push(Member::Object(member.clone()));
        }

        state.add_requests.push((target_name, member.clone()));
        Ok(())
    }
}
