use super::sid::SecurityIdentifier;

/// A computer object as read from the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputerEntry {
    pub name: String,
    pub sid: SecurityIdentifier,
}

impl ComputerEntry {
    pub fn new(name: impl Into<String>, sid: SecurityIdentifier) -> Self {
        Self { name: name.into(), sid }
    }
}

/// A non-group object found in a group's membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEntry {
    pub name: String,
    pub sid: SecurityIdentifier,
}

impl MemberEntry {
    pub fn new(name: impl Into<String>, sid: SecurityIdentifier) -> Self {
        Self { name: name.into(), sid }
    }
}

/// A group object. `dn` is whatever the directory needs to address the group
/// again (a distinguished name for LDAP).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub dn: String,
}

impl GroupEntry {
    pub fn new(name: impl Into<String>, dn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dn: dn.into(),
        }
    }
}
