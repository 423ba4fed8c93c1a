//! # Directory Service Port
//!
//! The contract between the shard pass and whatever directory actually holds
//! the computer and group objects. The pass only ever talks to a
//! [`DirectoryService`]; the LDAP client in `adshard-protocols` and the
//! in-memory directory in `adshard-core` are the two implementations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::SearchScope;

mod entry;
mod error;
mod sid;

pub use entry::{ComputerEntry, GroupEntry, MemberEntry};
pub use error::DirectoryError;
pub use sid::{SecurityIdentifier, SidParseError};

/// Operations the shard pass consumes from a directory.
///
/// Every call is awaited to completion before the next one is issued.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Security groups under `container` whose name starts with `prefix`.
    async fn find_security_groups(
        &self,
        container: &str,
        prefix: &str,
        scope: SearchScope,
    ) -> Result<Vec<GroupEntry>, DirectoryError>;

    /// Every non-group object that is a member of `group`, directly or
    /// through nested groups.
    async fn transitive_members(&self, group: &GroupEntry) -> Result<Vec<MemberEntry>, DirectoryError>;

    /// Computer objects under `container`.
    async fn find_computers(
        &self,
        container: &str,
        scope: SearchScope,
    ) -> Result<Vec<ComputerEntry>, DirectoryError>;

    /// The one security group named `name` under `container`.
    async fn find_group(
        &self,
        container: &str,
        name: &str,
        scope: SearchScope,
    ) -> Result<GroupEntry, DirectoryError>;

    /// Adds `member` to `group`. Adding an existing member succeeds.
    async fn add_member(&self, group: &GroupEntry, member: &SecurityIdentifier) -> Result<(), DirectoryError>;
}

/// Lets a caller keep a handle on a directory it hands to a service.
#[async_trait]
impl<T> DirectoryService for Arc<T>
where
    T: DirectoryService + ?Sized,
{
    async fn find_security_groups(
        &self,
        container: &str,
        prefix: &str,
        scope: SearchScope,
    ) -> Result<Vec<GroupEntry>, DirectoryError> {
        (**self).find_security_groups(container, prefix, scope).await
    }

    async fn transitive_members(&self, group: &GroupEntry) -> Result<Vec<MemberEntry>, DirectoryError> {
        (**self).transitive_members(group).await
    }

    async fn find_computers(
        &self,
        container: &str,
        scope: SearchScope,
    ) -> Result<Vec<ComputerEntry>, DirectoryError> {
        (**self).find_computers(container, scope).await
    }

    async fn find_group(
        &self,
        container: &str,
        name: &str,
        scope: SearchScope,
    ) -> Result<GroupEntry, DirectoryError> {
        (**self).find_group(container, name, scope).await
    }

    async fn add_member(&self, group: &GroupEntry, member: &SecurityIdentifier) -> Result<(), DirectoryError> {
        (**self).add_member(group, member).await
    }
}
