//! Directory protocol clients.
//!
//! * [`ldap`]: Active Directory over LDAP, implementing
//!   [`DirectoryService`](adshard_common::directory::DirectoryService).

pub mod ldap;
