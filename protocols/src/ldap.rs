//! # Active Directory over LDAP
//!
//! [`LdapDirectory`] implements the directory port with `ldap3`. Nested group
//! membership is resolved by the server through the in-chain matching rule,
//! and every search is paged so containers larger than the server size limit
//! are read completely.

use std::collections::HashSet;

use async_trait::async_trait;
use ldap3::adapters::{Adapter, EntriesOnly, PagedResults};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Mod, Scope, SearchEntry};
use tracing::{debug, info, warn};

use adshard_common::config::SearchScope;
use adshard_common::directory::{
    ComputerEntry, DirectoryError, DirectoryService, GroupEntry, MemberEntry, SecurityIdentifier,
};

pub mod filter;
mod settings;

pub use settings::{DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT, LdapSettings};

const RC_SUCCESS: u32 = 0;
const RC_ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
const RC_NO_SUCH_OBJECT: u32 = 32;
const RC_INVALID_CREDENTIALS: u32 = 49;
const RC_ENTRY_ALREADY_EXISTS: u32 = 68;

type Attrs = Vec<&'static str>;

pub struct LdapDirectory {
    ldap: Ldap,
    base_dn: String,
    page_size: i32,
}

impl LdapDirectory {
    /// Opens the connection, binds and resolves the search root.
    pub async fn connect(settings: &LdapSettings) -> Result<Self, DirectoryError> {
        debug!(url = %settings.url, "Connecting to directory");

        let conn_settings = LdapConnSettings::new()
            .set_conn_timeout(settings.timeout)
            .set_starttls(settings.starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(conn_settings, &settings.url)
            .await
            .map_err(|e| DirectoryError::Unreachable(format!("{}: {e}", settings.url)))?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn: &str = settings.bind_dn.as_deref().unwrap_or("");
        let result = ldap
            .simple_bind(bind_dn, settings.bind_password.as_deref().unwrap_or(""))
            .await
            .map_err(|e| DirectoryError::Unreachable(format!("bind to {}: {e}", settings.url)))?;

        bind_result(result.rc, &result.text, bind_dn)?;

        let base_dn = match &settings.base_dn {
            Some(base) => base.clone(),
            None => default_naming_context(&mut ldap).await?,
        };

        info!("Connected to {} (search root {base_dn})", settings.url);

        Ok(Self {
            ldap,
            base_dn,
            page_size: settings.page_size,
        })
    }

    async fn paged_search(
        &self,
        operation: &'static str,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attrs: Attrs,
    ) -> Result<Vec<SearchEntry>, DirectoryError> {
        let mut ldap = self.ldap.clone();
        debug!(base, filter, "Searching directory");

        let adapters: Vec<Box<dyn Adapter<'static, &'static str, Attrs>>> = vec![
            Box::new(EntriesOnly::new()),
            Box::new(PagedResults::new(self.page_size)),
        ];

        let mut stream = ldap
            .streaming_search_with(adapters, base, to_ldap_scope(scope), filter, attrs)
            .await
            .map_err(|e| map_ldap_error(operation, base, e))?;

        let mut entries: Vec<SearchEntry> = Vec::new();
        while let Some(entry) = stream.next().await.map_err(|e| map_ldap_error(operation, base, e))? {
            entries.push(SearchEntry::construct(entry));
        }

        stream
            .finish()
            .await
            .success()
            .map_err(|e| map_ldap_error(operation, base, e))?;

        Ok(entries)
    }
}

async fn default_naming_context(ldap: &mut Ldap) -> Result<String, DirectoryError> {
    let (entries, _) = ldap
        .search("", Scope::Base, "(objectClass=*)", vec!["defaultNamingContext"])
        .await
        .and_then(|r| r.success())
        .map_err(|e| map_ldap_error("rootDSE read", "", e))?;

    entries
        .into_iter()
        .map(SearchEntry::construct)
        .find_map(|entry| first_value(&entry, "defaultNamingContext"))
        .ok_or_else(|| DirectoryError::operation("rootDSE read", "no defaultNamingContext advertised"))
}

fn bind_result(rc: u32, text: &str, bind_dn: &str) -> Result<(), DirectoryError> {
    match rc {
        RC_SUCCESS => Ok(()),
        RC_INVALID_CREDENTIALS => Err(DirectoryError::AuthenticationFailed(bind_dn.to_string())),
        rc => Err(DirectoryError::operation("bind", format!("result code {rc}: {text}"))),
    }
}

/// An add of a value that is already present still counts as done.
fn add_result(rc: u32, text: &str, group: &GroupEntry) -> Result<(), DirectoryError> {
    match rc {
        RC_SUCCESS | RC_ATTRIBUTE_OR_VALUE_EXISTS | RC_ENTRY_ALREADY_EXISTS => Ok(()),
        RC_NO_SUCH_OBJECT => Err(DirectoryError::GroupNotFound(group.name.clone())),
        rc => Err(DirectoryError::operation("add member", format!("result code {rc}: {text}"))),
    }
}

fn to_ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn map_ldap_error(operation: &'static str, base: &str, e: LdapError) -> DirectoryError {
    match e {
        LdapError::LdapResult { result } if result.rc == RC_NO_SUCH_OBJECT => {
            DirectoryError::ContainerNotFound(base.to_string())
        }
        LdapError::LdapResult { result } => {
            DirectoryError::operation(operation, format!("result code {}: {}", result.rc, result.text))
        }
        other => DirectoryError::Unreachable(other.to_string()),
    }
}

fn first_value(entry: &SearchEntry, attr: &str) -> Option<String> {
    entry.attrs.get(attr).and_then(|values| values.first()).cloned()
}

/// `objectSid` is binary, but ldap3 files values that happen to be valid
/// UTF-8 under `attrs` instead of `bin_attrs`.
fn object_sid(entry: &SearchEntry) -> Option<Result<SecurityIdentifier, DirectoryError>> {
    let bytes: &[u8] = match entry.bin_attrs.get("objectSid").and_then(|v| v.first()) {
        Some(bin) => bin.as_slice(),
        None => entry.attrs.get("objectSid").and_then(|v| v.first())?.as_bytes(),
    };

    Some(SecurityIdentifier::from_bytes(bytes).map_err(|e| DirectoryError::MalformedEntry {
        dn: entry.dn.clone(),
        reason: e.to_string(),
    }))
}

fn to_computer(entry: &SearchEntry) -> Option<ComputerEntry> {
    let Some(name) = first_value(entry, "name") else {
        warn!("Skipping computer without a name: {}", entry.dn);
        return None;
    };

    match object_sid(entry) {
        Some(Ok(sid)) => Some(ComputerEntry::new(name, sid)),
        Some(Err(e)) => {
            warn!("Skipping computer {name}: {e}");
            None
        }
        None => {
            warn!("Skipping computer {name}: no objectSid");
            None
        }
    }
}

/// Members without a usable SID are not computers this tool manages.
fn to_member(entry: &SearchEntry) -> Option<MemberEntry> {
    let name = first_value(entry, "name")?;
    match object_sid(entry)? {
        Ok(sid) => Some(MemberEntry::new(name, sid)),
        Err(e) => {
            debug!("Ignoring member {name}: {e}");
            None
        }
    }
}

fn to_group(entry: &SearchEntry) -> Option<GroupEntry> {
    first_value(entry, "name").map(|name| GroupEntry::new(name, entry.dn.clone()))
}

fn single_group(entries: &[SearchEntry], name: &str) -> Result<GroupEntry, DirectoryError> {
    let mut groups = entries.iter().filter_map(to_group);
    match (groups.next(), groups.next()) {
        (Some(group), None) => Ok(group),
        (None, _) => Err(DirectoryError::GroupNotFound(name.to_string())),
        (Some(_), Some(_)) => Err(DirectoryError::AmbiguousGroup(name.to_string())),
    }
}

#[async_trait]
impl DirectoryService for LdapDirectory {
    async fn find_security_groups(
        &self,
        container: &str,
        prefix: &str,
        scope: SearchScope,
    ) -> Result<Vec<GroupEntry>, DirectoryError> {
        let entries = self
            .paged_search("group search", container, scope, &filter::security_groups(prefix), vec!["name"])
            .await?;
        Ok(entries.iter().filter_map(to_group).collect())
    }

    async fn transitive_members(&self, group: &GroupEntry) -> Result<Vec<MemberEntry>, DirectoryError> {
        let entries = self
            .paged_search(
                "membership read",
                &self.base_dn,
                SearchScope::Subtree,
                &filter::transitive_members(&group.dn),
                vec!["name", "objectSid"],
            )
            .await?;
        Ok(entries.iter().filter_map(to_member).collect())
    }

    async fn find_computers(
        &self,
        container: &str,
        scope: SearchScope,
    ) -> Result<Vec<ComputerEntry>, DirectoryError> {
        let entries = self
            .paged_search("computer search", container, scope, filter::COMPUTERS, vec!["name", "objectSid"])
            .await?;
        Ok(entries.iter().filter_map(to_computer).collect())
    }

    async fn find_group(
        &self,
        container: &str,
        name: &str,
        scope: SearchScope,
    ) -> Result<GroupEntry, DirectoryError> {
        let entries = self
            .paged_search(
                "group lookup",
                container,
                scope,
                &filter::security_group_named(name),
                vec!["name"],
            )
            .await?;
        single_group(&entries, name)
    }

    async fn add_member(&self, group: &GroupEntry, member: &SecurityIdentifier) -> Result<(), DirectoryError> {
        let mut ldap = self.ldap.clone();
        let value = filter::sid_reference(member);
        let mods: Vec<Mod<String>> = vec![Mod::Add("member".to_string(), HashSet::from([value]))];

        let result = ldap
            .modify(&group.dn, mods)
            .await
            .map_err(|e| DirectoryError::Unreachable(e.to_string()))?;

        add_result(result.rc, &result.text, group)
    }
}
