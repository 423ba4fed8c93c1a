use std::fmt;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: i32 = 500;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`LdapDirectory`](super::LdapDirectory).
#[derive(Clone)]
pub struct LdapSettings {
    /// `ldap://host:389` or `ldaps://host:636`.
    pub url: String,
    /// Empty means an anonymous bind.
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    /// Root for group lookups and membership queries. Read from the rootDSE
    /// `defaultNamingContext` when unset.
    pub base_dn: Option<String>,
    pub starttls: bool,
    pub timeout: Duration,
    pub page_size: i32,
}

impl LdapSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bind_dn: None,
            bind_password: None,
            base_dn: None,
            starttls: false,
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl fmt::Debug for LdapSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapSettings")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &self.bind_password.as_ref().map(|_| "***"))
            .field("base_dn", &self.base_dn)
            .field("starttls", &self.starttls)
            .field("timeout", &self.timeout)
            .field("page_size", &self.page_size)
            .finish()
    }
}
