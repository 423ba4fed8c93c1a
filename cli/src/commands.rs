pub mod assign;
pub mod reconcile;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use adshard_common::config::{Config, ConfigError, DuplicatePolicy, SearchScope};
use adshard_protocols::ldap::{DEFAULT_PAGE_SIZE, LdapSettings};

const PASSWORD_ENV: &str = "ADSHARD_BIND_PASSWORD";

#[derive(Parser)]
#[command(name = "adshard")]
#[command(version, about = "Shards computer objects across directory groups by name hash.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Assign every machine to its group and add missing memberships
    #[command(alias = "r")]
    Reconcile(ReconcileArgs),
    /// Show the digest and group for machine names, without touching the directory
    #[command(alias = "a")]
    Assign {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
        /// Group name prefix
        #[arg(short, long)]
        prefix: String,
        /// SHA256, SHA384 or SHA512
        #[arg(short, long, default_value = "SHA256")]
        algorithm: String,
    },
}

#[derive(Args)]
pub struct ReconcileArgs {
    /// Container holding computer objects (repeatable)
    #[arg(short = 'm', long = "machine-container", value_name = "DN", required = true)]
    pub machine_containers: Vec<String>,
    /// Group name prefix; groups are named <PREFIX><hex digit>
    #[arg(short, long)]
    pub prefix: String,
    /// Container holding the target groups
    #[arg(short, long = "group-container", value_name = "DN")]
    pub group_container: String,
    /// Search containers recursively instead of immediate children only
    #[arg(short, long)]
    pub recursive: bool,
    /// SHA256, SHA384 or SHA512
    #[arg(short, long, default_value = "SHA256")]
    pub algorithm: String,
    /// Process only the first machine of each name across containers
    #[arg(long)]
    pub dedupe_machines: bool,
    /// Report missing memberships without adding them
    #[arg(long)]
    pub dry_run: bool,
    /// Where the per-run log file is written
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub log_dir: PathBuf,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// Directory server, e.g. ldaps://dc01.corp.local
    #[arg(long, env = "ADSHARD_URL")]
    pub url: String,
    /// Bind DN or user principal name; anonymous when omitted.
    /// The password is read from ADSHARD_BIND_PASSWORD.
    #[arg(long, env = "ADSHARD_BIND_DN")]
    pub bind_dn: Option<String>,
    /// Root for group lookups, defaults to the server's naming context
    #[arg(long, env = "ADSHARD_BASE_DN", value_name = "DN")]
    pub base_dn: Option<String>,
    #[arg(long, env = "ADSHARD_STARTTLS")]
    pub starttls: bool,
    #[arg(long, env = "ADSHARD_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: i32,
    /// Connection timeout
    #[arg(long, env = "ADSHARD_TIMEOUT", value_name = "SECONDS", default_value_t = 30)]
    pub timeout: u64,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl ReconcileArgs {
    pub fn to_config(&self) -> Result<Config, ConfigError> {
        let duplicates = if self.dedupe_machines {
            DuplicatePolicy::FirstByName
        } else {
            DuplicatePolicy::Keep
        };

        let cfg = Config {
            machine_containers: self.machine_containers.clone(),
            group_container: self.group_container.clone(),
            group_prefix: self.prefix.clone(),
            scope: SearchScope::from_recursive(self.recursive),
            algorithm: self.algorithm.parse()?,
            duplicates,
            dry_run: self.dry_run,
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

impl ConnectionArgs {
    pub fn to_settings(&self) -> LdapSettings {
        let mut settings = LdapSettings::new(&self.url);
        settings.bind_dn = self.bind_dn.clone();
        settings.bind_password = std::env::var(PASSWORD_ENV).ok();
        settings.base_dn = self.base_dn.clone();
        settings.starttls = self.starttls;
        settings.page_size = self.page_size;
        settings.timeout = Duration::from_secs(self.timeout);
        settings
    }
}
