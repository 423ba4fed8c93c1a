//! LDAP filters for the Active Directory queries of a pass.
//!
//! All user supplied values are escaped with [`ldap_escape`].

use ldap3::ldap_escape;

/// `groupType` bit marking a security group.
pub const SECURITY_GROUP_FLAG: u32 = 0x8000_0000;

/// Bitwise AND matching rule.
const MATCHING_RULE_BIT_AND: &str = "1.2.840.113556.1.4.803";

/// Transitive (in-chain) matching rule, resolves nested membership server side.
const MATCHING_RULE_IN_CHAIN: &str = "1.2.840.113556.1.4.1941";

pub const COMPUTERS: &str = "(objectCategory=computer)";

pub fn security_groups(prefix: &str) -> String {
    format!(
        "(&(objectCategory=group)(groupType:{MATCHING_RULE_BIT_AND}:={SECURITY_GROUP_FLAG})(name={}*))",
        ldap_escape(prefix)
    )
}

/// Every non-group object that is a member of `group_dn`, at any depth.
pub fn transitive_members(group_dn: &str) -> String {
    format!(
        "(&(memberOf:{MATCHING_RULE_IN_CHAIN}:={})(!(objectClass=group)))",
        ldap_escape(group_dn)
    )
}

/// Security groups whose account name or RDN value is exactly `name`.
pub fn security_group_named(name: &str) -> String {
    let name = ldap_escape(name);
    format!(
        "(&(objectCategory=group)(groupType:{MATCHING_RULE_BIT_AND}:={SECURITY_GROUP_FLAG})(|(sAMAccountName={name})(name={name})))"
    )
}

/// Value for the `member` attribute that addresses an object by SID.
pub fn sid_reference(sid: &impl std::fmt::Display) -> String {
    format!("<SID={sid}>")
}
