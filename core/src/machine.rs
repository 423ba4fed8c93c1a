use adshard_common::config::HashAlgorithm;
use adshard_common::directory::{ComputerEntry, SecurityIdentifier};
use thiserror::Error;

use crate::hashing::NameDigest;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("computer {0} has an empty name")]
    EmptyName(SecurityIdentifier),
}

/// A computer with its digest and target group, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedMachine {
    name: String,
    sid: SecurityIdentifier,
    digest: NameDigest,
    group: String,
}

impl AssignedMachine {
    /// Fails for a blank name, which would otherwise hash like any other.
    pub fn assign(entry: ComputerEntry, prefix: &str, algorithm: HashAlgorithm) -> Result<Self, AssignError> {
        if entry.name.trim().is_empty() {
            return Err(AssignError::EmptyName(entry.sid));
        }

        let digest = NameDigest::compute(algorithm, &entry.name);
        let group = digest.group_for(prefix);
        Ok(Self {
            name: entry.name,
            sid: entry.sid,
            digest,
            group,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sid(&self) -> &SecurityIdentifier {
        &self.sid
    }

    pub fn digest(&self) -> &NameDigest {
        &self.digest
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_populates_every_field() {
        let sid: SecurityIdentifier = "S-1-5-21-1-2-3-1105".parse().unwrap();
        let entry = ComputerEntry::new("HOST01", sid.clone());

        let machine = AssignedMachine::assign(entry, "WECGroup", HashAlgorithm::Sha256).unwrap();

        assert_eq!(machine.name(), "HOST01");
        assert_eq!(machine.sid(), &sid);
        assert!(machine.digest().as_str().ends_with("2DB83C"));
        assert_eq!(machine.group(), "WECGroupC");
    }

    #[test]
    fn test_blank_names_are_rejected() {
        let sid: SecurityIdentifier = "S-1-5-21-1-2-3-1106".parse().unwrap();

        for name in ["", "   "] {
            let result = AssignedMachine::assign(ComputerEntry::new(name, sid.clone()), "WECGroup", HashAlgorithm::Sha256);
            assert_eq!(result, Err(AssignError::EmptyName(sid.clone())));
        }
    }
}
