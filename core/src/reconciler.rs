//! # Reconciliation
//!
//! Stage 3 of a pass. Each machine is checked against the stage 1 snapshot
//! and, when missing, added to its group and re-read once to confirm.
//!
//! ```text
//! Assigned ─┬─> AlreadyMember
//!           └─> AddRequested ─┬─> Verified
//!                             └─> AddFailed
//! ```
//!
//! The snapshot is never updated after an add, so two missing machines that
//! share a group each cause their own add.

use std::collections::BTreeMap;

use adshard_common::config::SearchScope;
use adshard_common::directory::{DirectoryError, DirectoryService};
use adshard_common::success;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::inventory::GroupMembershipIndex;
use crate::machine::AssignedMachine;

/// Terminal state of one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    AlreadyMember,
    Verified,
    AddFailed { reason: String },
    /// Dry run only: the machine is missing and would have been added.
    Planned,
}

#[derive(Debug, Error)]
enum AddError {
    #[error("group lookup failed: {0}")]
    Lookup(#[source] DirectoryError),
    #[error("add rejected: {0}")]
    Add(#[source] DirectoryError),
    #[error("verification read failed: {0}")]
    Verify(#[source] DirectoryError),
    #[error("member not present after add")]
    NotApplied,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineReport {
    pub machine: AssignedMachine,
    pub outcome: Outcome,
}

/// Counts over one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub machines: usize,
    pub already_member: usize,
    pub added: usize,
    pub failed: usize,
    pub planned: usize,
    /// Entries that could not be assigned to a group.
    pub skipped: usize,
    /// Machines assigned to each group, whatever their outcome.
    pub per_group: BTreeMap<String, usize>,
}

impl PassSummary {
    fn record(&mut self, report: &MachineReport) {
        self.machines += 1;
        *self.per_group.entry(report.machine.group().to_string()).or_default() += 1;
        match report.outcome {
            Outcome::AlreadyMember => self.already_member += 1,
            Outcome::Verified => self.added += 1,
            Outcome::AddFailed { .. } => self.failed += 1,
            Outcome::Planned => self.planned += 1,
        }
    }

    /// `true` when no machine ended in [`Outcome::AddFailed`].
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Result of a pass: one report per machine, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub machines: Vec<MachineReport>,
    pub summary: PassSummary,
}

impl PassReport {
    pub fn push(&mut self, report: MachineReport) {
        self.summary.record(&report);
        self.machines.push(report);
    }

    pub fn skip(&mut self) {
        self.summary.skipped += 1;
    }

    pub fn failures(&self) -> impl Iterator<Item = &MachineReport> {
        self.machines
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::AddFailed { .. }))
    }
}

pub struct Reconciler<'a> {
    directory: &'a dyn DirectoryService,
    snapshot: &'a GroupMembershipIndex,
    group_container: &'a str,
    scope: SearchScope,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    /// Groups are looked up live under `group_container` with `scope`, the
    /// same place the snapshot was read from.
    pub fn new(
        directory: &'a dyn DirectoryService,
        snapshot: &'a GroupMembershipIndex,
        group_container: &'a str,
        scope: SearchScope,
    ) -> Self {
        Self {
            directory,
            snapshot,
            group_container,
            scope,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Drives one machine to a terminal state. Never fails; directory errors
    /// become [`Outcome::AddFailed`].
    pub async fn reconcile(&self, machine: &AssignedMachine) -> Outcome {
        let name = machine.name();
        let group = machine.group();
        debug!(machine = name, digest = machine.digest().as_str(), group, "Assigned");

        if self.snapshot.contains(group, name) {
            info!("{name} is already a member of {group}");
            return Outcome::AlreadyMember;
        }

        if !self.snapshot.has_group(group) {
            warn!("{group} was not found during inventory");
        }

        if self.dry_run {
            info!("{name} would be added to {group}");
            return Outcome::Planned;
        }

        match self.add_and_verify(machine).await {
            Ok(()) => {
                success!("Added {name} to {group}");
                Outcome::Verified
            }
            Err(e) => {
                error!("Failed to add {name} to {group}: {e}");
                Outcome::AddFailed { reason: e.to_string() }
            }
        }
    }

    async fn add_and_verify(&self, machine: &AssignedMachine) -> Result<(), AddError> {
        let group = self
            .directory
            .find_group(self.group_container, machine.group(), self.scope)
            .await
            .map_err(AddError::Lookup)?;

        self.directory
            .add_member(&group, machine.sid())
            .await
            .map_err(AddError::Add)?;

        let members = self
            .directory
            .transitive_members(&group)
            .await
            .map_err(AddError::Verify)?;

        // Names can repeat across containers; only the SID tells which add landed
        if members.iter().any(|m| &m.sid == machine.sid()) {
            Ok(())
        } else {
            Err(AddError::NotApplied)
        }
    }
}
