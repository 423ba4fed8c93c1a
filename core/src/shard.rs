//! # Shard Pass Service
//!
//! Implements the "reconcile shard groups" use case: one bounded pass of
//! inventory, enumeration and reconciliation against a [`DirectoryService`].

use adshard_common::config::Config;
use adshard_common::directory::DirectoryService;
use tracing::{info, warn};

use crate::error::ShardError;
use crate::machine::AssignedMachine;
use crate::reconciler::{MachineReport, PassReport, Reconciler};
use crate::{enumerator, inventory};

/// Called after each machine reaches a terminal state with
/// `(processed, total)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

/// Application service for a shard pass.
///
/// Orchestrates the pass by:
/// 1. reading the group snapshot,
/// 2. enumerating machines,
/// 3. reconciling each machine in enumeration order.
///
/// Every directory call is awaited before the next one starts.
pub struct ShardService {
    directory: Box<dyn DirectoryService>,
    on_progress: Option<ProgressCallback>,
}

impl ShardService {
    pub fn new(directory: Box<dyn DirectoryService>) -> Self {
        Self {
            directory,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Runs one pass.
    ///
    /// Fails only for configuration, inventory or enumeration errors.
    /// Per-machine failures are reported in the returned [`PassReport`].
    pub async fn run(&self, cfg: &Config) -> Result<PassReport, ShardError> {
        cfg.validate()?;
        let directory = self.directory.as_ref();

        info!(
            "Reading security groups '{}*' under {}",
            cfg.group_prefix, cfg.group_container
        );
        let snapshot = inventory::build_index(directory, &cfg.group_container, &cfg.group_prefix, cfg.scope)
            .await
            .map_err(|source| ShardError::Inventory {
                container: cfg.group_container.clone(),
                source,
            })?;

        let entries = enumerator::enumerate(directory, &cfg.machine_containers, cfg.scope, cfg.duplicates).await?;
        let total = entries.len();
        info!("Reconciling {total} machines using {}", cfg.algorithm);

        let reconciler =
            Reconciler::new(directory, &snapshot, &cfg.group_container, cfg.scope).dry_run(cfg.dry_run);
        let mut report = PassReport::default();

        for (idx, entry) in entries.into_iter().enumerate() {
            match AssignedMachine::assign(entry, &cfg.group_prefix, cfg.algorithm) {
                Ok(machine) => {
                    let outcome = reconciler.reconcile(&machine).await;
                    report.push(MachineReport { machine, outcome });
                }
                Err(e) => {
                    warn!("Skipping entry: {e}");
                    report.skip();
                }
            }

            if let Some(on_progress) = &self.on_progress {
                on_progress(idx + 1, total);
            }
        }

        Ok(report)
    }
}
