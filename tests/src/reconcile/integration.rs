use std::sync::Arc;

use adshard_common::config::{Config, DuplicatePolicy, HashAlgorithm, SearchScope};
use adshard_core::memory::{GroupKind, InMemoryDirectory};
use adshard_core::reconciler::{Outcome, PassReport};
use adshard_core::{ShardError, ShardService};

use crate::support::{self, EAST, GROUPS, WEST};

async fn run(dir: &Arc<InMemoryDirectory>, cfg: &Config) -> anyhow::Result<PassReport> {
    let service = ShardService::new(Box::new(dir.clone()));
    Ok(service.run(cfg).await?)
}

fn outcome_of<'a>(report: &'a PassReport, name: &str) -> Vec<&'a Outcome> {
    report
        .machines
        .iter()
        .filter(|r| r.machine.name() == name)
        .map(|r| &r.outcome)
        .collect()
}

/// HOST01 hashes (SHA-256) to a digest ending in C and must land in
/// WECGroupC, verified by a fresh membership read.
#[tokio::test]
async fn missing_machine_is_added_to_its_shard() {
    let dir = Arc::new(support::directory());
    let host01 = dir.add_computer(EAST, "HOST01");

    let report = run(&dir, &support::config(&[EAST])).await.unwrap();

    assert_eq!(report.machines.len(), 1);
    let machine = &report.machines[0].machine;
    assert!(machine.digest().as_str().ends_with('C'));
    assert_eq!(machine.group(), "WECGroupC");
    assert_eq!(report.machines[0].outcome, Outcome::Verified);
    assert_eq!(dir.add_requests(), vec![("WECGroupC".to_string(), host01)]);
}

#[tokio::test]
async fn second_pass_adds_nothing() {
    let dir = Arc::new(support::directory());
    for name in ["HOST01", "HOST02", "HOST03", "WS-0001", "WS-0002", "SRV-DB01"] {
        dir.add_computer(EAST, name);
    }
    let cfg = support::config(&[EAST]);

    let first = run(&dir, &cfg).await.unwrap();
    let adds_after_first = dir.add_requests().len();
    let second = run(&dir, &cfg).await.unwrap();

    assert_eq!(first.summary.added, 6);
    assert_eq!(adds_after_first, 6);
    assert_eq!(second.summary.already_member, 6);
    assert_eq!(second.summary.added, 0);
    assert_eq!(dir.add_requests().len(), adds_after_first, "no new add operations");
}

#[tokio::test]
async fn failure_does_not_stop_later_machines() {
    let dir = Arc::new(support::directory());
    let first = dir.add_computer(EAST, "HOST01");
    let broken = dir.add_computer(EAST, "HOST02");
    dir.add_computer(EAST, "HOST03");
    dir.add_group_member("WECGroupC", &first);
    dir.reject_adds_for(&broken);

    let report = run(&dir, &support::config(&[EAST])).await.unwrap();

    let outcomes: Vec<&Outcome> = report.machines.iter().map(|r| &r.outcome).collect();
    assert_eq!(outcomes[0], &Outcome::AlreadyMember);
    assert!(matches!(outcomes[1], Outcome::AddFailed { .. }));
    assert_eq!(outcomes[2], &Outcome::Verified);
    assert_eq!(report.summary.failed, 1);
    assert!(!report.summary.is_clean());
}

#[tokio::test]
async fn shared_shard_triggers_an_add_per_machine() {
    let dir = Arc::new(support::directory());
    // Both hash to WECGroupC and are absent from the snapshot
    let host01 = dir.add_computer(EAST, "HOST01");
    let ws0001 = dir.add_computer(EAST, "WS-0001");

    let report = run(&dir, &support::config(&[EAST])).await.unwrap();

    assert_eq!(report.summary.per_group.get("WECGroupC"), Some(&2));
    assert_eq!(
        dir.add_requests(),
        vec![("WECGroupC".to_string(), host01), ("WECGroupC".to_string(), ws0001)]
    );
}

#[tokio::test]
async fn duplicates_across_containers_are_kept_by_default() {
    let dir = Arc::new(support::directory());
    dir.add_computer(EAST, "DUP");
    dir.add_computer(WEST, "DUP");

    let report = run(&dir, &support::config(&[EAST, WEST])).await.unwrap();

    assert_eq!(outcome_of(&report, "DUP"), vec![&Outcome::Verified, &Outcome::Verified]);
    assert_eq!(dir.add_requests().len(), 2);
}

#[tokio::test]
async fn duplicate_is_verified_by_its_own_sid() {
    let dir = Arc::new(support::directory());
    dir.add_computer(EAST, "DUP");
    let west = dir.add_computer(WEST, "DUP");
    dir.drop_adds_for(&west);

    let report = run(&dir, &support::config(&[EAST, WEST])).await.unwrap();

    assert_eq!(report.machines[0].outcome, Outcome::Verified);
    assert_eq!(report.machines[1].machine.sid(), &west);
    assert_eq!(
        report.machines[1].outcome,
        Outcome::AddFailed {
            reason: "member not present after add".into()
        }
    );
    assert_eq!(dir.add_requests().len(), 2);
}

#[tokio::test]
async fn duplicates_can_be_collapsed() {
    let dir = Arc::new(support::directory());
    dir.add_computer(EAST, "DUP");
    dir.add_computer(WEST, "DUP");
    let mut cfg = support::config(&[EAST, WEST]);
    cfg.duplicates = DuplicatePolicy::FirstByName;

    let report = run(&dir, &cfg).await.unwrap();

    assert_eq!(outcome_of(&report, "DUP"), vec![&Outcome::Verified]);
    assert_eq!(dir.add_requests().len(), 1);
}

#[tokio::test]
async fn recursive_scope_reaches_nested_containers() {
    let dir = Arc::new(support::directory());
    dir.add_computer(EAST, "HOST01");
    dir.add_computer(&format!("OU=Lab,{EAST}"), "HOST02");
    dir.add_group(&format!("OU=Legacy,{GROUPS}"), "WECGroupLegacy", GroupKind::Security);
    let mut cfg = support::config(&[EAST]);

    let shallow = run(&dir, &cfg).await.unwrap();
    cfg.scope = SearchScope::Subtree;
    let deep = run(&dir, &cfg).await.unwrap();

    assert_eq!(shallow.summary.machines, 1);
    assert_eq!(deep.summary.machines, 2);
    assert_eq!(deep.summary.already_member, 1, "HOST01 was added by the first pass");
}

#[tokio::test]
async fn dry_run_reports_without_writing() {
    let dir = Arc::new(support::directory());
    let host01 = dir.add_computer(EAST, "HOST01");
    dir.add_computer(EAST, "HOST02");
    dir.add_group_member("WECGroupC", &host01);
    let mut cfg = support::config(&[EAST]);
    cfg.dry_run = true;

    let report = run(&dir, &cfg).await.unwrap();

    assert_eq!(report.summary.already_member, 1);
    assert_eq!(report.summary.planned, 1);
    assert!(report.summary.is_clean());
    assert!(dir.add_requests().is_empty());
}

#[tokio::test]
async fn algorithm_choice_changes_shards() {
    let dir = Arc::new(support::directory());
    dir.add_computer(EAST, "HOST01");
    let mut cfg = support::config(&[EAST]);
    cfg.algorithm = HashAlgorithm::Sha512;

    let report = run(&dir, &cfg).await.unwrap();

    assert_eq!(report.machines[0].machine.group(), "WECGroupE");
    assert_eq!(report.machines[0].machine.digest().as_str().len(), 128);
}

#[tokio::test]
async fn missing_machine_container_aborts_the_pass() {
    let dir = Arc::new(support::directory());
    dir.add_computer(EAST, "HOST01");

    let err = run(&dir, &support::config(&[EAST, "OU=Gone,DC=corp,DC=local"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ShardError>(),
        Some(ShardError::Enumeration { .. })
    ));
    assert!(dir.add_requests().is_empty(), "nothing is reconciled after a fatal error");
}
