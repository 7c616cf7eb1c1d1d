use anyhow::anyhow;
use riscan_batch::batch::{Outcome, run_batch};
use riscan_batch::project::ScanPosition;
use std::path::PathBuf;

fn mk_position(i: usize) -> ScanPosition {
    ScanPosition {
        name: format!("ScanPos{i:03}"),
        scan_name: format!("scan{i:03}"),
        rxp_file: PathBuf::from(format!("scan{i:03}.rxp")),
        rdbx_file: None,
        transform_file: PathBuf::from(format!("ScanPos{i:03}.DAT")),
    }
}

#[test]
fn failures_are_isolated_and_order_is_preserved() {
    let positions: Vec<ScanPosition> = (1..=6).map(mk_position).collect();
    let mut calls = 0usize;

    let (outcomes, summary) = run_batch(&positions, |pos| {
        calls += 1;
        // 1-indexed positions 2 and 5 fail.
        if calls == 2 || calls == 5 {
            Err(anyhow!("synthetic failure at {}", pos.name))
        } else {
            Ok(calls)
        }
    });

    assert_eq!(outcomes.len(), 6);
    assert_eq!(summary.attempted, 6);
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 2);
    assert!(!summary.no_work_done());

    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.position(), positions[i].name);
        let should_fail = i == 1 || i == 4;
        assert_eq!(outcome.is_success(), !should_fail);
    }
}

#[test]
fn error_description_is_captured_verbatim() {
    let positions = vec![mk_position(1)];
    let (outcomes, _) = run_batch::<(), _>(&positions, |_| Err(anyhow!("exact message")));

    match &outcomes[0] {
        Outcome::Failure { error, .. } => assert_eq!(error, "exact message"),
        Outcome::Success { .. } => panic!("expected failure"),
    }
}

#[test]
fn all_failures_is_reported_not_raised() {
    let positions: Vec<ScanPosition> = (1..=3).map(mk_position).collect();
    let (outcomes, summary) = run_batch::<(), _>(&positions, |pos| {
        Err(anyhow!("cannot open {}", pos.rxp_file.display()))
    });

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|o| !o.is_success()));
    assert!(summary.no_work_done());
}

#[test]
fn empty_batch_reports_no_work() {
    let (outcomes, summary) = run_batch::<(), _>(&[], |_| Ok(()));
    assert!(outcomes.is_empty());
    assert_eq!(summary.attempted, 0);
    assert!(summary.no_work_done());
}

#[test]
fn success_payloads_carry_position_tokens() {
    let positions: Vec<ScanPosition> = (1..=2).map(mk_position).collect();
    let (outcomes, _) = run_batch(&positions, |pos| Ok(pos.scan_name.clone()));

    match &outcomes[1] {
        Outcome::Success {
            position,
            scan_name,
            payload,
        } => {
            assert_eq!(position, "ScanPos002");
            assert_eq!(scan_name, "scan002");
            assert_eq!(payload, "scan002");
        }
        Outcome::Failure { .. } => panic!("expected success"),
    }
}
