//! End-to-end lifecycle scenarios, driven from snapshot log text.

use fixlag_core::{
    AnomalyKind, LifecycleRecord, ReconstructOptions, Reconstruction, Resolution,
    load_snapshots, reconstruct_loaded,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run(body: &str) -> Reconstruction {
    let log = format!("# fixlag snapshot log v1\n{body}");
    let load = load_snapshots(&log).expect("log should load");
    reconstruct_loaded(&load, &ReconstructOptions::default())
}

fn record<'a>(out: &'a Reconstruction, sample: &str, key: &str) -> &'a LifecycleRecord {
    out.records
        .iter()
        .find(|r| r.sample == sample && r.key == key)
        .unwrap_or_else(|| panic!("no record for {sample}/{key}"))
}

fn finding(key: &str, status: &str, author: &str) -> String {
    format!(r#"{{"key":"{key}","issueStatus":"{status}","author":"{author}","severity":"MAJOR","rule":"java:S1","type":"CODE_SMELL"}}"#)
}

fn issues(findings: &[String]) -> String {
    format!(r#"{{"total":{},"issues":[{}]}}"#, findings.len(), findings.join(","))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_fixed_issue_gets_close_and_duration() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-06\t{}\n",
        issues(&[finding("K1", "OPEN", "ann")]),
        issues(&[finding("K1", "FIXED", "bob")]),
    ));

    let k1 = record(&out, "alpha", "K1");
    assert_eq!(k1.open_hash, "C1");
    assert_eq!(k1.closed_hash.as_deref(), Some("C2"));
    assert_eq!(k1.author_close.as_deref(), Some("bob"));
    assert_eq!(k1.author.as_deref(), Some("ann"));
    assert_eq!(k1.fix_duration, Some(5));
    assert_eq!(k1.resolution(), Resolution::Fixed);
}

#[test]
fn scenario_b_open_at_last_commit_stays_unresolved() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-02\t{}\n",
        issues(&[finding("K2", "OPEN", "ann")]),
        issues(&[finding("K2", "OPEN", "ann")]),
    ));

    let k2 = record(&out, "alpha", "K2");
    assert_eq!(k2.latest_open_hash.as_deref(), Some("C2"));
    assert_eq!(k2.closed_date, None);
    assert_eq!(k2.closed_hash, None);
    assert_eq!(k2.next_commit_hash, None);
    assert_eq!(k2.fix_duration, None);
    assert_eq!(k2.resolution(), Resolution::Open);
    assert_eq!(out.summary.still_open, 1);
}

#[test]
fn scenario_c_disappearing_issue_resolves_to_next_commit() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-03\t{}\nalpha\tC3\t2024-01-10\t{}\n",
        issues(&[finding("K3", "OPEN", "ann")]),
        issues(&[finding("K3", "OPEN", "ann")]),
        issues(&[finding("OTHER", "OPEN", "cyd")]),
    ));

    let k3 = record(&out, "alpha", "K3");
    assert_eq!(k3.next_commit_hash.as_deref(), Some("C3"));
    assert_eq!(k3.author_next_commit.as_deref(), Some("cyd"));
    assert_eq!(k3.fix_duration, Some(9));
    assert_eq!(k3.resolution(), Resolution::NextCommit);
}

#[test]
fn scenario_d_malformed_snapshot_keeps_its_position() {
    let out = run(&format!(
        "alpha\tC0\t2024-01-01\t{}\nalpha\tC1\t2024-01-02\t{}\nalpha\tC2\t2024-01-04\t{{not json\nalpha\tC3\t2024-01-09\t{}\n",
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[]),
    ));

    let k = record(&out, "alpha", "K");
    assert_eq!(k.latest_open_hash.as_deref(), Some("C1"));
    assert_eq!(k.next_commit_hash.as_deref(), Some("C2"));
    assert_eq!(k.fix_duration, Some(3));
    assert_eq!(k.author_next_commit, None);
    assert_eq!(out.diagnostics.count(AnomalyKind::MalformedSnapshot), 1);
    assert_eq!(out.summary.absent_snapshots, 1);
}

#[test]
fn scenario_e_reopened_after_close_is_flagged_not_applied() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-03\t{}\nalpha\tC3\t2024-01-05\t{}\n",
        issues(&[finding("K4", "OPEN", "ann")]),
        issues(&[finding("K4", "FIXED", "bob")]),
        issues(&[finding("K4", "REOPENED", "cyd")]),
    ));

    let k4 = record(&out, "alpha", "K4");
    assert_eq!(k4.closed_hash.as_deref(), Some("C2"));
    assert_eq!(k4.author_close.as_deref(), Some("bob"));
    assert_eq!(k4.fix_duration, Some(2));
    assert_eq!(out.diagnostics.count(AnomalyKind::UnhandledFindingStatus), 1);
}

// ---------------------------------------------------------------------------
// Edge cases
// ---------------------------------------------------------------------------

#[test]
fn second_fixed_never_overwrites_first() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-02\t{}\nalpha\tC3\t2024-01-08\t{}\n",
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "FIXED", "bob")]),
        issues(&[finding("K", "FIXED", "cyd")]),
    ));

    let k = record(&out, "alpha", "K");
    assert_eq!(k.closed_hash.as_deref(), Some("C2"));
    assert_eq!(k.author_close.as_deref(), Some("bob"));
    assert_eq!(k.fix_duration, Some(1));
}

#[test]
fn open_after_close_still_updates_latest_open() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-02\t{}\nalpha\tC3\t2024-01-03\t{}\nalpha\tC4\t2024-01-04\t[]\n",
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "FIXED", "bob")]),
        issues(&[finding("K", "OPEN", "cyd")]),
    ));

    let k = record(&out, "alpha", "K");
    assert_eq!(k.latest_open_hash.as_deref(), Some("C3"));
    assert_eq!(k.author_latest_open.as_deref(), Some("cyd"));
    assert_eq!(k.closed_hash.as_deref(), Some("C2"));
    assert_eq!(k.next_commit_hash, None, "closed records are not resolved");
}

#[test]
fn first_sighting_as_fixed_is_an_open() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\n",
        issues(&[finding("K", "FIXED", "ann")]),
    ));

    let k = record(&out, "alpha", "K");
    assert_eq!(k.open_hash, "C1");
    assert_eq!(k.closed_date, None);
}

#[test]
fn samples_are_isolated() {
    let out = run(&format!(
        "alpha\tA1\t2024-01-01\t{}\nbeta\tB1\t2024-01-01\t{}\nalpha\tA2\t2024-01-02\t{}\nbeta\tB2\t2024-01-09\t{}\n",
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "FIXED", "bob")]),
        issues(&[finding("K", "OPEN", "ann")]),
    ));

    assert_eq!(out.records.len(), 2);
    let alpha = record(&out, "alpha", "K");
    let beta = record(&out, "beta", "K");
    assert_eq!(alpha.fix_duration, Some(1));
    assert_eq!(beta.closed_date, None);
    assert_eq!(beta.latest_open_hash.as_deref(), Some("B2"));
    assert_eq!(beta.next_commit_hash, None);
}

#[test]
fn zero_total_is_present_and_empty() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-02\t{}\nalpha\tC3\t2024-01-05\t{{\"total\":0,\"issues\":[]}}\n",
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "OPEN", "ann")]),
    ));

    assert_eq!(out.summary.absent_snapshots, 0);
    assert_eq!(record(&out, "alpha", "K").next_commit_hash.as_deref(), Some("C3"));
}

#[test]
fn missing_issues_column_is_absent_but_indexed() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\nalpha\tC2\t2024-01-02\t{}\nalpha\tC3\t2024-01-04\n",
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "OPEN", "ann")]),
    ));

    assert_eq!(out.summary.absent_snapshots, 1);
    assert!(out.diagnostics.is_empty());
    assert_eq!(record(&out, "alpha", "K").next_commit_hash.as_deref(), Some("C3"));
}

#[test]
fn out_of_order_dates_never_yield_negative_durations() {
    let out = run(&format!(
        "alpha\tC1\t2024-02-10\t{}\nalpha\tC2\t2024-02-01\t{}\nbeta\tB1\t2024-02-10\t{}\nbeta\tB2\t2024-02-11\t{}\nbeta\tB3\t2024-01-01\t[]\n",
        issues(&[finding("K", "OPEN", "ann")]),
        issues(&[finding("K", "FIXED", "bob")]),
        issues(&[finding("J", "OPEN", "ann")]),
        issues(&[finding("J", "OPEN", "ann")]),
    ));

    for record in &out.records {
        assert!(record.fix_duration.is_none_or(|d| d >= 0));
    }
    let k = record(&out, "alpha", "K");
    assert_eq!(k.closed_hash.as_deref(), Some("C2"));
    assert_eq!(k.fix_duration, None);
    let j = record(&out, "beta", "J");
    assert_eq!(j.next_commit_hash, None);
    assert_eq!(out.diagnostics.count(AnomalyKind::NegativeDuration), 2);
}

#[test]
fn rejected_rows_do_not_abort_the_run() {
    let out = run(&format!(
        "alpha\tC1\t2024-01-01\t{}\n\tC2\t2024-01-02\t[]\nalpha\tC3\tyesterday\t[]\nonly-two\tfields\nalpha\tC4\t2024-01-04\t[]\n",
        issues(&[finding("K", "OPEN", "ann")]),
    ));

    assert_eq!(out.summary.rejected_rows, 3);
    assert_eq!(out.summary.snapshots, 2);
    assert_eq!(out.records.len(), 1);
}
