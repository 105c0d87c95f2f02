mod common;

use common::{
    init_test_logging, lines, RecordingSink, ScriptedOpener, ScriptedOperator, FOUR_LANE_BANNER,
    TWO_LANE_BANNER,
};
use lanejudge_core::demo::SimulatedOpener;
use lanejudge_core::history::HistoryEntry;
use lanejudge_core::protocol::{LaneCount, ProtocolError};
use lanejudge_core::session::{RaceOutcome, SessionLoop, SessionOptions, SessionSummary};
use pretty_assertions::assert_eq;
use std::io;

const RACE_LINE: &str = "1 3.2001 2 3.5512 3 0.0000 4 4.0012";

#[test]
fn test_races_survive_link_failure() {
    init_test_logging();
    let mut first_link = lines(&[FOUR_LANE_BANNER, RACE_LINE, RACE_LINE]);
    first_link.push(Err(ProtocolError::IoError(io::Error::new(
        io::ErrorKind::BrokenPipe,
        "cable pulled",
    ))));
    let opener = ScriptedOpener::new(vec![Some(first_link), Some(lines(&[FOUR_LANE_BANNER]))]);
    let operator = ScriptedOperator::continuing(&[true, true, false]);

    let mut judge = SessionLoop::new(
        opener,
        operator,
        RecordingSink::default(),
        SessionOptions::default(),
    );
    let session = judge.establish().unwrap();
    assert_eq!(session.lanes, LaneCount::Four);

    let summary = judge.run(session).unwrap();

    // Decoding stops at lane 3's zero time, so lane 4 stays unset
    let expected = vec![3.2001, 3.5512, 0.0, 0.0];
    assert_eq!(
        summary,
        SessionSummary {
            races: 2,
            null_races: 0,
            recoveries: 1,
        }
    );
    assert_eq!(judge.sink().winners, vec![1, 1]);
    assert_eq!(judge.sink().times, vec![expected.clone(), expected.clone()]);
    assert_eq!(
        judge.history().iter_recent().cloned().collect::<Vec<_>>(),
        vec![HistoryEntry::new(expected.clone()), HistoryEntry::new(expected)]
    );
    assert_eq!(judge.opener().opens, 2);
    // Rearmed after each of the first two runs, not after stopping
    assert_eq!(*judge.opener().written.borrow(), b"  ".to_vec());
}

#[test]
fn test_null_race_leaves_history_alone() {
    init_test_logging();
    let opener = ScriptedOpener::new(vec![Some(lines(&[
        TWO_LANE_BANNER,
        "1 0.0000 2 0.0000",
        "2 3.1000 1 3.4000",
    ]))]);
    let operator = ScriptedOperator::continuing(&[true, false]);

    let mut judge = SessionLoop::new(
        opener,
        operator,
        RecordingSink::default(),
        SessionOptions::dry_run(),
    );
    let session = judge.establish().unwrap();
    let summary = judge.run(session).unwrap();

    assert_eq!(summary.races, 1);
    assert_eq!(summary.null_races, 1);
    assert_eq!(judge.sink().winners, vec![2]);
    assert_eq!(judge.sink().snapshots.len(), 1);
    assert_eq!(judge.history().len(), 1);
    // Dry run never rearms
    assert!(judge.opener().written.borrow().is_empty());
}

#[test]
fn test_history_snapshot_after_each_race() {
    init_test_logging();
    let opener = ScriptedOpener::new(vec![Some(lines(&[
        TWO_LANE_BANNER,
        "1 3.0000 2 3.1000",
        "2 2.9000 1 3.3000",
    ]))]);
    let operator = ScriptedOperator::continuing(&[true, false]);

    let mut judge = SessionLoop::new(
        opener,
        operator,
        RecordingSink::default(),
        SessionOptions::default(),
    );
    let session = judge.establish().unwrap();
    judge.run(session).unwrap();

    let snapshots = &judge.sink().snapshots;
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0], vec![HistoryEntry::new(vec![3.0, 3.1])]);
    assert_eq!(
        snapshots[1],
        vec![
            HistoryEntry::new(vec![3.3, 2.9]),
            HistoryEntry::new(vec![3.0, 3.1]),
        ]
    );
}

#[test]
fn test_fetch_race_classifies_outcomes() {
    init_test_logging();
    let opener = ScriptedOpener::new(vec![Some(lines(&[
        FOUR_LANE_BANNER,
        "3 3.5000 1 3.6000 2 0.0000",
        "1 0.0000 2 0.0000 3 0.0000 4 0.0000",
        "9 3.0000",
    ]))]);
    let mut judge = SessionLoop::new(
        opener,
        ScriptedOperator::default(),
        RecordingSink::default(),
        SessionOptions::default(),
    );
    let mut session = judge.establish().unwrap();

    match judge.fetch_race(&mut session).unwrap() {
        RaceOutcome::Finished(result) => {
            assert_eq!(result.winning_lane, 3);
            assert_eq!(result.times, vec![3.6, 0.0, 3.5, 0.0]);
        }
        other => panic!("expected a finished race, got {other:?}"),
    }
    assert!(matches!(judge.fetch_race(&mut session).unwrap(), RaceOutcome::Null));
    assert!(matches!(
        judge.fetch_race(&mut session).unwrap(),
        RaceOutcome::LinkFailure(ProtocolError::MalformedResult(_))
    ));
    assert!(matches!(
        judge.fetch_race(&mut session).unwrap(),
        RaceOutcome::LinkFailure(ProtocolError::EndOfStream)
    ));
}

#[test]
fn test_startup_rejects_unparseable_banner() {
    init_test_logging();
    let opener = ScriptedOpener::new(vec![Some(lines(&["no digits here"]))]);
    let mut judge = SessionLoop::new(
        opener,
        ScriptedOperator::default(),
        RecordingSink::default(),
        SessionOptions::default(),
    );

    let err = judge.establish().err().unwrap();
    assert!(matches!(err, ProtocolError::UnparseableBanner(ref text) if text == "no digits here"));
    assert_eq!(judge.opener().closed_links(), 1);
}

#[test]
fn test_startup_open_failure() {
    init_test_logging();
    let opener = ScriptedOpener::new(vec![None]);
    let mut judge = SessionLoop::new(
        opener,
        ScriptedOperator::default(),
        RecordingSink::default(),
        SessionOptions::default(),
    );

    assert!(matches!(
        judge.establish(),
        Err(ProtocolError::OpenFailed { .. })
    ));
}

#[test]
fn test_console_failure_ends_session() {
    init_test_logging();
    let opener = ScriptedOpener::new(vec![Some(lines(&[TWO_LANE_BANNER, "1 3.0000 2 3.1000"]))]);
    let mut judge = SessionLoop::new(
        opener,
        ScriptedOperator::default(),
        RecordingSink::default(),
        SessionOptions::default(),
    );
    let mut session = judge.establish().unwrap();
    judge.operator_mut().mute = true;

    assert!(matches!(
        judge.fetch_race(&mut session),
        Err(ProtocolError::OperatorClosed)
    ));
}

#[test]
fn test_simulated_timer_needs_rearm() {
    init_test_logging();
    let opener = SimulatedOpener::new(LaneCount::Eight).with_seed(11);
    let operator = ScriptedOperator::continuing(&[true, true, true, false]);
    let mut judge = SessionLoop::new(
        opener,
        operator,
        RecordingSink::default(),
        SessionOptions::default(),
    );
    let session = judge.establish().unwrap();
    assert_eq!(session.lanes, LaneCount::Eight);

    let summary = judge.run(session).unwrap();
    assert_eq!(summary.races + summary.null_races, 4);
    assert_eq!(summary.recoveries, 0);
}

#[test]
fn test_simulated_timer_without_rearm_fails_over() {
    init_test_logging();
    let opener = SimulatedOpener::new(LaneCount::Two).with_seed(5);
    let operator = ScriptedOperator::continuing(&[true, false]);
    let mut judge = SessionLoop::new(
        opener,
        operator,
        RecordingSink::default(),
        SessionOptions::dry_run(),
    );
    let session = judge.establish().unwrap();

    let summary = judge.run(session).unwrap();
    assert_eq!(summary.races + summary.null_races, 1);
    assert_eq!(summary.recoveries, 1);
}
