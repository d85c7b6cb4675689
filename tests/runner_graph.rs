mod common;
use crate::common::fake_executor::{position, started, ExecEvent, FakeExecutor, RecordingNotifier};
use crate::common::{init_tracing, mock_fs, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tokio::sync::mpsc;
use tokio::time::sleep;

use sitepipe::engine::{Runner, WatchSetup};
use sitepipe::graph::TaskGraph;
use sitepipe::reload::ReloadHub;
use sitepipe::watch::WatchRule;

fn t(name: &str) -> TaskGraph {
    TaskGraph::task(name)
}

#[tokio::test]
async fn series_runs_in_order() {
    init_tracing();

    let exec = FakeExecutor::new().delay("a", Duration::from_millis(20));
    let events = exec.events_handle();
    let runner = Runner::new(exec);

    with_timeout(runner.run(&TaskGraph::series([t("a"), t("b"), t("c")])))
        .await
        .expect("series should succeed");

    let events = events.lock().unwrap().clone();
    assert_eq!(started(&events), vec!["a", "b", "c"]);
    let a_done = position(&events, &ExecEvent::Finished("a".into())).unwrap();
    let b_start = position(&events, &ExecEvent::Started("b".into())).unwrap();
    assert!(a_done < b_start, "b started before a finished: {events:?}");
}

#[tokio::test]
async fn series_stops_at_first_failure() {
    init_tracing();

    let exec = FakeExecutor::new().fail("b");
    let events = exec.events_handle();
    let runner = Runner::new(exec);

    let failure = with_timeout(runner.run(&TaskGraph::series([t("a"), t("b"), t("c")])))
        .await
        .unwrap_err();

    assert_eq!(failure.task, "b");
    assert!(failure.error.is_transform());
    let events = events.lock().unwrap().clone();
    assert_eq!(started(&events), vec!["a", "b"]);
}

#[tokio::test]
async fn parallel_children_overlap() {
    init_tracing();

    let exec = FakeExecutor::new()
        .delay("a", Duration::from_millis(100))
        .delay("b", Duration::from_millis(100));
    let events = exec.events_handle();
    let runner = Runner::new(exec);

    with_timeout(runner.run(&TaskGraph::parallel([t("a"), t("b")])))
        .await
        .expect("parallel should succeed");

    let events = events.lock().unwrap().clone();
    let a_done = position(&events, &ExecEvent::Finished("a".into())).unwrap();
    let b_done = position(&events, &ExecEvent::Finished("b".into())).unwrap();
    let a_start = position(&events, &ExecEvent::Started("a".into())).unwrap();
    let b_start = position(&events, &ExecEvent::Started("b".into())).unwrap();
    // Both started before either finished.
    assert!(a_start < a_done.min(b_done));
    assert!(b_start < a_done.min(b_done));
}

#[tokio::test]
async fn parallel_waits_for_siblings_then_fails() {
    init_tracing();

    let exec = FakeExecutor::new()
        .fail("a")
        .delay("b", Duration::from_millis(50));
    let events = exec.events_handle();
    let runner = Runner::new(exec);

    let graph = TaskGraph::series([TaskGraph::parallel([t("a"), t("b")]), t("after")]);
    let failure = with_timeout(runner.run(&graph)).await.unwrap_err();

    assert_eq!(failure.task, "a");
    let events = events.lock().unwrap().clone();
    assert!(events.contains(&ExecEvent::Finished("b".into())));
    assert!(!started(&events).contains(&"after".to_string()));
}

#[tokio::test]
async fn failures_are_notified_unless_silenced() {
    init_tracing();

    let notifier = RecordingNotifier::new();
    let exec = FakeExecutor::new().fail("loud").fail("quiet").silent("quiet");
    let runner = Runner::with_parts(exec, Arc::new(notifier.clone()), ReloadHub::default(), None);

    let _ = runner.run(&TaskGraph::parallel([t("loud"), t("quiet")])).await;

    let seen = notifier.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "loud");
    assert!(seen[0].1.contains("simulated failure"));
}

#[tokio::test]
async fn successful_tasks_publish_reload_signals() {
    init_tracing();

    let runner = Runner::new(FakeExecutor::new());
    let mut rx = runner.reload_hub().subscribe();

    runner.run(&t("styles")).await.expect("task succeeds");

    let signal = rx.try_recv().expect("reload signal published");
    assert_eq!(signal.task, "styles");
    assert_eq!(signal.files.len(), 1);
}

#[tokio::test]
async fn watch_leaf_without_setup_fails() {
    init_tracing();

    let runner = Runner::new(FakeExecutor::new());
    let failure = runner
        .run(&TaskGraph::Watch("watch".to_string()))
        .await
        .unwrap_err();
    assert_eq!(failure.task, "watch");
}

fn styles_watch() -> (WatchSetup, mpsc::UnboundedSender<Vec<PathBuf>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let rules = vec![WatchRule::new("styles", &["scss/**/*.scss".to_string()], &[], false).unwrap()];
    let setup = WatchSetup::new("src", rules, Duration::from_millis(10), Arc::new(mock_fs(&[])))
        .with_change_source(rx);
    (setup, tx)
}

#[tokio::test]
async fn transform_failure_before_watch_keeps_session_alive() {
    init_tracing();

    let exec = FakeExecutor::new().fail("styles");
    let events = exec.events_handle();
    let notifier = RecordingNotifier::new();
    let (setup, tx) = styles_watch();
    let runner = Runner::with_parts(exec, Arc::new(notifier.clone()), ReloadHub::default(), Some(setup));

    let graph = TaskGraph::series([t("styles"), TaskGraph::Watch("watch".to_string())]);
    let session = tokio::spawn(async move { runner.run(&graph).await });

    sleep(Duration::from_millis(50)).await;
    tx.send(vec![PathBuf::from("src/scss/main.scss")]).unwrap();
    sleep(Duration::from_millis(100)).await;
    drop(tx);

    with_timeout(session)
        .await
        .expect("session task joins")
        .expect("transform failures do not end an interactive session");
    assert_eq!(started(&events.lock().unwrap()), vec!["styles", "styles"]);
    assert_eq!(notifier.seen().len(), 2);
}

#[tokio::test]
async fn connection_failure_before_watch_is_fatal() {
    init_tracing();

    let exec = FakeExecutor::new().fail_connection("upload");
    let events = exec.events_handle();
    let (setup, _tx) = styles_watch();
    let runner = Runner::with_parts(exec, Arc::new(RecordingNotifier::new()), ReloadHub::default(), Some(setup));

    let graph = TaskGraph::series([t("upload"), TaskGraph::Watch("watch".to_string())]);
    let failure = with_timeout(runner.run(&graph)).await.unwrap_err();

    assert_eq!(failure.task, "upload");
    assert!(!failure.error.is_transform());
    assert_eq!(started(&events.lock().unwrap()), vec!["upload"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// In a series, exactly the tasks up to and including the first failing
    /// one run.
    #[test]
    fn series_runs_prefix_up_to_first_failure(
        len in 1usize..8,
        failing in proptest::collection::vec(any::<bool>(), 8),
    ) {
        let names: Vec<String> = (0..len).map(|i| format!("task_{i}")).collect();
        let mut exec = FakeExecutor::new();
        for (i, name) in names.iter().enumerate() {
            if failing[i] {
                exec = exec.fail(name);
            }
        }
        let events = exec.events_handle();
        let runner = Runner::new(exec);
        let graph = TaskGraph::series(names.iter().map(|n| TaskGraph::task(n.as_str())));

        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let result = rt.block_on(runner.run(&graph));

        let first_fail = (0..len).find(|&i| failing[i]);
        let expected_len = first_fail.map_or(len, |i| i + 1);
        let ran = started(&events.lock().unwrap());
        prop_assert_eq!(ran, names[..expected_len].to_vec());
        match first_fail {
            Some(i) => prop_assert_eq!(result.unwrap_err().task, names[i].clone()),
            None => prop_assert!(result.is_ok()),
        }
    }
}
