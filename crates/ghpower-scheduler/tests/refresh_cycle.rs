mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{cached, harness, wait_idle, ScriptedFetcher};
use ghpower_core::config::{RefreshMode, SchedulerConfig};
use ghpower_core::Username;
use ghpower_leaderboard::Metric;
use ghpower_store::ProfileStore;
use tokio::sync::Semaphore;

fn config(batch_size: usize, delay_secs: u64) -> SchedulerConfig {
    SchedulerConfig {
        update_interval_secs: 60,
        batch_size,
        batch_delay_secs: delay_secs,
        refresh_mode: RefreshMode::All,
        max_age_minutes: 30,
        autostart: false,
    }
}

#[tokio::test(start_paused = true)]
async fn batches_are_separated_by_the_configured_delay() {
    let h = harness(
        config(2, 2),
        vec![
            cached("u1", 60),
            cached("u2", 60),
            cached("u3", 60),
            cached("u4", 60),
            cached("u5", 60),
        ],
        ScriptedFetcher::new(),
    );

    let start = tokio::time::Instant::now();
    let report = h.scheduler.run_cycle().await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.candidates, 5);
    assert_eq!(report.batches, 3);
    assert_eq!(report.refreshed, 5);

    let offsets: Vec<(String, u64)> = h
        .fetcher
        .calls()
        .into_iter()
        .map(|(login, at)| (login, (at - start).as_secs()))
        .collect();
    assert_eq!(
        offsets,
        vec![
            ("u1".to_string(), 0),
            ("u2".to_string(), 0),
            ("u3".to_string(), 2),
            ("u4".to_string(), 2),
            ("u5".to_string(), 4),
        ]
    );
    // no delay after the final batch
    assert_eq!(elapsed, Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn one_failing_user_does_not_abort_the_batch() {
    let h = harness(
        config(5, 0),
        vec![cached("alpha", 60), cached("broken", 60), cached("gamma", 60)],
        ScriptedFetcher::new().failing(&["broken"]),
    );
    let before = h
        .store
        .get(&Username::parse("broken").unwrap())
        .unwrap()
        .unwrap();

    let report = h.scheduler.run_cycle().await.unwrap();
    assert_eq!(report.refreshed, 2);
    assert_eq!(report.preserved, 1);
    assert_eq!(report.failed, 0);

    let after = h.store.get(&before.username).unwrap().unwrap();
    assert_eq!(after.profile, before.profile);
    assert!(after.fetch_failed);
    assert_eq!(after.refresh_count, 2);

    // boards were recomputed with every user, the preserved one included
    let board = h.leaderboard.get(Metric::Stars, None);
    let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
    assert_eq!(names, vec!["alpha", "gamma", "broken"]);
}

#[tokio::test]
async fn concurrent_triggers_start_a_single_cycle() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        config(5, 0),
        vec![cached("alpha", 60), cached("beta", 60)],
        ScriptedFetcher::new().gated(gate.clone()),
    );

    assert!(h.scheduler.trigger_update());
    assert!(!h.scheduler.trigger_update());
    assert!(h.scheduler.run_cycle().await.is_none());
    assert!(h.scheduler.status().is_updating);

    gate.add_permits(2);
    wait_idle(&h.scheduler).await;

    assert_eq!(h.fetcher.call_count(), 2);
    let report = h.scheduler.last_report().unwrap();
    assert_eq!(report.refreshed, 2);

    // guard released: a new trigger is accepted
    gate.add_permits(2);
    assert!(h.scheduler.trigger_update());
    wait_idle(&h.scheduler).await;
    assert_eq!(h.fetcher.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn start_then_immediate_stop_runs_no_cycle() {
    let h = harness(config(5, 0), vec![cached("alpha", 60)], ScriptedFetcher::new());

    assert!(h.scheduler.start());
    assert!(h.scheduler.stop());
    tokio::time::sleep(Duration::from_secs(600)).await;

    assert_eq!(h.fetcher.call_count(), 0);
    assert!(h.scheduler.last_report().is_none());
    assert!(!h.scheduler.status().is_running);
}

#[tokio::test(start_paused = true)]
async fn timer_runs_a_cycle_after_each_interval() {
    let h = harness(config(5, 0), vec![cached("alpha", 60)], ScriptedFetcher::new());

    assert!(h.scheduler.start());
    tokio::time::sleep(Duration::from_secs(59)).await;
    assert_eq!(h.fetcher.call_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.fetcher.call_count(), 1);
    assert!(h.scheduler.last_report().is_some());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.fetcher.call_count(), 2);

    let status = h.scheduler.status();
    assert!(status.is_running);
    assert!(!status.is_updating);
    assert!(status.next_update_in.is_some());

    h.scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_lets_the_running_cycle_finish() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        config(5, 0),
        vec![cached("alpha", 60)],
        ScriptedFetcher::new().gated(gate.clone()),
    );

    assert!(h.scheduler.start());
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(h.scheduler.status().is_updating);

    assert!(h.scheduler.stop());
    let status = h.scheduler.status();
    assert!(!status.is_running);
    assert!(status.is_updating);

    gate.add_permits(1);
    wait_idle(&h.scheduler).await;
    assert_eq!(h.scheduler.last_report().unwrap().refreshed, 1);

    // stopped: no further ticks
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(h.fetcher.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn trigger_works_while_stopped() {
    let h = harness(config(5, 0), vec![cached("alpha", 60)], ScriptedFetcher::new());
    assert!(!h.scheduler.status().is_running);

    assert!(h.scheduler.trigger_update());
    wait_idle(&h.scheduler).await;

    assert_eq!(h.fetcher.call_count(), 1);
    assert!(!h.scheduler.status().is_running);
}

#[tokio::test(start_paused = true)]
async fn stale_mode_only_refreshes_old_profiles() {
    let mut cfg = config(5, 0);
    cfg.refresh_mode = RefreshMode::Stale;
    let h = harness(
        cfg,
        vec![cached("fresh", 29), cached("stale", 31)],
        ScriptedFetcher::new(),
    );

    let report = h.scheduler.run_cycle().await.unwrap();
    assert_eq!(report.candidates, 1);
    let calls: Vec<String> = h.fetcher.calls().into_iter().map(|(l, _)| l).collect();
    assert_eq!(calls, vec!["stale"]);
}

#[tokio::test]
async fn overlapping_refreshes_of_one_user_are_serialized() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        config(5, 0),
        vec![cached("alpha", 60)],
        ScriptedFetcher::new().gated(gate.clone()),
    );
    let alpha = Username::parse("alpha").unwrap();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let pipeline = h.scheduler.pipeline().clone();
            let username = alpha.clone();
            tokio::spawn(async move { pipeline.refresh(&username).await })
        })
        .collect();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    // the second refresh has not fetched yet: it waits for the first write
    assert_eq!(h.fetcher.call_count(), 1);

    gate.add_permits(2);
    for task in tasks {
        assert!(task.await.unwrap().is_success());
    }
    assert_eq!(h.fetcher.call_count(), 2);
    assert_eq!(h.store.get(&alpha).unwrap().unwrap().refresh_count, 3);
}

#[tokio::test(start_paused = true)]
async fn timer_tick_during_a_running_cycle_is_dropped() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        config(5, 0),
        vec![cached("alpha", 60)],
        ScriptedFetcher::new().gated(gate.clone()),
    );

    assert!(h.scheduler.start());
    assert!(h.scheduler.trigger_update());

    // the manual cycle is still blocked when the timer fires at 60s
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(h.scheduler.status().is_updating);
    assert_eq!(h.fetcher.call_count(), 1);
    assert!(h.scheduler.last_report().is_none());

    gate.add_permits(1);
    wait_idle(&h.scheduler).await;
    let first = h.scheduler.last_report().unwrap();
    assert_eq!(first.candidates, 1);
    assert_eq!(first.refreshed, 1);
    assert_eq!(h.fetcher.call_count(), 1);

    // the timer survives the dropped tick and fires again at 120s
    gate.add_permits(1);
    tokio::time::sleep(Duration::from_secs(60)).await;
    wait_idle(&h.scheduler).await;
    assert_eq!(h.fetcher.call_count(), 2);
    assert_ne!(h.scheduler.last_report().unwrap().cycle_id, first.cycle_id);

    h.scheduler.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn restart_during_a_timer_cycle_keeps_the_new_schedule() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(
        config(5, 0),
        vec![cached("alpha", 60)],
        ScriptedFetcher::new().gated(gate.clone()),
    );

    assert!(h.scheduler.start());
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(h.scheduler.status().is_updating);

    assert!(h.scheduler.stop());
    assert!(h.scheduler.start());
    let scheduled = h.scheduler.status().next_update_at;
    assert!(scheduled.is_some());

    // the old timer's cycle ends after the restart
    gate.add_permits(1);
    wait_idle(&h.scheduler).await;
    let status = h.scheduler.status();
    assert!(status.is_running);
    assert_eq!(status.next_update_at, scheduled);

    h.scheduler.shutdown().await;
}
