//! Supervisor event-loop tests: cycle finalization, stale replies, restarts, stop races.

use std::net::IpAddr;
use std::time::Duration;
use pingd::monitor::{HostRegistration, SupervisorState};

mod common;
use common::{Harness, WAIT};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[tokio::test]
async fn test_idle_without_reply_records_loss() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();
    let session = h.next_session().await;

    let export = h.cycle(&session, None).await;
    assert_eq!(export.host, "a");
    assert_eq!(export.aggregate.loss, 1);
    assert_eq!(export.aggregate.samples, 1);
    assert!(!export.aggregate.has_data());
}

#[tokio::test]
async fn test_reply_from_unexpected_address_ignored() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();
    let session = h.next_session().await;

    let stranger: IpAddr = "10.9.9.9".parse().unwrap();
    session.reply_from(stranger, ms(3)).await;
    session.idle().await;

    let export = h.next_export().await;
    assert_eq!(export.aggregate.loss, 1);
    assert_eq!(export.aggregate.last, None);
}

#[tokio::test]
async fn test_duplicate_reply_keeps_first() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();
    let session = h.next_session().await;

    session.reply(10).await;
    session.reply(50).await;
    let export = h.cycle(&session, None).await;

    assert_eq!(export.aggregate.samples, 1);
    assert_eq!(export.aggregate.last, Some(ms(10)));
}

#[tokio::test]
async fn test_pending_reply_reset_between_cycles() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();
    let session = h.next_session().await;

    h.cycle(&session, Some(10)).await;
    let export = h.cycle(&session, None).await;

    assert_eq!(export.aggregate.loss, 1);
    assert_eq!(export.aggregate.samples, 2);
    assert_eq!(export.aggregate.last, Some(ms(10)));
}

#[tokio::test]
async fn test_zero_rtt_is_a_reply() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("lo", "127.0.0.1")).await.unwrap();
    let session = h.next_session().await;

    let export = h.cycle(&session, Some(0)).await;
    assert_eq!(export.aggregate.loss, 0);
    assert_eq!(export.aggregate.last, Some(Duration::ZERO));
    assert!(export.aggregate.has_data());
}

#[tokio::test]
async fn test_window_overwrite_through_supervisor() {
    let mut h = Harness::with_capacity(3);
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();
    let session = h.next_session().await;

    for rtt in [1000, 10, 20, 30] {
        h.cycle(&session, Some(rtt)).await;
    }

    let snapshot = h.registry.get("a").await.unwrap();
    assert_eq!(snapshot.stats.samples, 3);
    assert_eq!(snapshot.stats.max, Some(ms(30)));
    assert_eq!(snapshot.stats.avg, Some(ms(20)));
}

#[tokio::test]
async fn test_transport_error_abandons_cycle_and_restarts() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();
    let first = h.next_session().await;

    first.reply(10).await;
    first.fail("network unreachable").await;
    tokio::time::timeout(WAIT, first.closed()).await.unwrap();

    let second = h.next_session().await;
    assert_eq!(second.target, first.target);
    assert_eq!(h.registry.supervisor_state("a").await, Some(SupervisorState::Running));

    // nothing from the abandoned cycle was written
    assert_eq!(h.registry.get("a").await.unwrap().stats.samples, 0);

    let export = h.cycle(&second, Some(12)).await;
    assert_eq!(export.aggregate.samples, 1);
    assert_eq!(export.aggregate.last, Some(ms(12)));
}

#[tokio::test]
async fn test_transport_hangup_restarts_session() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();
    let first = h.next_session().await;
    drop(first);

    let second = h.next_session().await;
    h.cycle(&second, Some(4)).await;
}

#[tokio::test]
async fn test_failed_open_is_retried() {
    let mut h = Harness::new();
    h.transport.fail_next_opens(2);
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();

    let session = h.next_session().await;
    assert_eq!(h.transport.opens(), 3);
    h.cycle(&session, Some(8)).await;
}

#[tokio::test]
async fn test_failing_host_does_not_affect_others() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("bad", "10.0.0.1")).await.unwrap();
    let bad = h.next_session().await;
    h.registry.add(HostRegistration::with_id("good", "10.0.0.2")).await.unwrap();
    let good = h.next_session().await;

    bad.fail("boom").await;
    let export = h.cycle(&good, Some(3)).await;
    assert_eq!(export.host, "good");

    // the failed host reopens on its own
    let reopened = h.next_session().await;
    assert_eq!(reopened.target, bad.target);
}

#[tokio::test]
async fn test_no_write_after_remove_with_reply_in_flight() {
    let mut h = Harness::new();
    h.registry.add(HostRegistration::with_id("B", "10.0.0.2")).await.unwrap();
    let session = h.next_session().await;
    h.cycle(&session, Some(9)).await;

    // reply pending, then the host goes away before the cycle closes
    session.reply(11).await;
    let status = h.registry.remove("B").await.unwrap();
    session.idle().await;

    tokio::time::timeout(WAIT, status.clone().wait_stopped()).await.unwrap();
    assert_eq!(status.current(), SupervisorState::Stopped);
    assert!(h.exports.try_recv().is_err(), "outcome exported after stop");
    assert!(session.is_closed());
}

#[tokio::test]
async fn test_remove_during_restart_backoff() {
    let h = Harness::new();
    h.transport.fail_next_opens(usize::MAX);
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();

    tokio::time::sleep(ms(30)).await;
    let status = h.registry.remove("a").await.unwrap();
    tokio::time::timeout(WAIT, status.clone().wait_stopped()).await.unwrap();
    assert_eq!(status.current(), SupervisorState::Stopped);
}

#[tokio::test]
async fn test_remove_while_open_pending() {
    let h = Harness::new();
    h.transport.stall_next_opens(1);
    h.registry.add(HostRegistration::with_id("a", "10.0.0.1")).await.unwrap();

    while h.transport.opens() == 0 {
        tokio::task::yield_now().await;
    }
    let status = h.registry.remove("a").await.unwrap();
    tokio::time::timeout(WAIT, status.clone().wait_stopped()).await.unwrap();
    assert_eq!(status.current(), SupervisorState::Stopped);
    assert_eq!(h.transport.opens(), 1);
}
