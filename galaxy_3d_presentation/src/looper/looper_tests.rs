use super::*;
use std::sync::Arc;
use std::time::Duration;
use crate::clock::ManualClock;
use crate::frame::FrameId;

fn create_looper() -> (Looper, ManualClock) {
    let clock = ManualClock::new(1_000);
    let looper = Looper::new(Arc::new(clock.clone()));
    (looper, clock)
}

// ============================================================================
// Channel tests
// ============================================================================

#[test]
fn test_empty_loop_has_no_event() {
    let (mut looper, _clock) = create_looper();
    assert!(looper.next_event().is_none());
}

#[test]
fn test_events_are_delivered_in_post_order() {
    let (mut looper, _clock) = create_looper();
    looper.post(EngineEvent::DisplayLink);
    looper.post(EngineEvent::End);

    assert!(matches!(looper.next_event(), Some(EngineEvent::DisplayLink)));
    assert!(matches!(looper.next_event(), Some(EngineEvent::End)));
    assert!(looper.next_event().is_none());
}

#[test]
fn test_proxy_posts_from_other_thread() {
    let (mut looper, _clock) = create_looper();
    let proxy = looper.proxy();

    std::thread::spawn(move || {
        assert!(proxy.post(EngineEvent::ReadyForNextFrame));
    })
    .join()
    .unwrap();

    assert!(matches!(
        looper.wait_event(Duration::from_millis(100)),
        Some(EngineEvent::ReadyForNextFrame)
    ));
}

#[test]
fn test_proxy_fails_after_loop_dropped() {
    let (looper, _clock) = create_looper();
    let proxy = looper.proxy();
    drop(looper);
    assert!(!proxy.post(EngineEvent::End));
}

// ============================================================================
// Timer tests
// ============================================================================

#[test]
fn test_one_shot_timer_fires_once_when_due() {
    let (mut looper, clock) = create_looper();
    let id = looper.schedule(500, TimerKind::AcquireRetry);

    assert!(looper.next_event().is_none());
    clock.advance(499);
    assert!(looper.next_event().is_none());
    clock.advance(1);

    match looper.next_event() {
        Some(EngineEvent::Timer { id: fired, kind }) => {
            assert_eq!(fired, id);
            assert_eq!(kind, TimerKind::AcquireRetry);
        }
        other => panic!("expected timer, got {:?}", other),
    }

    clock.advance(10_000);
    assert!(looper.next_event().is_none());
    assert!(!looper.is_scheduled(id));
}

#[test]
fn test_periodic_timer_rearms() {
    let (mut looper, clock) = create_looper();
    let id = looper.schedule_periodic(100, TimerKind::AcquireRetry);

    for _ in 0..3 {
        clock.advance(100);
        assert!(matches!(looper.next_event(), Some(EngineEvent::Timer { .. })));
        assert!(looper.next_event().is_none());
    }
    assert!(looper.is_scheduled(id));
}

#[test]
fn test_cancelled_timer_never_fires() {
    let (mut looper, clock) = create_looper();
    let id = looper.schedule_periodic(100, TimerKind::AcquireRetry);

    assert!(looper.cancel(id));
    assert!(!looper.cancel(id));
    clock.advance(1_000);
    assert!(looper.next_event().is_none());
    assert_eq!(looper.timer_count(), 0);
}

#[test]
fn test_timers_fire_in_deadline_order() {
    let (mut looper, clock) = create_looper();
    let frame = FrameId::default();
    let late = looper.schedule(300, TimerKind::AcquireRetry);
    let early = looper.schedule(100, TimerKind::ScheduledPresent(frame));

    clock.advance(300);

    let first = looper.next_event();
    let second = looper.next_event();
    assert!(matches!(first, Some(EngineEvent::Timer { id, .. }) if id == early));
    assert!(matches!(second, Some(EngineEvent::Timer { id, .. }) if id == late));
}

#[test]
fn test_due_timer_precedes_queued_message() {
    let (mut looper, clock) = create_looper();
    looper.post(EngineEvent::DisplayLink);
    looper.schedule(10, TimerKind::AcquireRetry);
    clock.advance(10);

    assert!(matches!(looper.next_event(), Some(EngineEvent::Timer { .. })));
    assert!(matches!(looper.next_event(), Some(EngineEvent::DisplayLink)));
}

#[test]
fn test_wait_event_times_out_without_events() {
    let (mut looper, _clock) = create_looper();
    looper.schedule(1_000_000, TimerKind::AcquireRetry);
    assert!(looper.wait_event(Duration::from_millis(5)).is_none());
}
