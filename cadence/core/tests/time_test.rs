//! Time arithmetic tests for cadence-core

use cadence_core::{Duration, Instant};

#[test]
fn test_instant_add_duration() {
    let t = Instant::from_ticks(100) + Duration::from_ticks(50);
    assert_eq!(t, Instant::from_ticks(150));
}

#[test]
fn test_instant_add_assign() {
    let mut t = Instant::from_ticks(10);
    t += Duration::from_ticks(5);
    assert_eq!(t.ticks(), 15);
}

#[test]
fn test_elapsed_since() {
    let earlier = Instant::from_ticks(200);
    let later = Instant::from_ticks(350);
    assert_eq!(later.elapsed_since(earlier), Duration::from_ticks(150));
}

#[test]
fn test_ordering_across_wraparound() {
    let before = Instant::from_ticks(u32::MAX - 10);
    let after = before + Duration::from_ticks(20);

    assert!(after.is_after(before));
    assert!(after.is_at_or_after(before));
    assert!(!before.is_at_or_after(after));
    assert_eq!(after.elapsed_since(before), Duration::from_ticks(20));
}

#[test]
fn test_duration_saturating_add() {
    let d = Duration::MAX + Duration::from_ticks(1);
    assert_eq!(d, Duration::MAX);
}

#[test]
fn test_duration_is_zero() {
    assert!(Duration::ZERO.is_zero());
    assert!(!Duration::TICK.is_zero());
}
