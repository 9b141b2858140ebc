//! Priority tests for cadence-core

use cadence_core::Priority;

#[test]
fn test_priority_zero_rejected() {
    assert!(Priority::new(0).is_none());
    assert!(Priority::new(1).is_some());
}

#[test]
fn test_priority_ordering() {
    let low = Priority::new(3).unwrap();
    let high = Priority::new(7).unwrap();
    assert!(high > low);
}

#[test]
fn test_next_lower_stops_at_min() {
    let p = Priority::new(2).unwrap();
    assert_eq!(p.next_lower(), Priority::new(1));
    assert_eq!(Priority::MIN.next_lower(), None);
}

#[test]
fn test_constants() {
    assert_eq!(Priority::MIN.raw(), 1);
    assert!(Priority::MAX.raw() > Priority::MIN.raw());
}
