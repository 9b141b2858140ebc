//! Fixed-priority assignment
//!
//! Runs exactly once, after all registrations and before any kernel task is
//! created. The single highest level belongs to the monitor; application
//! tasks (polling server included) descend from there.

use cadence_core::{Duration, Priority, SlotIndex};

use crate::registry::Registry;

/// Priority assignment policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Shortest period first
    RateMonotonic,
    /// Shortest relative deadline first
    DeadlineMonotonic,
    /// Use each task's registration-time priority hint unchanged
    Manual,
}

/// Assign fixed priorities to every registered descriptor.
///
/// Under the monotonic policies, descriptors are picked in ascending key
/// order (period or relative deadline). Equal keys share a priority level;
/// each distinct key descends to the next lower level, starting one below
/// the monitor. Double assignment or running out of levels is a logic
/// defect and panics.
pub(crate) fn assign_priorities<const N: usize>(
    registry: &mut Registry<N>,
    policy: Policy,
    monitor_priority: Priority,
) {
    if policy == Policy::Manual {
        for (_, descriptor) in registry.iter_in_use_mut() {
            assert!(!descriptor.priority_assigned, "priority assigned twice");
            let hint = descriptor
                .priority_hint
                .expect("manual policy requires a priority hint");
            assert!(
                hint < monitor_priority,
                "task priority must stay below the monitor"
            );
            descriptor.priority = hint;
            descriptor.priority_assigned = true;
        }
        return;
    }

    let count = registry.active_count();
    let mut level = monitor_priority;
    let mut previous_key: Option<Duration> = None;

    for _ in 0..count {
        let mut shortest = Duration::MAX;
        let mut pick: Option<SlotIndex> = None;

        for (slot, descriptor) in registry.iter_in_use() {
            if descriptor.priority_assigned {
                continue;
            }
            let key = match policy {
                Policy::RateMonotonic => descriptor.period,
                Policy::DeadlineMonotonic => descriptor.relative_deadline,
                Policy::Manual => unreachable!(),
            };
            if key <= shortest {
                shortest = key;
                pick = Some(slot);
            }
        }

        let slot = pick.expect("fewer unassigned descriptors than expected");

        // Equal keys reuse the level; a new key consumes the next one down.
        if previous_key != Some(shortest) {
            level = level
                .next_lower()
                .expect("priority levels exhausted below the monitor");
        }

        let descriptor = registry.slot_mut(slot);
        assert!(!descriptor.priority_assigned, "priority assigned twice");
        descriptor.priority = level;
        descriptor.priority_assigned = true;

        previous_key = Some(shortest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{JobBinding, TaskConfig, TaskDescriptor};

    fn register<const N: usize>(
        registry: &mut Registry<N>,
        name: &'static str,
        period: u32,
        deadline: u32,
    ) -> SlotIndex {
        let config = TaskConfig::new(name, Duration::from_ticks(period))
            .with_deadline(Duration::from_ticks(deadline));
        registry
            .insert(TaskDescriptor::from_config(JobBinding::Unbound, &config, false))
            .unwrap()
    }

    fn priority_of<const N: usize>(registry: &Registry<N>, slot: SlotIndex) -> Priority {
        registry.slot(slot).priority
    }

    #[test]
    fn shorter_period_gets_higher_priority() {
        let mut registry: Registry<4> = Registry::new();
        let slow = register(&mut registry, "slow", 100, 100);
        let fast = register(&mut registry, "fast", 10, 10);
        let mid = register(&mut registry, "mid", 50, 50);

        assign_priorities(&mut registry, Policy::RateMonotonic, Priority::MAX);

        assert!(priority_of(&registry, fast) > priority_of(&registry, mid));
        assert!(priority_of(&registry, mid) > priority_of(&registry, slow));
        assert!(priority_of(&registry, fast) < Priority::MAX);
    }

    #[test]
    fn equal_periods_share_a_level() {
        let mut registry: Registry<4> = Registry::new();
        let a = register(&mut registry, "a", 50, 50);
        let b = register(&mut registry, "b", 50, 50);
        let c = register(&mut registry, "c", 20, 20);

        assign_priorities(&mut registry, Policy::RateMonotonic, Priority::MAX);

        assert_eq!(priority_of(&registry, a), priority_of(&registry, b));
        assert!(priority_of(&registry, c) > priority_of(&registry, a));

        // Only two levels consumed below the monitor.
        assert_eq!(
            priority_of(&registry, c).raw() - priority_of(&registry, a).raw(),
            1
        );
    }

    #[test]
    fn deadline_monotonic_orders_by_deadline() {
        let mut registry: Registry<4> = Registry::new();
        let relaxed = register(&mut registry, "relaxed", 50, 50);
        let tight = register(&mut registry, "tight", 100, 20);

        assign_priorities(&mut registry, Policy::DeadlineMonotonic, Priority::MAX);

        assert!(priority_of(&registry, tight) > priority_of(&registry, relaxed));
    }

    #[test]
    fn manual_policy_uses_hints() {
        let mut registry: Registry<4> = Registry::new();
        let config = TaskConfig::new("hinted", Duration::from_ticks(10))
            .with_priority_hint(Priority::new(5).unwrap());
        let slot = registry
            .insert(TaskDescriptor::from_config(JobBinding::Unbound, &config, false))
            .unwrap();

        assign_priorities(&mut registry, Policy::Manual, Priority::MAX);

        assert_eq!(priority_of(&registry, slot), Priority::new(5).unwrap());
    }
}
