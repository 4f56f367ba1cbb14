//! Streak milestone gate.
//!
//! Only significant streak lengths produce a notification; ordinary
//! day-to-day increments stay silent.

/// Streak lengths worth congratulating.
pub const MILESTONES: [u32; 11] = [3, 5, 7, 10, 14, 21, 30, 50, 100, 200, 365];

/// Whether a streak of `count` deserves a notification.
pub fn should_notify(count: u32) -> bool {
    MILESTONES.contains(&count)
}

/// The next milestone strictly above `count`, if any.
pub fn next_milestone(count: u32) -> Option<u32> {
    MILESTONES.iter().copied().find(|&m| m > count)
}
