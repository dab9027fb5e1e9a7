//! Countdown Notifier
//!
//! Works out when "time remaining" reminders fire for a phase and renders
//! them. Firing is driven by the engine through the scheduler; this module
//! is pure arithmetic.

use super::duration::format_remaining;
use super::error::PhaseKind;
use std::time::Duration;

/// Upper bound on countdown points for a long phase
pub const MAX_STEPS: u32 = 100;

/// How long before the deadline the final warning fires
pub const FINAL_WARNING_LEAD: Duration = Duration::from_secs(60);

/// Reminder offsets (from phase start) for a phase of length `total`.
///
/// Phases longer than `threshold` get `steps - 1` evenly spaced reminders
/// (the last point is the deadline itself). Shorter phases get a single
/// reminder when a tenth of the time is left. Offsets are strictly
/// increasing, non-zero and below `total`.
pub fn reminder_offsets(total: Duration, threshold: Duration, steps: u32) -> Vec<Duration> {
    let total_ms = total.as_millis();
    let mut offsets: Vec<u128> = if total > threshold {
        let steps = u128::from(steps.clamp(2, MAX_STEPS));
        (1..steps).map(|k| total_ms * k / steps).collect()
    } else {
        vec![total_ms - total_ms / 10]
    };
    offsets.retain(|ms| *ms > 0 && *ms < total_ms);
    offsets.dedup();
    offsets
        .into_iter()
        .filter_map(|ms| {
            let secs = u64::try_from(ms / 1_000).ok()?;
            let nanos = u32::try_from(ms % 1_000 * 1_000_000).ok()?;
            Some(Duration::new(secs, nanos))
        })
        .collect()
}

/// Offset of the one-shot "less than a minute" warning. Phases of a minute
/// or less get none.
pub fn final_warning_offset(total: Duration) -> Option<Duration> {
    total
        .checked_sub(FINAL_WARNING_LEAD)
        .filter(|offset| !offset.is_zero())
}

/// Milliseconds left until `deadline_ms`, never negative
pub fn remaining_ms(deadline_ms: i64, now_ms: i64) -> u64 {
    u64::try_from(deadline_ms.saturating_sub(now_ms)).unwrap_or(0)
}

/// Reminder text for a phase
pub fn reminder_message(phase: PhaseKind, remaining_ms: u64) -> String {
    format!(
        "{} period: time remaining {}",
        phase.title(),
        format_remaining(remaining_ms)
    )
}

/// Text of the one-shot warning before the deadline
pub fn final_warning_message(phase: PhaseKind) -> String {
    format!("{} period: less than 1 minute remaining!", phase.title())
}

/// Terminal text for a phase
pub fn terminal_message(phase: PhaseKind) -> String {
    match phase {
        PhaseKind::Suggestions => "Suggestion period has ended.".to_string(),
        PhaseKind::Voting => "Voting period has ended.".to_string(),
    }
}
