#![no_main]

use libfuzzer_sys::fuzz_target;

use ballotbox::polls::countdown::{final_warning_offset, reminder_offsets};
use ballotbox::polls::{format_duration, parse_duration, PollSettings};

fuzz_target!(|data: &str| {
    // Arbitrary operator input must never panic or overflow, and anything
    // accepted must be a positive duration that formats cleanly and plans
    // its countdown inside the phase.
    if let Ok(duration) = parse_duration(data) {
        assert!(!duration.is_zero());
        let _ = format_duration(duration);

        let settings = PollSettings::default();
        let offsets = reminder_offsets(
            duration,
            settings.countdown_threshold(),
            settings.countdown_steps,
        );
        assert!(offsets.iter().all(|offset| *offset < duration));
        assert!(offsets.windows(2).all(|pair| pair[0] < pair[1]));
        if let Some(offset) = final_warning_offset(duration) {
            assert!(offset < duration);
        }
    }
});
