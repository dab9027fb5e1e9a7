#![no_main]

use libfuzzer_sys::fuzz_target;

use ballotbox::bot::parse_command;
use ballotbox::polls::parse_choice_id;

fuzz_target!(|data: &str| {
    // Chat messages are untrusted; parsing must never panic.
    if let Some(Ok(command)) = parse_command("!", data) {
        let _ = command.name();
    }
    let _ = parse_command("?", data);
    let _ = parse_choice_id(data);
});
