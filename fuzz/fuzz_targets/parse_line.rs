#![no_main]

use fixlag_core::loader::{ParsedLine, format_line, parse_line};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(line) = std::str::from_utf8(data) else {
        return;
    };
    if line.contains('\n') {
        return;
    }
    if let Ok(ParsedLine::Snapshot { snapshot, .. }) = parse_line(line) {
        // Whatever parses must format to a line that parses to the same snapshot.
        if let Ok(formatted) = format_line(&snapshot) {
            match parse_line(&formatted) {
                Ok(ParsedLine::Snapshot { snapshot: back, .. }) => {
                    assert_eq!(back.sample, snapshot.sample);
                    assert_eq!(back.commit_hash, snapshot.commit_hash);
                    assert_eq!(back.commit_date, snapshot.commit_date);
                }
                other => panic!("reformatted line {formatted:?} parsed as {other:?}"),
            }
        }
    }
});
