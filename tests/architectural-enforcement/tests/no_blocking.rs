//! Enforce non-blocking, panic-free library code

use architectural_enforcement::{core_src_dir, find_in_production};

fn report(violations: &[architectural_enforcement::Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_no_blocking_sleep() {
    let violations = find_in_production(&core_src_dir(), &["std::thread::sleep", "thread::sleep("]);
    assert!(
        violations.is_empty(),
        "Blocking sleep in library code:\n{}",
        report(&violations)
    );
}

#[test]
fn test_no_blocking_std_io_in_async_paths() {
    let violations = find_in_production(&core_src_dir(), &["std::net::TcpStream", "std::sync::mpsc"]);
    assert!(
        violations.is_empty(),
        "Blocking std primitives in library code:\n{}",
        report(&violations)
    );
}

#[test]
fn test_no_unwrap_or_expect() {
    let violations = find_in_production(&core_src_dir(), &[".unwrap()", ".expect("]);
    assert!(
        violations.is_empty(),
        "unwrap/expect in library code:\n{}",
        report(&violations)
    );
}
