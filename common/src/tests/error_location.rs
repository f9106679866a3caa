use crate::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies that `ErrorLocation` renders as `[file:line:column]`.
///
/// **WHY THIS MATTERS**: Every error message in the bridge ends with this suffix. If the
/// format drifts, log lines from the host lose the pointer back to the failing call site.
#[test]
fn given_caller_location_when_displayed_then_formats_file_line_column() {
    // GIVEN: A location captured at this call site
    let location = ErrorLocation::from(Location::caller());

    // WHEN: Rendering it
    let rendered = location.to_string();

    // THEN: It is bracketed and names this file and line
    assert!(rendered.starts_with('['));
    assert!(rendered.ends_with(']'));
    assert!(rendered.contains("error_location.rs"));
    assert!(rendered.contains(&format!(":{}:", location.line)));
}

#[test]
fn given_track_caller_helper_when_called_then_points_at_call_site() {
    let expected = Location::caller();

    let location = ErrorLocation::caller();

    assert_eq!(location.file, expected.file());
    assert_eq!(location.line, expected.line() + 2);
}
