//! Validation of user-provided names.

use std::sync::LazyLock;

use regex::Regex;

/// The regex that reference, benchmark and group names must match.
static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // SAFETY: this is checked statically to ensure it always unwraps.
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").unwrap()
});

/// A description of valid names used in error messages.
pub const EXPECTED: &str = "a name matching `[A-Za-z_][A-Za-z0-9_.-]*`";

/// Whether or not `name` is a valid name.
pub fn is_valid(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_name_regex_unwraps() {
        let _ = *NAME_REGEX;
    }

    #[test]
    fn names_are_validated() {
        assert!(is_valid("vm_1"));
        assert!(is_valid("rhel-box.a"));
        assert!(is_valid("_private"));
        assert!(!is_valid("1st"));
        assert!(!is_valid(""));
        assert!(!is_valid("has space"));
    }
}
