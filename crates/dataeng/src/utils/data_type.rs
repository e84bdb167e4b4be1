//! Data type checks for loosely typed values

use regex::Regex;
use std::sync::LazyLock;

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:_\d+)*$").expect("valid pattern"));

/// Checks if a string represents an integer.
///
/// Surrounding whitespace is ignored, a single leading sign is accepted and
/// digits may be grouped with single underscores, so `" -42 "` and `"1_000"`
/// represent integers while `"1a"` and `"1__0"` do not. There is no length
/// limit.
pub fn represent_int(value: &str) -> bool {
    INTEGER.is_match(value.trim())
}
