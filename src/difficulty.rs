//! Difficulty grades and their display colors
//!
//! `mtb:scale` grades are integers 0 through 6, `sac_scale` grades are the six
//! Swiss Alpine Club categories. Anything outside either table renders with
//! the lowest tier color.

/// Highest `mtb:scale` grade
pub const MAX_MTB_GRADE: i64 = 6;

/// Colors for `mtb:scale` 0 through 6
pub const MTB_COLORS: [&str; 7] = [
    "#4CAF50", // 0: gravel, no obstacles
    "#8BC34A", // 1: roots, small rocks
    "#FFEB3B", // 2: larger obstacles
    "#FF9800", // 3: blocked sections, tight turns
    "#F44336", // 4: steep, trial technique
    "#9C27B0", // 5: very steep, boulders
    "#212121", // 6: barely rideable
];

/// Colors for `sac_scale` grades, lowest first
pub const SAC_COLORS: [(&str, &str); 6] = [
    ("hiking", "#FFD700"),
    ("mountain_hiking", "#E53935"),
    ("demanding_mountain_hiking", "#B71C1C"),
    ("alpine_hiking", "#1E88E5"),
    ("demanding_alpine_hiking", "#1565C0"),
    ("difficult_alpine_hiking", "#0D47A1"),
];

/// Color for an `mtb:scale` grade
#[must_use]
pub fn mtb_color(grade: i64) -> &'static str {
    usize::try_from(grade)
        .ok()
        .and_then(|index| MTB_COLORS.get(index))
        .copied()
        .unwrap_or(MTB_COLORS[0])
}

/// Color for a `sac_scale` tag value
#[must_use]
pub fn sac_color(grade: &str) -> &'static str {
    SAC_COLORS
        .iter()
        .find(|(key, _)| *key == grade)
        .map_or(SAC_COLORS[0].1, |(_, color)| *color)
}

/// Parse an `mtb:scale` tag value.
///
/// Mappers write grades like `2`, `2+` or `3-`; the modifier is dropped.
/// Values that don't start with a digit yield `None`.
#[must_use]
pub fn parse_mtb_scale(value: &str) -> Option<i64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}
