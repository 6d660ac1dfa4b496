//! Dotted engine version comparison.

use std::cmp::Ordering;

/// Compares two dotted version strings such as `"1.9.0"` and `"1.10"`.
///
/// An empty string sorts before any non-empty one. Components are split on
/// `.` (empty components are skipped) and compared by their leading decimal
/// digits first, then lexically, so `"1.2a" > "1.2"` but `"1.10" > "1.9"`.
/// When one list is a prefix of the other, the longer list is greater.
pub fn compare_version_strings(x: &str, y: &str) -> Ordering {
    match (x.is_empty(), y.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (false, false) => {}
    }

    let mut xs = x.split('.').filter(|c| !c.is_empty());
    let mut ys = y.split('.').filter(|c| !c.is_empty());
    loop {
        match (xs.next(), ys.next()) {
            (Some(a), Some(b)) => {
                let ord = leading_number(a)
                    .cmp(&leading_number(b))
                    .then_with(|| a.cmp(b));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Parses the leading run of ASCII digits, treating none as zero.
fn leading_number(component: &str) -> u64 {
    component
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0u64, |acc, d| {
            acc.saturating_mul(10).saturating_add((d - b'0') as u64)
        })
}
