//! Dotted version comparison.
//!
//! Versions are compared numerically segment by segment, so `1.10` sorts after
//! `1.9` and `1.2` equals `1.2.0`. Segments that are not plain decimal numbers
//! count as `0`. Segments are compared as digit strings, which keeps arbitrarily
//! large numbers exact.

use std::cmp::Ordering;

/// Compares two dotted version identifiers.
///
/// Returns `Less` when `a` is older than `b`, `Greater` when it is newer and
/// `Equal` when every segment matches after zero padding.
///
/// ```
/// # use hotupdate_server::version::compare;
/// use std::cmp::Ordering;
/// assert_eq!(compare("1.9", "1.10"), Ordering::Less);
/// assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
/// assert_eq!(compare("2", "1.9.9"), Ordering::Greater);
/// ```
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.').map(segment_digits);
    let mut right = b.split('.').map(segment_digits);

    loop {
        let (l, r) = match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (l, r) => (l.unwrap_or(""), r.unwrap_or("")),
        };

        let ordering = compare_digits(l, r);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
}

/// Returns `true` when `candidate` is strictly newer than `current`.
pub fn is_newer(candidate: &str, current: &str) -> bool {
    compare(current, candidate) == Ordering::Less
}

/// Significant digits of a segment; empty means zero.
fn segment_digits(segment: &str) -> &str {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return "";
    }
    segment.trim_start_matches('0')
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_not_lexical() {
        assert_eq!(compare("1.9", "1.10"), Ordering::Less);
        assert_eq!(compare("2.0", "1.9"), Ordering::Greater);
        assert_eq!(compare("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare("10.0.0", "9.99.99"), Ordering::Greater);
    }

    #[test]
    fn test_zero_padding() {
        assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare("1.2.0.0", "1.2"), Ordering::Equal);
        assert_eq!(compare("1.2", "1.2.1"), Ordering::Less);
        assert_eq!(compare("2", "1.9.9"), Ordering::Greater);
    }

    #[test]
    fn test_non_numeric_segments_are_zero() {
        assert_eq!(compare("1.x", "1.0"), Ordering::Equal);
        assert_eq!(compare("1.2-beta", "1.0"), Ordering::Equal);
        assert_eq!(compare("v1", "0"), Ordering::Equal);
        assert_eq!(compare("1.-1", "1.0"), Ordering::Equal);
    }

    #[test]
    fn test_empty_string_is_zero() {
        assert_eq!(compare("", "0"), Ordering::Equal);
        assert_eq!(compare("", "0.0.0"), Ordering::Equal);
        assert_eq!(compare("", "0.0.1"), Ordering::Less);
        assert_eq!(compare("1..2", "1.0.2"), Ordering::Equal);
    }

    #[test]
    fn test_leading_zeros() {
        assert_eq!(compare("1.01", "1.1"), Ordering::Equal);
        assert_eq!(compare("1.0010", "1.9"), Ordering::Greater);
    }

    #[test]
    fn test_large_segments_do_not_overflow() {
        let huge = "1.340282366920938463463374607431768211456";
        let huger = "1.340282366920938463463374607431768211457";
        assert_eq!(compare(huge, huger), Ordering::Less);
        assert_eq!(compare("18446744073709551616", "18446744073709551615"), Ordering::Greater);
    }

    #[test]
    fn test_reflexive_and_antisymmetric() {
        let samples = [
            "", "0", "1", "1.0", "1.2", "1.2.0", "1.9", "1.10", "2", "1.9.9", "0.9.0", "3.x",
            "007.1",
        ];
        for a in samples {
            assert_eq!(compare(a, a), Ordering::Equal, "{a} should equal itself");
            for b in samples {
                assert_eq!(
                    compare(a, b),
                    compare(b, a).reverse(),
                    "compare({a:?}, {b:?}) must mirror compare({b:?}, {a:?})"
                );
            }
        }
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.1.0", "1.0.0"));
        assert!(!is_newer("1.0.0", "1.0.0"));
        assert!(!is_newer("0.9", "1.0"));
    }
}
