//! Range algebra for network placement checks.
//!
//! Pure helpers for CIDR containment, CIDR overlap, and DNS subdomain
//! matching. These back the pre-flight validator; nothing here talks to a
//! provider.

use crate::error::{CirrusError, Result};
use ipnet::Ipv4Net;

fn parse_cidr(cidr: &str) -> Result<Ipv4Net> {
    cidr.parse::<Ipv4Net>().map_err(|_| CirrusError::InvalidRange { range: cidr.to_string() })
}

/// True iff every address in `inner` lies within `outer`.
pub fn cidr_contains(outer: &str, inner: &str) -> Result<bool> {
    let outer = parse_cidr(outer)?;
    let inner = parse_cidr(inner)?;
    Ok(outer.contains(&inner))
}

/// True iff the two ranges share at least one address.
///
/// CIDR blocks are aligned power-of-two ranges, so two blocks overlap
/// exactly when one contains the other.
pub fn cidr_overlaps(a: &str, b: &str) -> Result<bool> {
    let a = parse_cidr(a)?;
    let b = parse_cidr(b)?;
    Ok(a.contains(&b) || b.contains(&a))
}

/// True iff `candidate` equals `parent` or is a true subdomain of it.
///
/// Matching is on label boundaries, not substrings: `evilcoreos.com` is not
/// a subdomain of `coreos.com`. At most one trailing dot is stripped from
/// each name before comparison.
pub fn is_subdomain(candidate: &str, parent: &str) -> bool {
    let candidate = candidate.strip_suffix('.').unwrap_or(candidate);
    let parent = parent.strip_suffix('.').unwrap_or(parent);

    let candidate_labels: Vec<&str> = candidate.split('.').collect();
    let parent_labels: Vec<&str> = parent.split('.').collect();

    if parent_labels.len() > candidate_labels.len() {
        return false;
    }

    let offset = candidate_labels.len() - parent_labels.len();
    candidate_labels[offset..] == parent_labels[..]
}

/// Append a trailing dot unless the name already carries one.
///
/// DNS zone APIs report fully-qualified names; configuration usually omits
/// the dot. Normalizing to the dotted form makes record-name comparisons
/// exact.
pub fn with_trailing_dot(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains() {
        assert!(cidr_contains("10.5.0.0/16", "10.5.11.0/24").unwrap());
        assert!(cidr_contains("192.168.1.0/24", "192.168.1.50/28").unwrap());
        assert!(!cidr_contains("10.5.0.0/16", "10.6.0.0/24").unwrap());
        // Inner wider than outer is not containment
        assert!(!cidr_contains("10.5.11.0/24", "10.5.0.0/16").unwrap());
    }

    #[test]
    fn test_overlap_symmetry() {
        let pairs = [
            ("10.5.1.0/24", "10.5.0.0/16"),
            ("10.5.1.0/24", "10.5.2.0/24"),
            ("192.168.1.100/28", "192.168.1.0/26"),
        ];
        for (a, b) in pairs {
            assert_eq!(cidr_overlaps(a, b).unwrap(), cidr_overlaps(b, a).unwrap());
        }
    }

    #[test]
    fn test_overlap_self() {
        assert!(cidr_overlaps("10.0.1.0/24", "10.0.1.0/24").unwrap());
    }

    #[test]
    fn test_disjoint_ranges() {
        assert!(!cidr_overlaps("10.5.1.0/24", "10.5.2.0/24").unwrap());
        assert!(!cidr_overlaps("192.168.1.0/28", "192.168.1.32/28").unwrap());
    }

    #[test]
    fn test_malformed_cidr() {
        assert!(matches!(
            cidr_contains("not-a-cidr", "10.0.0.0/8"),
            Err(CirrusError::InvalidRange { .. })
        ));
        assert!(matches!(
            cidr_overlaps("10.0.0.0/8", "10.0.0.0/33"),
            Err(CirrusError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_is_subdomain_valid() {
        // single level
        assert!(is_subdomain("test.coreos.com", "coreos.com"));
        // multiple levels
        assert!(is_subdomain("cgag.staging.coreos.com", "coreos.com"));
        // trailing dots shouldn't matter
        assert!(is_subdomain("staging.coreos.com.", "coreos.com."));
        assert!(is_subdomain("a.b.c.", "b.c"));
        // multiple level parent domain
        assert!(is_subdomain("a.b.c.staging.core-os.net", "staging.core-os.net"));
        // exact match counts
        assert!(is_subdomain("staging.core-os.net", "staging.core-os.net."));
    }

    #[test]
    fn test_is_subdomain_invalid() {
        // mismatch
        assert!(!is_subdomain("staging.coreos.com", "example.com"));
        // parent longer than candidate
        assert!(!is_subdomain("staging.coreos.com", "cgag.staging.coreos.com"));
        // label boundary, not substring
        assert!(!is_subdomain("evilcoreos.com", "coreos.com"));
    }

    #[test]
    fn test_with_trailing_dot() {
        assert_eq!(with_trailing_dot("coreos.com"), "coreos.com.");
        assert_eq!(with_trailing_dot("coreos.com."), "coreos.com.");
    }
}
