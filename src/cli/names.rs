//! Symbolic names for common mount points.
//!
//! A small fixed table of SMI roots so configuration can say
//! `enterprises.99999.1` instead of `1.3.6.1.4.1.99999.1`. This is NOT MIB
//! support.

use crate::Oid;
use crate::error::{Error, OidErrorKind, Result};

static ROOTS: &[(&str, &[u32])] = &[
    ("internet", &[1, 3, 6, 1]),
    ("mgmt", &[1, 3, 6, 1, 2]),
    ("mib-2", &[1, 3, 6, 1, 2, 1]),
    ("system", &[1, 3, 6, 1, 2, 1, 1]),
    ("interfaces", &[1, 3, 6, 1, 2, 1, 2]),
    ("experimental", &[1, 3, 6, 1, 3]),
    ("private", &[1, 3, 6, 1, 4]),
    ("enterprises", &[1, 3, 6, 1, 4, 1]),
];

/// Parse an OID in dotted notation or starting with a root name.
///
/// Accepts `1.3.6.1.4.1.99999`, `.1.3.6.1.4.1.99999`, `enterprises.99999`
/// and `Enterprises` (names are case-insensitive).
pub fn resolve(s: &str) -> Result<Oid> {
    let starts_numeric = s
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.');
    if starts_numeric {
        return Oid::parse(s);
    }

    let (name, rest) = s.split_once('.').unwrap_or((s, ""));
    let root = ROOTS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, arcs)| Oid::from_slice(arcs))
        .ok_or_else(|| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;

    if rest.is_empty() {
        return Ok(root);
    }
    let suffix = Oid::parse(rest)
        .map_err(|_| Error::invalid_oid_with_input(OidErrorKind::InvalidArc, s))?;
    Ok(root.concat(suffix.arcs()))
}

/// The root name covering `oid`, if any, for display.
pub fn describe(oid: &Oid) -> Option<String> {
    ROOTS
        .iter()
        .filter(|(_, arcs)| oid.arcs().starts_with(arcs))
        .max_by_key(|(_, arcs)| arcs.len())
        .map(|(name, arcs)| {
            let rest = &oid.arcs()[arcs.len()..];
            if rest.is_empty() {
                (*name).to_string()
            } else {
                format!("{name}.{}", Oid::from_slice(rest))
            }
        })
}
