//! Domain Identity Module
//!
//! A domain is known by its DNS name and, once learned, its SID. Two identities
//! refer to the same domain when both SIDs are present and equal, or, when at
//! least one SID is missing, when the names match case-insensitively.
//!
//! Equality through the standard traits is purely structural. Reconciliation,
//! which may teach one side the other's SID, is an explicit call.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::errors::{Result, TrustMapError};

static SID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^S-1-(\d+-){1,14}\d+$").expect("SID pattern is a valid regex"));

/// Check a domain SID against the `S-1-...` textual format
pub fn is_valid_sid(sid: &str) -> bool {
    SID_PATTERN.is_match(sid)
}

/// Name and optional SID of an Active Directory domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainIdentity {
    #[serde(default, deserialize_with = "trimmed_name")]
    name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_sid_as_none"
    )]
    sid: Option<String>,
}

impl DomainIdentity {
    /// Create an identity from a domain name and an optional SID
    ///
    /// An empty SID is treated as absent. A non-empty SID that does not match
    /// the textual SID format is rejected.
    pub fn new(name: &str, sid: Option<&str>) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TrustMapError::ValidationError(
                "domain name must not be empty".to_string(),
            ));
        }
        let identity = Self {
            name: name.to_string(),
            sid: normalize_sid(sid)?,
        };
        Ok(identity)
    }

    /// Create a partial identity known only by SID
    ///
    /// Only reachable-domain hints produce these; the graph resolves them
    /// against domains it already knows.
    pub fn from_sid(sid: &str) -> Result<Self> {
        match normalize_sid(Some(sid))? {
            Some(sid) => Ok(Self {
                name: String::new(),
                sid: Some(sid),
            }),
            None => Err(TrustMapError::ValidationError(
                "a SID-only identity needs a SID".to_string(),
            )),
        }
    }

    /// Re-check an identity that bypassed the constructors (deserialized input)
    pub fn validate(&self) -> Result<()> {
        if !self.is_named() && self.sid.is_none() {
            return Err(TrustMapError::ValidationError(
                "domain identity has neither a name nor a SID".to_string(),
            ));
        }
        if let Some(sid) = &self.sid {
            if !is_valid_sid(sid) {
                return Err(TrustMapError::ValidationError(format!(
                    "malformed SID '{}' for domain '{}'",
                    sid, self.name
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    /// Lower-cased name used as the storage key
    pub fn canonical_name(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Pure check of the reconciliation rule, without learning SIDs
    pub fn same_domain(&self, other: &DomainIdentity) -> bool {
        match (&self.sid, &other.sid) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => self.is_named() && other.is_named() && self.names_match(other),
        }
    }

    /// Decide whether both identities name the same domain, sharing a SID known
    /// to only one side when the decision was made by name.
    ///
    /// Calling it again is a no-op once both sides agree.
    pub fn reconcile_with(&mut self, other: &mut DomainIdentity) -> bool {
        if !self.same_domain(other) {
            return false;
        }
        match (&self.sid, &other.sid) {
            (None, Some(sid)) => self.sid = Some(sid.clone()),
            (Some(sid), None) => other.sid = Some(sid.clone()),
            _ => {}
        }
        true
    }

    fn names_match(&self, other: &DomainIdentity) -> bool {
        self.canonical_name() == other.canonical_name()
    }
}

/// Merge two identities without mutating either.
///
/// Returns the merged identity and whether they denote the same domain. When
/// they differ, the first identity is returned unchanged.
pub fn reconcile(a: &DomainIdentity, b: &DomainIdentity) -> (DomainIdentity, bool) {
    if !a.same_domain(b) {
        return (a.clone(), false);
    }
    let name = if a.is_named() { a.name.clone() } else { b.name.clone() };
    let merged = DomainIdentity {
        name,
        sid: a.sid.clone().or_else(|| b.sid.clone()),
    };
    (merged, true)
}

/// Same name, different SIDs: two distinct domains that collide by name.
pub fn is_duplicate_name_distinct_sid(a: &DomainIdentity, b: &DomainIdentity) -> bool {
    match (&a.sid, &b.sid) {
        (Some(sa), Some(sb)) => {
            a.is_named() && b.is_named() && a.names_match(b) && !sa.eq_ignore_ascii_case(sb)
        }
        _ => false,
    }
}

fn trimmed_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(name.trim().to_string())
}

fn empty_sid_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let sid = Option::<String>::deserialize(deserializer)?;
    Ok(sid
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn normalize_sid(sid: Option<&str>) -> Result<Option<String>> {
    match sid.map(str::trim) {
        None | Some("") => Ok(None),
        Some(sid) if is_valid_sid(sid) => Ok(Some(sid.to_string())),
        Some(sid) => Err(TrustMapError::ValidationError(format!(
            "malformed SID '{}'",
            sid
        ))),
    }
}

impl PartialEq for DomainIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DomainIdentity {}

impl PartialOrd for DomainIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DomainIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical_name()
            .cmp(&other.canonical_name())
            .then_with(|| self.sid.cmp(&other.sid))
    }
}

impl fmt::Display for DomainIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_named(), &self.sid) {
            (true, _) => write!(f, "{}", self.name),
            (false, Some(sid)) => write!(f, "{}", sid),
            (false, None) => write!(f, "<unknown>"),
        }
    }
}
